#![forbid(unsafe_code)]

//! Error types for the prioritization core.
//!
//! Every failure is fatal to the current computation; nothing here is
//! retried. [`TtffError::class`] groups variants into the four categories
//! callers branch on.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TtffError>;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Empty matrix, mismatched tables, missing timing entries, bad config.
    Configuration,
    /// A scenario or ordering that references test cases outside the universe.
    InvalidScenario,
    /// Exact search requested over a universe too large to enumerate.
    SearchInfeasible,
    /// Unreadable or unparseable input tables.
    Input,
}

#[derive(Debug, Error)]
pub enum TtffError {
    #[error("run matrix has no runs")]
    EmptyMatrix,

    #[error("table shape mismatch: {detail}")]
    ShapeMismatch { detail: String },

    #[error("duplicate test case column: {case}")]
    DuplicateCase { case: String },

    #[error("invalid duration {value} for test case {case} in run {run}")]
    InvalidDuration {
        run: String,
        case: String,
        value: f64,
    },

    #[error("no failure/success time recorded for test case index {case}")]
    MissingTiming { case: usize },

    #[error("unknown test case {case:?} in scenario {prefix:?}")]
    UnknownCase { case: String, prefix: Vec<String> },

    #[error("scenario prefix must not be empty")]
    EmptyScenario,

    #[error("ordering is not a permutation of the test universe: {detail}")]
    NotAPermutation { detail: String },

    #[error("exact search over {cases} test cases exceeds the limit of {limit}")]
    SearchInfeasible { cases: usize, limit: usize },

    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<String>),

    #[error("unparseable cell {value:?} for test case {case} in run {run} of {table}")]
    InvalidCell {
        table: &'static str,
        run: String,
        case: String,
        value: String,
    },

    #[error("cannot read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TtffError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EmptyMatrix
            | Self::ShapeMismatch { .. }
            | Self::DuplicateCase { .. }
            | Self::InvalidDuration { .. }
            | Self::MissingTiming { .. }
            | Self::InvalidConfig(_)
            | Self::Toml(_)
            | Self::TomlEncode(_) => ErrorClass::Configuration,
            Self::UnknownCase { .. } | Self::EmptyScenario | Self::NotAPermutation { .. } => {
                ErrorClass::InvalidScenario
            }
            Self::SearchInfeasible { .. } => ErrorClass::SearchInfeasible,
            Self::InvalidCell { .. }
            | Self::ReadFile { .. }
            | Self::Csv(_)
            | Self::Json(_) => ErrorClass::Input,
        }
    }

    pub(crate) fn shape(detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            detail: detail.into(),
        }
    }
}
