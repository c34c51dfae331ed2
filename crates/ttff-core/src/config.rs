#![forbid(unsafe_code)]

//! Prioritizer configuration as data.
//!
//! Loaded from TOML or JSON at startup; every field is optional in the file
//! and defaults to the reference behaviour (unsmoothed estimates, exact
//! search up to ten cases, fifty random samples).
//!
//! ```toml
//! smoothing_alpha = 1.0
//! strategies = ["exact", "greedy-cost", "greedy-probability"]
//! max_exact_cases = 8
//! random_samples = 50
//! random_seed = 7
//! cases = ["test:linux", "test:macos"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TtffError};
use crate::estimator::Smoothing;
use crate::evaluate::DEFAULT_RANDOM_SAMPLES;
use crate::search::{DEFAULT_MAX_EXACT_CASES, Strategy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritizerConfig {
    /// Additive smoothing pseudo-count. `0` disables smoothing. Default: 0.
    pub smoothing_alpha: f64,

    /// Model-driven strategies to run, in report order.
    /// Default: exact, greedy-cost, greedy-probability.
    pub strategies: Vec<Strategy>,

    /// Largest universe exact search may enumerate. Default: 10.
    pub max_exact_cases: usize,

    /// Random orderings averaged for the random baseline. Default: 50.
    pub random_samples: usize,

    /// Seed for the random baseline; unseeded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,

    /// Restrict the universe to these test cases, in this order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cases: Option<Vec<String>>,
}

impl Default for PrioritizerConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: 0.0,
            strategies: vec![
                Strategy::Exact,
                Strategy::GreedyCost,
                Strategy::GreedyProbability,
            ],
            max_exact_cases: DEFAULT_MAX_EXACT_CASES,
            random_samples: DEFAULT_RANDOM_SAMPLES,
            random_seed: None,
            cases: None,
        }
    }
}

impl PrioritizerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Load a `.json` file as JSON and anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TtffError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Collect every range violation. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.smoothing_alpha.is_finite() || self.smoothing_alpha < 0.0 {
            errors.push(format!(
                "smoothing_alpha must be finite and >= 0, got {}",
                self.smoothing_alpha
            ));
        }
        if self.random_samples == 0 {
            errors.push("random_samples must be > 0".into());
        }
        for (i, strategy) in self.strategies.iter().enumerate() {
            if !strategy.is_model_driven() {
                errors.push(format!(
                    "strategies[{i}] = {strategy} is a baseline and is always reported"
                ));
            }
            if self.strategies[..i].contains(strategy) {
                errors.push(format!("strategies[{i}] = {strategy} is listed twice"));
            }
        }
        if self.cases.as_ref().is_some_and(Vec::is_empty) {
            errors.push("cases must not be empty when given".into());
        }

        errors
    }

    /// [`validate`](Self::validate) as a `Result`.
    pub fn validated(self) -> Result<Self> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(TtffError::InvalidConfig(errors))
        }
    }

    pub fn smoothing(&self) -> Result<Smoothing> {
        Smoothing::from_alpha(self.smoothing_alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::PrioritizerConfig;
    use crate::estimator::Smoothing;
    use crate::search::Strategy;

    #[test]
    fn default_validates_clean() {
        let errors = PrioritizerConfig::default().validate();
        assert!(errors.is_empty(), "default should validate: {errors:?}");
        assert_eq!(
            PrioritizerConfig::default().smoothing().expect("smoothing"),
            Smoothing::None
        );
    }

    #[test]
    fn partial_toml_preserves_defaults() {
        let config = PrioritizerConfig::from_toml_str(
            "smoothing_alpha = 1.0\nstrategies = [\"greedy-cost\"]\n",
        )
        .expect("parse");
        assert_eq!(config.smoothing_alpha, 1.0);
        assert_eq!(config.strategies, vec![Strategy::GreedyCost]);
        assert_eq!(config.max_exact_cases, 10);
        assert_eq!(config.random_samples, 50);
        assert!(config.random_seed.is_none());
    }

    #[test]
    fn json_config_is_accepted() {
        let config =
            PrioritizerConfig::from_json_str(r#"{"random_seed": 9, "cases": ["a", "b"]}"#)
                .expect("parse");
        assert_eq!(config.random_seed, Some(9));
        assert_eq!(config.cases, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn unknown_strategy_fails_to_parse() {
        assert!(PrioritizerConfig::from_toml_str("strategies = [\"fastest\"]").is_err());
    }

    #[test]
    fn multiple_validation_errors_collected() {
        let config = PrioritizerConfig {
            smoothing_alpha: -1.0,
            random_samples: 0,
            strategies: vec![Strategy::Random, Strategy::Exact, Strategy::Exact],
            cases: Some(Vec::new()),
            ..PrioritizerConfig::default()
        };
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("smoothing_alpha")));
        assert!(errors.iter().any(|e| e.contains("random_samples")));
        assert!(errors.iter().any(|e| e.contains("baseline")));
        assert!(errors.iter().any(|e| e.contains("listed twice")));
        assert!(errors.iter().any(|e| e.contains("cases")));
        assert!(config.validated().is_err());
    }

    #[test]
    fn toml_output_parses_back() {
        let config = PrioritizerConfig {
            smoothing_alpha: 0.5,
            random_seed: Some(3),
            ..PrioritizerConfig::default()
        };
        let text = config.to_toml_string().expect("encode");
        assert!(text.contains("greedy-probability"));
        let parsed = PrioritizerConfig::from_toml_str(&text).expect("decode");
        assert_eq!(parsed, config);
    }

    #[test]
    fn config_file_extension_selects_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let toml_path = dir.path().join("ttff.toml");
        std::fs::write(&toml_path, "max_exact_cases = 4\n").expect("write toml");
        let json_path = dir.path().join("ttff.json");
        std::fs::write(&json_path, r#"{"max_exact_cases": 5}"#).expect("write json");

        assert_eq!(
            PrioritizerConfig::from_file(&toml_path).expect("toml").max_exact_cases,
            4
        );
        assert_eq!(
            PrioritizerConfig::from_file(&json_path).expect("json").max_exact_cases,
            5
        );
    }
}
