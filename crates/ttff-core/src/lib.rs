#![forbid(unsafe_code)]

//! Time-to-first-failure test prioritization.
//!
//! Given a matrix of historical CI runs (pass/fail and duration per test
//! case), this crate orders test cases so that a failing run surfaces its
//! first failure as early as possible in expectation.
//!
//! # Key Components
//!
//! - [`RunMatrix`] - Immutable run × test case status and duration tables
//! - [`ScenarioEstimator`] - Memoized probability that a prefix is exactly
//!   "all passed, then the last one failed"
//! - [`TtffCalculator`] - Expected TTFF of an ordering, with bound pruning
//! - [`OrderSearch`] - Exact, greedy and baseline ordering strategies
//! - [`evaluate`] - Ground-truth mean TTFF and the lower bound
//! - [`Prioritizer`] - One end-to-end run producing a [`PrioritizationReport`]
//!
//! # Example
//!
//! ```
//! use ttff_core::{Prioritizer, PrioritizerConfig, RunMatrix};
//!
//! let matrix = RunMatrix::new(
//!     vec!["r1".into(), "r2".into()],
//!     vec!["unit".into(), "e2e".into()],
//!     vec![vec![true, false], vec![false, true]],
//!     vec![vec![1.0, 30.0], vec![1.5, 28.0]],
//! )?;
//! let config = PrioritizerConfig {
//!     random_seed: Some(1),
//!     ..PrioritizerConfig::default()
//! };
//! let report = Prioritizer::new(config).run(&matrix)?;
//! assert_eq!(report.chosen.order.len(), 2);
//! # Ok::<(), ttff_core::TtffError>(())
//! ```

pub mod config;
pub mod cost;
pub mod error;
pub mod estimator;
pub mod evaluate;
pub mod matrix;
pub mod prioritize;
pub mod search;
pub mod tables;
pub mod timing;

pub use config::PrioritizerConfig;
pub use cost::TtffCalculator;
pub use error::{ErrorClass, Result, TtffError};
pub use estimator::{CacheStats, ScenarioEstimator, Smoothing};
pub use evaluate::{lower_bound_ttff, per_run_ttff, random_baseline, true_mean_ttff};
pub use matrix::{RunMatrix, TestOrder};
pub use prioritize::{
    Baselines, PrioritizationReport, Prioritizer, SkippedStrategy, StrategyReport,
};
pub use search::{OrderSearch, SearchOutcome, Strategy};
pub use tables::{load_table_files, load_tables};
pub use timing::CaseTimes;
