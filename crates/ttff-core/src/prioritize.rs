#![forbid(unsafe_code)]

//! End-to-end prioritization run.
//!
//! [`Prioritizer::run`] wires the pieces together for one matrix: project
//! the universe, derive case times, build the estimator and calculator, run
//! each configured strategy, then score the results against the historical
//! runs. The chosen order is the model-driven outcome with the lowest
//! expected TTFF; ties go to the strategy listed first.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Serialize;

use crate::config::PrioritizerConfig;
use crate::cost::TtffCalculator;
use crate::error::{Result, TtffError};
use crate::estimator::{CacheStats, ScenarioEstimator};
use crate::evaluate::{lower_bound_ttff, random_baseline, true_mean_ttff};
use crate::matrix::RunMatrix;
use crate::search::{OrderSearch, SearchOutcome, Strategy};
use crate::timing::CaseTimes;

/// One strategy's ordering, scored both ways.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    pub strategy: Strategy,
    pub order: Vec<String>,
    pub expected_ttff: f64,
    pub true_mean_ttff: f64,
    pub evaluations: u64,
    pub pruned: u64,
}

/// A configured strategy that was not run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStrategy {
    pub strategy: Strategy,
    pub reason: String,
}

/// Reference points the chosen order is compared against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Baselines {
    /// Declaration order.
    pub default: StrategyReport,
    /// True mean TTFF averaged over `random_samples` random orders.
    pub random_mean_ttff: f64,
    pub random_samples: usize,
    /// No ordering can score below this.
    pub lower_bound_ttff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrioritizationReport {
    pub runs: usize,
    pub cases: Vec<String>,
    pub smoothing_alpha: f64,
    pub strategies: Vec<StrategyReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedStrategy>,
    pub chosen: StrategyReport,
    pub baselines: Baselines,
    pub cache: CacheStats,
}

impl PrioritizationReport {
    /// Relative improvement of the chosen order over declaration order,
    /// by true mean TTFF. `None` when the default order costs nothing.
    #[must_use]
    pub fn improvement_over_default(&self) -> Option<f64> {
        let base = self.baselines.default.true_mean_ttff;
        (base > 0.0).then(|| (base - self.chosen.true_mean_ttff) / base)
    }
}

#[derive(Debug, Clone)]
pub struct Prioritizer {
    config: PrioritizerConfig,
}

impl Prioritizer {
    #[must_use]
    pub fn new(config: PrioritizerConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PrioritizerConfig {
        &self.config
    }

    pub fn run(&self, matrix: &RunMatrix) -> Result<PrioritizationReport> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            return Err(TtffError::InvalidConfig(errors));
        }

        let projected;
        let matrix = match &self.config.cases {
            Some(names) => {
                projected = matrix.project(names)?;
                &projected
            }
            None => matrix,
        };

        let smoothing = self.config.smoothing()?;
        let times = CaseTimes::from_matrix(matrix)?;
        let estimator = ScenarioEstimator::new(matrix, smoothing)?;
        let mut calc = TtffCalculator::new(estimator, times);
        let search = OrderSearch::new(self.config.max_exact_cases);
        let mut rng = match self.config.random_seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };

        tracing::info!(
            runs = matrix.run_count(),
            cases = matrix.case_count(),
            alpha = smoothing.alpha(),
            "prioritization started"
        );

        let mut strategies = Vec::with_capacity(self.config.strategies.len());
        let mut skipped = Vec::new();
        for &strategy in &self.config.strategies {
            if strategy == Strategy::Exact && !search.exact_feasible(matrix.case_count()) {
                tracing::warn!(
                    cases = matrix.case_count(),
                    limit = search.max_exact_cases(),
                    "universe too large for exact search; skipping"
                );
                skipped.push(SkippedStrategy {
                    strategy,
                    reason: format!(
                        "{} test cases exceed max_exact_cases = {}",
                        matrix.case_count(),
                        search.max_exact_cases()
                    ),
                });
                continue;
            }
            let outcome = search.run(strategy, &mut calc, &mut rng)?;
            strategies.push(score(matrix, outcome)?);
        }

        if strategies.is_empty() {
            tracing::warn!("no configured strategy ran; falling back to greedy-cost");
            let outcome = search.run(Strategy::GreedyCost, &mut calc, &mut rng)?;
            strategies.push(score(matrix, outcome)?);
        }

        let mut chosen = &strategies[0];
        for candidate in &strategies[1..] {
            if candidate.expected_ttff < chosen.expected_ttff {
                chosen = candidate;
            }
        }
        let chosen = chosen.clone();

        let default = score(
            matrix,
            search.run(Strategy::Default, &mut calc, &mut rng)?,
        )?;
        let baselines = Baselines {
            default,
            random_mean_ttff: random_baseline(matrix, self.config.random_samples, &mut rng)?,
            random_samples: self.config.random_samples,
            lower_bound_ttff: lower_bound_ttff(matrix)?,
        };

        tracing::info!(
            strategy = chosen.strategy.as_str(),
            expected_ttff = chosen.expected_ttff,
            true_mean_ttff = chosen.true_mean_ttff,
            default_mean_ttff = baselines.default.true_mean_ttff,
            lower_bound_ttff = baselines.lower_bound_ttff,
            "prioritization finished"
        );

        Ok(PrioritizationReport {
            runs: matrix.run_count(),
            cases: matrix.cases().to_vec(),
            smoothing_alpha: smoothing.alpha(),
            strategies,
            skipped,
            chosen,
            baselines,
            cache: calc.cache_stats(),
        })
    }
}

fn score(matrix: &RunMatrix, outcome: SearchOutcome) -> Result<StrategyReport> {
    Ok(StrategyReport {
        strategy: outcome.strategy,
        true_mean_ttff: true_mean_ttff(matrix, &outcome.order)?,
        order: matrix.names_of(&outcome.order),
        expected_ttff: outcome.expected_ttff,
        evaluations: outcome.evaluations,
        pruned: outcome.pruned,
    })
}

#[cfg(test)]
mod tests {
    use super::Prioritizer;
    use crate::config::PrioritizerConfig;
    use crate::error::TtffError;
    use crate::matrix::{RunMatrix, fixtures};
    use crate::search::Strategy;

    fn seeded() -> PrioritizerConfig {
        PrioritizerConfig {
            random_seed: Some(7),
            ..PrioritizerConfig::default()
        }
    }

    fn three_cases() -> RunMatrix {
        RunMatrix::new(
            (0..4).map(|i| format!("r{i}")).collect(),
            vec!["stable".into(), "slow".into(), "fast".into()],
            vec![
                vec![true, false, false],
                vec![true, false, true],
                vec![true, false, false],
                vec![true, false, true],
            ],
            vec![vec![5.0, 10.0, 1.0]; 4],
        )
        .expect("matrix")
    }

    #[test]
    fn chooses_lowest_expected_ttff() {
        let report = Prioritizer::new(seeded())
            .run(&three_cases())
            .expect("report");
        assert_eq!(report.strategies.len(), 3);
        assert_eq!(report.chosen.strategy, Strategy::Exact);
        assert_eq!(report.chosen.order, vec!["fast", "slow", "stable"]);
        assert!((report.chosen.expected_ttff - 6.0).abs() < 1e-12);
        for entry in &report.strategies {
            assert!(report.chosen.expected_ttff <= entry.expected_ttff);
        }
        assert!(report.baselines.lower_bound_ttff <= report.chosen.true_mean_ttff);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn toy_report_matches_hand_computed_values() {
        let report = Prioritizer::new(seeded())
            .run(&fixtures::toy())
            .expect("report");
        assert_eq!(report.runs, 4);
        // Both orders tie at 1.75; the first permutation wins.
        assert_eq!(report.chosen.order, vec!["a", "b"]);
        assert!((report.chosen.true_mean_ttff - 2.5).abs() < 1e-12);
        assert!((report.baselines.lower_bound_ttff - 2.0).abs() < 1e-12);
        assert!((report.baselines.random_mean_ttff - 2.5).abs() < 1e-12);
        assert_eq!(report.improvement_over_default(), Some(0.0));
        assert!(report.cache.entries > 0);
    }

    #[test]
    fn oversized_universe_skips_exact_search() {
        let config = PrioritizerConfig {
            max_exact_cases: 2,
            ..seeded()
        };
        let report = Prioritizer::new(config)
            .run(&three_cases())
            .expect("report");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].strategy, Strategy::Exact);
        assert!(
            report
                .strategies
                .iter()
                .all(|entry| entry.strategy != Strategy::Exact)
        );
    }

    #[test]
    fn falls_back_to_greedy_when_nothing_ran() {
        let config = PrioritizerConfig {
            strategies: vec![Strategy::Exact],
            max_exact_cases: 1,
            ..seeded()
        };
        let report = Prioritizer::new(config).run(&fixtures::toy()).expect("report");
        assert_eq!(report.chosen.strategy, Strategy::GreedyCost);
    }

    #[test]
    fn case_subset_restricts_the_universe() {
        let config = PrioritizerConfig {
            cases: Some(vec!["fast".into(), "slow".into()]),
            ..seeded()
        };
        let report = Prioritizer::new(config)
            .run(&three_cases())
            .expect("report");
        assert_eq!(report.cases, vec!["fast", "slow"]);
        assert_eq!(report.chosen.order.len(), 2);
    }

    #[test]
    fn unknown_subset_case_is_rejected() {
        let config = PrioritizerConfig {
            cases: Some(vec!["ghost".into()]),
            ..seeded()
        };
        let err = Prioritizer::new(config)
            .run(&three_cases())
            .expect_err("unknown case");
        assert!(matches!(err, TtffError::UnknownCase { .. }));
    }

    #[test]
    fn invalid_config_is_rejected_before_any_work() {
        let config = PrioritizerConfig {
            random_samples: 0,
            ..seeded()
        };
        let err = Prioritizer::new(config)
            .run(&three_cases())
            .expect_err("invalid config");
        assert!(matches!(err, TtffError::InvalidConfig(_)));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let a = Prioritizer::new(seeded()).run(&three_cases()).expect("a");
        let b = Prioritizer::new(seeded()).run(&three_cases()).expect("b");
        assert_eq!(
            a.baselines.random_mean_ttff.to_bits(),
            b.baselines.random_mean_ttff.to_bits()
        );
    }

    #[test]
    fn report_serializes_to_json() {
        let report = Prioritizer::new(seeded()).run(&fixtures::toy()).expect("report");
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["chosen"]["strategy"], "exact");
        assert_eq!(json["baselines"]["random_samples"], 50);
        assert!(json.get("skipped").is_none());
    }
}
