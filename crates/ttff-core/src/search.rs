#![forbid(unsafe_code)]

//! Ordering strategies over a shared cost model.
//!
//! | Strategy | Criterion | Cost |
//! |----------|-----------|------|
//! | `exact` | minimum expected TTFF over all `n!` permutations | factorial |
//! | `greedy-cost` | append the case with the smallest scenario term | `O(n²)` estimates |
//! | `greedy-probability` | append the case most likely to fail next | `O(n²)` estimates |
//! | `default` | declaration order | none |
//! | `random` | uniform permutation | none |
//!
//! # Determinism
//!
//! Exact search walks permutations in lexicographic order of column index,
//! starting from declaration order, and only replaces the incumbent on a
//! strict improvement, so ties keep the first optimum found. Greedy
//! strategies scan remaining cases in declaration order and keep the first
//! best candidate. Zero-probability candidates get no special treatment in
//! the cost-minimizing heuristic: their term is zero, which already wins
//! unless an earlier candidate also scored zero.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::cost::TtffCalculator;
use crate::error::{Result, TtffError};

/// Default upper bound on the universe size for exact search.
pub const DEFAULT_MAX_EXACT_CASES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    Exact,
    GreedyCost,
    GreedyProbability,
    Default,
    Random,
}

impl Strategy {
    pub const ALL: [Self; 5] = [
        Self::Exact,
        Self::GreedyCost,
        Self::GreedyProbability,
        Self::Default,
        Self::Random,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::GreedyCost => "greedy-cost",
            Self::GreedyProbability => "greedy-probability",
            Self::Default => "default",
            Self::Random => "random",
        }
    }

    /// Whether the strategy consults the probability model.
    #[must_use]
    pub const fn is_model_driven(self) -> bool {
        matches!(
            self,
            Self::Exact | Self::GreedyCost | Self::GreedyProbability
        )
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = TtffError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s.trim())
            .ok_or_else(|| TtffError::InvalidConfig(vec![format!("unknown strategy: {s}")]))
    }
}

/// Rearrange `perm` into the next lexicographic permutation.
/// Returns `false` once `perm` was the last one.
fn next_permutation(perm: &mut [usize]) -> bool {
    let Some(pivot) = perm.windows(2).rposition(|w| w[0] < w[1]) else {
        return false;
    };
    let Some(successor) = perm.iter().rposition(|&x| x > perm[pivot]) else {
        return false;
    };
    perm.swap(pivot, successor);
    perm[pivot + 1..].reverse();
    true
}

/// Exhaustive search for the minimum expected TTFF.
///
/// Rejects universes larger than `max_cases` with `SearchInfeasible`.
pub fn exact_order(calc: &mut TtffCalculator<'_>, max_cases: usize) -> Result<Vec<usize>> {
    let n = calc.case_count();
    if n > max_cases {
        return Err(TtffError::SearchInfeasible {
            cases: n,
            limit: max_cases,
        });
    }

    let mut perm: Vec<usize> = (0..n).collect();
    let mut best = perm.clone();
    let mut best_cost = f64::INFINITY;
    loop {
        let cost = calc.expected_ttff(&perm, best_cost)?;
        if cost < best_cost {
            best_cost = cost;
            best.copy_from_slice(&perm);
            tracing::trace!(cost, "exact search improved incumbent");
        }
        if !next_permutation(&mut perm) {
            break;
        }
    }
    Ok(best)
}

/// Build the ordering one case at a time, appending the case with the
/// smallest scenario term given the prefix chosen so far.
pub fn greedy_cost_order(calc: &mut TtffCalculator<'_>) -> Result<Vec<usize>> {
    let mut remaining: Vec<usize> = (0..calc.case_count()).collect();
    let mut result = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut min_term = f64::INFINITY;
        let mut min_pos = 0;
        for (pos, &case) in remaining.iter().enumerate() {
            let term = calc.scenario_term(&result, case)?;
            if term < min_term {
                min_term = term;
                min_pos = pos;
            }
        }
        result.push(remaining.remove(min_pos));
    }
    Ok(result)
}

/// Build the ordering by repeatedly appending the case most likely to be
/// the next failure, ignoring durations.
pub fn greedy_probability_order(calc: &mut TtffCalculator<'_>) -> Result<Vec<usize>> {
    let mut remaining: Vec<usize> = (0..calc.case_count()).collect();
    let mut result = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let mut max_prob = -1.0;
        let mut max_pos = 0;
        for (pos, &case) in remaining.iter().enumerate() {
            let p = calc.scenario_probability(&result, case)?;
            if p > max_prob {
                max_prob = p;
                max_pos = pos;
            }
        }
        result.push(remaining.remove(max_pos));
    }
    Ok(result)
}

#[must_use]
pub fn default_order(cases: usize) -> Vec<usize> {
    (0..cases).collect()
}

pub fn random_order<R: Rng + ?Sized>(cases: usize, rng: &mut R) -> Vec<usize> {
    let mut order = default_order(cases);
    order.shuffle(rng);
    order
}

/// Result of one strategy run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub strategy: Strategy,
    pub order: Vec<usize>,
    /// Unbounded expected TTFF of `order` under the model.
    pub expected_ttff: f64,
    /// Full-order evaluations spent by the strategy itself.
    pub evaluations: u64,
    /// Evaluations cut short by the bound.
    pub pruned: u64,
}

/// Dispatches a [`Strategy`] against a calculator.
#[derive(Debug, Clone, Copy)]
pub struct OrderSearch {
    max_exact_cases: usize,
}

impl Default for OrderSearch {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXACT_CASES)
    }
}

impl OrderSearch {
    #[must_use]
    pub const fn new(max_exact_cases: usize) -> Self {
        Self { max_exact_cases }
    }

    #[must_use]
    pub const fn max_exact_cases(&self) -> usize {
        self.max_exact_cases
    }

    /// Whether exact search is allowed for a universe of `cases`.
    #[must_use]
    pub const fn exact_feasible(&self, cases: usize) -> bool {
        cases <= self.max_exact_cases
    }

    pub fn run<R: Rng + ?Sized>(
        &self,
        strategy: Strategy,
        calc: &mut TtffCalculator<'_>,
        rng: &mut R,
    ) -> Result<SearchOutcome> {
        let _span = tracing::debug_span!(
            "order_search",
            strategy = strategy.as_str(),
            cases = calc.case_count()
        )
        .entered();

        let evaluations_before = calc.evaluations();
        let pruned_before = calc.pruned();
        let order = match strategy {
            Strategy::Exact => exact_order(calc, self.max_exact_cases)?,
            Strategy::GreedyCost => greedy_cost_order(calc)?,
            Strategy::GreedyProbability => greedy_probability_order(calc)?,
            Strategy::Default => default_order(calc.case_count()),
            Strategy::Random => random_order(calc.case_count(), rng),
        };
        let evaluations = calc.evaluations() - evaluations_before;
        let pruned = calc.pruned() - pruned_before;

        let expected_ttff = calc.expected_ttff(&order, f64::INFINITY)?;
        tracing::debug!(
            strategy = strategy.as_str(),
            expected_ttff,
            evaluations,
            pruned,
            "order search finished"
        );

        Ok(SearchOutcome {
            strategy,
            order,
            expected_ttff,
            evaluations,
            pruned,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::estimator::{ScenarioEstimator, Smoothing};
    use crate::matrix::{RunMatrix, fixtures};
    use crate::timing::CaseTimes;

    fn calculator(m: &RunMatrix, smoothing: Smoothing) -> TtffCalculator<'_> {
        let est = ScenarioEstimator::new(m, smoothing).expect("estimator");
        let times = CaseTimes::from_matrix(m).expect("times");
        TtffCalculator::new(est, times)
    }

    /// Three cases: `slow` always fails but takes 10, `fast` fails half the
    /// time and takes 1, `stable` never fails and takes 5.
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
    fn next_permutation_walks_lexicographically() {
        let mut perm = vec![0, 1, 2];
        let mut seen = vec![perm.clone()];
        while next_permutation(&mut perm) {
            seen.push(perm.clone());
        }
        assert_eq!(
            seen,
            vec![
                vec![0, 1, 2],
                vec![0, 2, 1],
                vec![1, 0, 2],
                vec![1, 2, 0],
                vec![2, 0, 1],
                vec![2, 1, 0],
            ]
        );
        let mut empty: Vec<usize> = Vec::new();
        assert!(!next_permutation(&mut empty));
    }

    #[test]
    fn exact_search_keeps_first_optimum_on_ties() {
        let m = fixtures::toy();
        let mut calc = calculator(&m, Smoothing::None);
        // Both orders score 1.75; declaration order is found first.
        assert_eq!(exact_order(&mut calc, 10).expect("exact"), vec![0, 1]);
    }

    #[test]
    fn exact_search_matches_brute_force() {
        let m = three_cases();
        let mut calc = calculator(&m, Smoothing::None);
        let best = exact_order(&mut calc, 10).expect("exact");
        let best_cost = calc.expected_ttff(&best, f64::INFINITY).expect("best");

        let mut perm = vec![0, 1, 2];
        loop {
            let cost = calc.expected_ttff(&perm, f64::INFINITY).expect("perm");
            assert!(best_cost <= cost + 1e-12, "{best:?} beaten by {perm:?}");
            if !next_permutation(&mut perm) {
                break;
            }
        }
        // fast first: its failure is both likely and cheap.
        assert_eq!(best[0], 2);
    }

    #[test]
    fn exact_search_rejects_large_universes() {
        let m = three_cases();
        let mut calc = calculator(&m, Smoothing::None);
        assert!(matches!(
            exact_order(&mut calc, 2),
            Err(TtffError::SearchInfeasible { cases: 3, limit: 2 })
        ));
    }

    #[test]
    fn greedy_cost_agrees_with_exact_on_toy_matrix() {
        let m = fixtures::toy();
        let mut calc = calculator(&m, Smoothing::None);
        let exact = exact_order(&mut calc, 10).expect("exact");
        let greedy = greedy_cost_order(&mut calc).expect("greedy");
        assert_eq!(exact, greedy);
    }

    #[test]
    fn greedy_cost_never_beats_exact() {
        let m = three_cases();
        let mut calc = calculator(&m, Smoothing::None);
        let exact = exact_order(&mut calc, 10).expect("exact");
        let greedy = greedy_cost_order(&mut calc).expect("greedy");
        let exact_cost = calc.expected_ttff(&exact, f64::INFINITY).expect("exact");
        let greedy_cost = calc.expected_ttff(&greedy, f64::INFINITY).expect("greedy");
        // (fast, slow, stable) = 0.5 + 5.5; greedy leads with stable.
        assert!((exact_cost - 6.0).abs() < 1e-12);
        assert!((greedy_cost - 11.0).abs() < 1e-12);
        assert!(exact_cost <= greedy_cost);
    }

    #[test]
    fn greedy_cost_prefers_zero_terms() {
        let m = three_cases();
        let mut calc = calculator(&m, Smoothing::None);
        // stable never fails: its first-position term is zero.
        let order = greedy_cost_order(&mut calc).expect("greedy");
        assert_eq!(order[0], 0);
    }

    #[test]
    fn greedy_probability_picks_most_likely_failure_first() {
        let m = three_cases();
        let mut calc = calculator(&m, Smoothing::None);
        let order = greedy_probability_order(&mut calc).expect("greedy");
        // slow fails in every run.
        assert_eq!(order[0], 1);
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn empty_universe_yields_empty_orders() {
        let m = RunMatrix::new(
            vec!["r".into()],
            vec![],
            vec![vec![]],
            vec![vec![]],
        )
        .expect("matrix");
        let mut calc = calculator(&m, Smoothing::None);
        let mut rng = SmallRng::seed_from_u64(7);
        let search = OrderSearch::default();
        for strategy in Strategy::ALL {
            let outcome = search.run(strategy, &mut calc, &mut rng).expect("run");
            assert!(outcome.order.is_empty());
            assert_eq!(outcome.expected_ttff, 0.0);
        }
    }

    #[test]
    fn random_order_is_a_seeded_permutation() {
        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        let first = random_order(8, &mut a);
        assert_eq!(first, random_order(8, &mut b));
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, default_order(8));
    }

    #[test]
    fn run_reports_strategy_and_expected_cost() {
        let m = three_cases();
        let mut calc = calculator(&m, Smoothing::None);
        let mut rng = SmallRng::seed_from_u64(1);
        let outcome = OrderSearch::default()
            .run(Strategy::Exact, &mut calc, &mut rng)
            .expect("exact");
        assert_eq!(outcome.strategy, Strategy::Exact);
        assert_eq!(outcome.evaluations, 6);
        let check = calc.expected_ttff(&outcome.order, f64::INFINITY).expect("check");
        assert_eq!(outcome.expected_ttff.to_bits(), check.to_bits());
    }

    #[test]
    fn strategy_names_round_trip() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.as_str().parse::<Strategy>().expect("parse"), strategy);
        }
        assert!("fastest".parse::<Strategy>().is_err());
        assert!(Strategy::GreedyCost.is_model_driven());
        assert!(!Strategy::Random.is_model_driven());
    }
}
