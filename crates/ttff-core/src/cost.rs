#![forbid(unsafe_code)]

//! Expected time-to-first-failure of an ordering.
//!
//! # Mathematical Model
//!
//! For an ordering `π` the first failure happens at position `i` with
//! probability `P(π_0..=π_i)` (scenario estimate), after spending the success
//! time of every earlier case plus the failure time of `π_i`:
//!
//! ```text
//! E[TTFF(π)] = Σ_i  P(π_0..=π_i) × ( f(π_i) + Σ_{j<i} s(π_j) )
//! ```
//!
//! There is no explicit "nothing failed" term. That is exact only when the
//! scenario probabilities and the no-failure mass sum to one, which additive
//! smoothing does not guarantee; the sum is used as-is.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | `P = 0` | Term skipped |
//! | Running total `>= bound` | Return `+inf` immediately |
//! | Case without timing | `MissingTiming` error |
//! | Ordering not a permutation of the universe | `NotAPermutation` error |
//! | Empty universe | `0.0` |

use crate::error::Result;
use crate::estimator::{CacheStats, ScenarioEstimator};
use crate::timing::CaseTimes;

#[derive(Debug)]
pub struct TtffCalculator<'m> {
    estimator: ScenarioEstimator<'m>,
    times: CaseTimes,
    evaluations: u64,
    pruned: u64,
}

impl<'m> TtffCalculator<'m> {
    #[must_use]
    pub fn new(estimator: ScenarioEstimator<'m>, times: CaseTimes) -> Self {
        Self {
            estimator,
            times,
            evaluations: 0,
            pruned: 0,
        }
    }

    #[must_use]
    pub fn estimator(&self) -> &ScenarioEstimator<'m> {
        &self.estimator
    }

    /// Number of cases in the universe the calculator scores.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.estimator.matrix().case_count()
    }

    /// Full orderings scored so far.
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Orderings abandoned early because they could not beat their bound.
    #[must_use]
    pub fn pruned(&self) -> u64 {
        self.pruned
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.estimator.cache_stats()
    }

    /// Expected TTFF of `order`, or `+inf` once the running total reaches
    /// `bound`. Pass `f64::INFINITY` for an unbounded evaluation.
    pub fn expected_ttff(&mut self, order: &[usize], bound: f64) -> Result<f64> {
        self.estimator.matrix().check_permutation(order)?;
        self.evaluations += 1;
        let mut total = 0.0;
        let mut elapsed = 0.0;

        for i in 0..order.len() {
            let case = order[i];
            let failure = self.times.failure_time(case)?;
            let success = self.times.success_time(case)?;
            let p = self.estimator.probability(&order[..=i])?;

            if p != 0.0 {
                total += p * (failure + elapsed);
                if total >= bound {
                    self.pruned += 1;
                    return Ok(f64::INFINITY);
                }
            }
            elapsed += success;
        }

        Ok(total)
    }

    /// Term contributed by appending `case` after `prefix`:
    /// `P(prefix + [case]) × (f(case) + Σ s(prefix))`.
    pub fn scenario_term(&mut self, prefix: &[usize], case: usize) -> Result<f64> {
        let mut scenario = Vec::with_capacity(prefix.len() + 1);
        scenario.extend_from_slice(prefix);
        scenario.push(case);
        let p = self.estimator.probability(&scenario)?;
        let elapsed = self.times.success_sum(prefix)?;
        Ok(p * (self.times.failure_time(case)? + elapsed))
    }

    /// Scenario probability of `prefix + [case]`.
    pub fn scenario_probability(&mut self, prefix: &[usize], case: usize) -> Result<f64> {
        let mut scenario = Vec::with_capacity(prefix.len() + 1);
        scenario.extend_from_slice(prefix);
        scenario.push(case);
        self.estimator.probability(&scenario)
    }
}
