#![forbid(unsafe_code)]

//! Scenario probability estimation with additive smoothing.
//!
//! A *scenario* is an ordered prefix of test cases read as "every case but
//! the last passes, the last one fails". Its probability is estimated from
//! the fraction of historical runs that match:
//!
//! ```text
//! unsmoothed:  P(s) = k / N
//! additive:    P(s) = (k + α) / (N + α · 2^|s|)
//! ```
//!
//! where `k` is the number of matching runs, `N` the number of runs, and
//! `2^|s|` the number of pass/fail assignments over the prefix.
//!
//! # Zero probabilities
//!
//! Unsmoothed estimates are exactly zero for scenarios never observed, which
//! makes the cost model skip their term. Additive smoothing treats them as
//! rare instead. Which one to use is a policy choice of the caller.
//!
//! # Cache
//!
//! Estimates are memoized per exact ordered prefix. The cache belongs to one
//! estimator, which borrows one matrix under one smoothing setting; changing
//! the smoothing clears it.

use std::collections::HashMap;

use crate::error::{Result, TtffError};
use crate::matrix::RunMatrix;

/// Smoothing applied to scenario frequencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Smoothing {
    /// Plain empirical frequency; unseen scenarios have probability zero.
    None,
    /// Add `alpha` pseudo-counts to every pass/fail assignment of the prefix.
    Additive { alpha: f64 },
}

impl Smoothing {
    /// `0` disables smoothing; negative or non-finite values are rejected.
    pub fn from_alpha(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(TtffError::InvalidConfig(vec![format!(
                "smoothing alpha must be finite and >= 0, got {alpha}"
            )]));
        }
        if alpha == 0.0 {
            Ok(Self::None)
        } else {
            Ok(Self::Additive { alpha })
        }
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Additive { alpha } => *alpha,
        }
    }
}

/// Cache counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug)]
pub struct ScenarioEstimator<'m> {
    matrix: &'m RunMatrix,
    smoothing: Smoothing,
    cache: HashMap<Box<[usize]>, f64>,
    hits: u64,
    misses: u64,
}

impl<'m> ScenarioEstimator<'m> {
    pub fn new(matrix: &'m RunMatrix, smoothing: Smoothing) -> Result<Self> {
        if matrix.is_empty() {
            return Err(TtffError::EmptyMatrix);
        }
        Ok(Self {
            matrix,
            smoothing,
            cache: HashMap::new(),
            hits: 0,
            misses: 0,
        })
    }

    #[must_use]
    pub fn matrix(&self) -> &'m RunMatrix {
        self.matrix
    }

    #[must_use]
    pub fn smoothing(&self) -> Smoothing {
        self.smoothing
    }

    /// Change the smoothing policy. Cached estimates are dropped.
    pub fn set_smoothing(&mut self, smoothing: Smoothing) {
        if smoothing != self.smoothing {
            self.smoothing = smoothing;
            self.invalidate();
        }
    }

    /// Drop every cached estimate and reset the counters.
    pub fn invalidate(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn check_prefix(&self, prefix: &[usize]) -> Result<()> {
        if prefix.is_empty() {
            return Err(TtffError::EmptyScenario);
        }
        if let Some(&bad) = prefix.iter().find(|&&c| c >= self.matrix.case_count()) {
            let describe = |c: usize| {
                self.matrix
                    .case_name(c)
                    .map_or_else(|| format!("#{c}"), ToOwned::to_owned)
            };
            return Err(TtffError::UnknownCase {
                case: describe(bad),
                prefix: prefix.iter().map(|&c| describe(c)).collect(),
            });
        }
        Ok(())
    }

    /// Number of runs where every case of `prefix` but the last passed and
    /// the last one failed. Not cached.
    pub fn matching_runs(&self, prefix: &[usize]) -> Result<usize> {
        self.check_prefix(prefix)?;
        let (&last, passing) = prefix
            .split_last()
            .ok_or(TtffError::EmptyScenario)?;
        Ok((0..self.matrix.run_count())
            .filter(|&run| {
                let row = self.matrix.status_row(run);
                !row[last] && passing.iter().all(|&c| row[c])
            })
            .count())
    }

    /// Estimated probability of the scenario `prefix`, in `[0, 1]`.
    pub fn probability(&mut self, prefix: &[usize]) -> Result<f64> {
        if let Some(&p) = self.cache.get(prefix) {
            self.hits += 1;
            return Ok(p);
        }

        let count = self.matching_runs(prefix)? as f64;
        let total = self.matrix.run_count() as f64;
        let p = match self.smoothing {
            Smoothing::None => count / total,
            Smoothing::Additive { alpha } => {
                let assignments = 2f64.powi(i32::try_from(prefix.len()).unwrap_or(i32::MAX));
                (count + alpha) / (total + alpha * assignments)
            }
        };

        self.misses += 1;
        self.cache.insert(prefix.into(), p);
        Ok(p)
    }

    /// [`probability`](Self::probability) addressed by case names.
    pub fn probability_of<S: AsRef<str>>(&mut self, names: &[S]) -> Result<f64> {
        if names.is_empty() {
            return Err(TtffError::EmptyScenario);
        }
        let prefix = self.matrix.resolve(names)?;
        self.probability(&prefix)
    }
}
