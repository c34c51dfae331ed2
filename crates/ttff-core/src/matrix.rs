#![forbid(unsafe_code)]

//! Historical run matrix: aligned pass/fail and duration tables.
//!
//! Rows are historical runs (in run-id order as supplied), columns are test
//! cases. The column set is the test universe for one prioritization run.
//! A matrix is never mutated after construction; every component borrows it.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, TtffError};

/// Immutable (run × test case) status and duration tables.
#[derive(Debug, Clone)]
pub struct RunMatrix {
    run_ids: Vec<String>,
    cases: Vec<String>,
    case_index: HashMap<String, usize>,
    statuses: Vec<Vec<bool>>,
    durations: Vec<Vec<f64>>,
}

impl RunMatrix {
    /// Build a matrix from row-major tables.
    ///
    /// `statuses[run][case]` is `true` when the case passed in that run.
    /// Both tables must have one row per run id and one cell per case;
    /// durations must be finite and non-negative.
    pub fn new(
        run_ids: Vec<String>,
        cases: Vec<String>,
        statuses: Vec<Vec<bool>>,
        durations: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if statuses.len() != run_ids.len() || durations.len() != run_ids.len() {
            return Err(TtffError::shape(format!(
                "{} run ids, {} status rows, {} duration rows",
                run_ids.len(),
                statuses.len(),
                durations.len()
            )));
        }

        let mut case_index = HashMap::with_capacity(cases.len());
        for (idx, case) in cases.iter().enumerate() {
            if case_index.insert(case.clone(), idx).is_some() {
                return Err(TtffError::DuplicateCase { case: case.clone() });
            }
        }

        for (row, run_id) in run_ids.iter().enumerate() {
            if statuses[row].len() != cases.len() || durations[row].len() != cases.len() {
                return Err(TtffError::shape(format!(
                    "run {run_id}: expected {} cells, status row has {}, duration row has {}",
                    cases.len(),
                    statuses[row].len(),
                    durations[row].len()
                )));
            }
            for (col, &value) in durations[row].iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(TtffError::InvalidDuration {
                        run: run_id.clone(),
                        case: cases[col].clone(),
                        value,
                    });
                }
            }
        }

        Ok(Self {
            run_ids,
            cases,
            case_index,
            statuses,
            durations,
        })
    }

    #[must_use]
    pub fn run_count(&self) -> usize {
        self.run_ids.len()
    }

    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.run_ids.is_empty()
    }

    #[must_use]
    pub fn run_ids(&self) -> &[String] {
        &self.run_ids
    }

    /// Test case names in declaration (column) order.
    #[must_use]
    pub fn cases(&self) -> &[String] {
        &self.cases
    }

    #[must_use]
    pub fn case_name(&self, case: usize) -> Option<&str> {
        self.cases.get(case).map(String::as_str)
    }

    #[must_use]
    pub fn case_index(&self, name: &str) -> Option<usize> {
        self.case_index.get(name).copied()
    }

    /// Pass/fail of `case` in `run`. Panics on out-of-range indices.
    #[inline]
    #[must_use]
    pub fn passed(&self, run: usize, case: usize) -> bool {
        self.statuses[run][case]
    }

    #[inline]
    #[must_use]
    pub fn duration(&self, run: usize, case: usize) -> f64 {
        self.durations[run][case]
    }

    #[must_use]
    pub fn status_row(&self, run: usize) -> &[bool] {
        &self.statuses[run]
    }

    #[must_use]
    pub fn duration_row(&self, run: usize) -> &[f64] {
        &self.durations[run]
    }

    /// Number of runs in which `case` failed.
    #[must_use]
    pub fn failure_count(&self, case: usize) -> usize {
        self.statuses.iter().filter(|row| !row[case]).count()
    }

    /// Map case names to column indices, keeping the caller's order.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.case_index(name.as_ref())
                    .ok_or_else(|| TtffError::UnknownCase {
                        case: name.as_ref().to_string(),
                        prefix: names.iter().map(|n| n.as_ref().to_string()).collect(),
                    })
            })
            .collect()
    }

    /// Names for a sequence of column indices. Out-of-range indices are skipped.
    #[must_use]
    pub fn names_of(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .filter_map(|&idx| self.cases.get(idx).cloned())
            .collect()
    }

    /// Restrict the universe to `names`, in the given order.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        let columns = self.resolve(names)?;
        let cases = self.names_of(&columns);
        let statuses = self
            .statuses
            .iter()
            .map(|row| columns.iter().map(|&c| row[c]).collect())
            .collect();
        let durations = self
            .durations
            .iter()
            .map(|row| columns.iter().map(|&c| row[c]).collect())
            .collect();
        Self::new(self.run_ids.clone(), cases, statuses, durations)
    }

    /// Reject `order` unless it lists every case exactly once.
    pub(crate) fn check_permutation(&self, order: &[usize]) -> Result<()> {
        if order.len() != self.case_count() {
            return Err(TtffError::NotAPermutation {
                detail: format!(
                    "{} entries for a universe of {} test cases",
                    order.len(),
                    self.case_count()
                ),
            });
        }
        let mut seen = HashSet::with_capacity(order.len());
        for &idx in order {
            if idx >= self.case_count() {
                return Err(TtffError::NotAPermutation {
                    detail: format!("index {idx} is out of range"),
                });
            }
            if !seen.insert(idx) {
                return Err(TtffError::NotAPermutation {
                    detail: format!("{} appears more than once", self.cases[idx]),
                });
            }
        }
        Ok(())
    }
}

/// A candidate execution order: a permutation of every case in a matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestOrder(Vec<usize>);

impl TestOrder {
    /// Declaration order of `matrix`.
    #[must_use]
    pub fn declaration(matrix: &RunMatrix) -> Self {
        Self((0..matrix.case_count()).collect())
    }

    /// Validate that `indices` is a permutation of `0..matrix.case_count()`.
    pub fn from_indices(matrix: &RunMatrix, indices: Vec<usize>) -> Result<Self> {
        matrix.check_permutation(&indices)?;
        Ok(Self(indices))
    }

    pub fn from_names<S: AsRef<str>>(matrix: &RunMatrix, names: &[S]) -> Result<Self> {
        let indices = matrix.resolve(names)?;
        Self::from_indices(matrix, indices)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    #[must_use]
    pub fn names(&self, matrix: &RunMatrix) -> Vec<String> {
        matrix.names_of(&self.0)
    }
}
