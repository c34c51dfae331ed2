#![forbid(unsafe_code)]

//! Representative failure and success durations per test case.
//!
//! The cost model uses point estimates, not distributions: for each case the
//! duration of the first run (in run order) where it failed, and of the first
//! run where it passed. A case that never failed borrows its passing duration
//! as failure time, and vice versa.

use crate::error::{Result, TtffError};
use crate::matrix::RunMatrix;

#[derive(Debug, Clone, PartialEq)]
pub struct CaseTimes {
    failure: Vec<f64>,
    success: Vec<f64>,
}

impl CaseTimes {
    pub fn from_matrix(matrix: &RunMatrix) -> Result<Self> {
        let n = matrix.case_count();
        if n > 0 && matrix.is_empty() {
            return Err(TtffError::EmptyMatrix);
        }

        let mut failure = Vec::with_capacity(n);
        let mut success = Vec::with_capacity(n);
        for case in 0..n {
            let first_with = |passed: bool| {
                (0..matrix.run_count())
                    .find(|&run| matrix.passed(run, case) == passed)
                    .map(|run| matrix.duration(run, case))
            };
            let failed = first_with(false);
            let passed = first_with(true);
            // At least one of the two exists because the matrix has runs.
            let (Some(f), Some(s)) = (failed.or(passed), passed.or(failed)) else {
                return Err(TtffError::MissingTiming { case });
            };
            failure.push(f);
            success.push(s);
        }

        Ok(Self { failure, success })
    }

    /// Explicit tables, for callers that estimate durations elsewhere.
    pub fn from_parts(failure: Vec<f64>, success: Vec<f64>) -> Result<Self> {
        if failure.len() != success.len() {
            return Err(TtffError::shape(format!(
                "{} failure times, {} success times",
                failure.len(),
                success.len()
            )));
        }
        Ok(Self { failure, success })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failure.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failure.is_empty()
    }

    #[inline]
    pub fn failure_time(&self, case: usize) -> Result<f64> {
        self.failure
            .get(case)
            .copied()
            .ok_or(TtffError::MissingTiming { case })
    }

    #[inline]
    pub fn success_time(&self, case: usize) -> Result<f64> {
        self.success
            .get(case)
            .copied()
            .ok_or(TtffError::MissingTiming { case })
    }

    /// Sum of success times over `cases`.
    pub fn success_sum(&self, cases: &[usize]) -> Result<f64> {
        cases.iter().map(|&c| self.success_time(c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::CaseTimes;
    use crate::error::TtffError;
    use crate::matrix::{RunMatrix, fixtures};

    #[test]
    fn picks_first_failing_and_first_passing_run() {
        let m = RunMatrix::new(
            vec!["r1".into(), "r2".into(), "r3".into()],
            vec!["a".into()],
            vec![vec![true], vec![false], vec![false]],
            vec![vec![5.0], vec![7.0], vec![9.0]],
        )
        .expect("matrix");
        let t = CaseTimes::from_matrix(&m).expect("times");
        assert_eq!(t.failure_time(0).expect("failure"), 7.0);
        assert_eq!(t.success_time(0).expect("success"), 5.0);
    }

    #[test]
    fn falls_back_when_a_case_never_fails_or_never_passes() {
        let m = RunMatrix::new(
            vec!["r1".into(), "r2".into()],
            vec!["always_pass".into(), "always_fail".into()],
            vec![vec![true, false], vec![true, false]],
            vec![vec![3.0, 4.0], vec![8.0, 6.0]],
        )
        .expect("matrix");
        let t = CaseTimes::from_matrix(&m).expect("times");
        assert_eq!(t.failure_time(0).expect("fallback"), 3.0);
        assert_eq!(t.success_time(0).expect("success"), 3.0);
        assert_eq!(t.failure_time(1).expect("failure"), 4.0);
        assert_eq!(t.success_time(1).expect("fallback"), 4.0);
    }

    #[test]
    fn missing_entries_are_configuration_errors() {
        let t = CaseTimes::from_matrix(&fixtures::toy()).expect("times");
        assert!(matches!(
            t.failure_time(5),
            Err(TtffError::MissingTiming { case: 5 })
        ));
        assert_eq!(t.success_sum(&[0, 1]).expect("sum"), 3.0);
    }

    #[test]
    fn empty_matrix_with_cases_is_rejected() {
        let m = RunMatrix::new(vec![], vec!["a".into()], vec![], vec![]).expect("matrix");
        assert!(matches!(
            CaseTimes::from_matrix(&m),
            Err(TtffError::EmptyMatrix)
        ));
    }
}
