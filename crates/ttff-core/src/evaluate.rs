#![forbid(unsafe_code)]

//! Ground-truth scoring of orderings against the historical runs.
//!
//! Nothing here uses the probability model. Each historical run is replayed
//! against a concrete ordering: durations accumulate up to and including the
//! first case that failed in that run, or over the whole ordering when the
//! run had no failure.

use rand::Rng;

use crate::error::{Result, TtffError};
use crate::matrix::RunMatrix;
use crate::search::random_order;

/// Number of random permutations averaged by the random baseline.
pub const DEFAULT_RANDOM_SAMPLES: usize = 50;

fn replay(matrix: &RunMatrix, run: usize, order: &[usize]) -> f64 {
    let mut elapsed = 0.0;
    for &case in order {
        elapsed += matrix.duration(run, case);
        if !matrix.passed(run, case) {
            break;
        }
    }
    elapsed
}

/// TTFF of `order` in every historical run, in run order.
///
/// `order` must be a permutation of every case in `matrix`.
pub fn per_run_ttff(matrix: &RunMatrix, order: &[usize]) -> Result<Vec<f64>> {
    matrix.check_permutation(order)?;
    Ok((0..matrix.run_count())
        .map(|run| replay(matrix, run, order))
        .collect())
}

/// Mean TTFF of `order` over all historical runs.
///
/// An empty universe scores `0.0`; an empty matrix is an error.
pub fn true_mean_ttff(matrix: &RunMatrix, order: &[usize]) -> Result<f64> {
    if matrix.is_empty() {
        return Err(TtffError::EmptyMatrix);
    }
    let per_run = per_run_ttff(matrix, order)?;
    Ok(per_run.iter().sum::<f64>() / matrix.run_count() as f64)
}

/// Mean over runs of the best TTFF any ordering could achieve.
///
/// A run with failures contributes the shortest duration among its failing
/// cases. A run without failures contributes its full duration, which is
/// what every ordering pays for it.
pub fn lower_bound_ttff(matrix: &RunMatrix) -> Result<f64> {
    if matrix.is_empty() {
        return Err(TtffError::EmptyMatrix);
    }
    let total: f64 = (0..matrix.run_count())
        .map(|run| {
            let row = matrix.duration_row(run);
            let fastest_failure = (0..matrix.case_count())
                .filter(|&case| !matrix.passed(run, case))
                .map(|case| row[case])
                .reduce(f64::min);
            fastest_failure.unwrap_or_else(|| row.iter().sum())
        })
        .sum();
    Ok(total / matrix.run_count() as f64)
}

/// Mean TTFF averaged over `samples` uniform random orderings.
pub fn random_baseline<R: Rng + ?Sized>(
    matrix: &RunMatrix,
    samples: usize,
    rng: &mut R,
) -> Result<f64> {
    if samples == 0 {
        return Err(TtffError::InvalidConfig(vec![
            "random baseline needs at least one sample".to_string(),
        ]));
    }
    let mut total = 0.0;
    for _ in 0..samples {
        let order = random_order(matrix.case_count(), rng);
        total += true_mean_ttff(matrix, &order)?;
    }
    Ok(total / samples as f64)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::{lower_bound_ttff, per_run_ttff, random_baseline, true_mean_ttff};
    use crate::error::TtffError;
    use crate::matrix::{RunMatrix, fixtures};

    #[test]
    fn toy_true_mean_replays_every_run() {
        let m = fixtures::toy();
        // (a, b): 3, 1, 3, 3
        assert_eq!(per_run_ttff(&m, &[0, 1]).expect("ab"), vec![3.0, 1.0, 3.0, 3.0]);
        assert!((true_mean_ttff(&m, &[0, 1]).expect("ab") - 2.5).abs() < 1e-12);
        // (b, a): 2, 3, 3, 2
        assert!((true_mean_ttff(&m, &[1, 0]).expect("ba") - 2.5).abs() < 1e-12);
    }

    #[test]
    fn lower_bound_uses_fastest_failure_or_full_run() {
        let m = fixtures::toy();
        // 2, 1, 3 (no failure), 2
        assert!((lower_bound_ttff(&m).expect("bound") - 2.0).abs() < 1e-12);
        assert!(lower_bound_ttff(&m).expect("bound") <= true_mean_ttff(&m, &[0, 1]).expect("ab"));
    }

    #[test]
    fn empty_universe_scores_zero() {
        let m = RunMatrix::new(vec!["r".into()], vec![], vec![vec![]], vec![vec![]])
            .expect("matrix");
        assert_eq!(true_mean_ttff(&m, &[]).expect("empty order"), 0.0);
        assert_eq!(lower_bound_ttff(&m).expect("empty bound"), 0.0);
    }

    #[test]
    fn empty_matrix_is_an_error() {
        let m = RunMatrix::new(vec![], vec!["a".into()], vec![], vec![]).expect("matrix");
        assert!(matches!(true_mean_ttff(&m, &[0]), Err(TtffError::EmptyMatrix)));
        assert!(matches!(lower_bound_ttff(&m), Err(TtffError::EmptyMatrix)));
    }

    #[test]
    fn partial_or_repeated_orders_are_rejected() {
        let m = fixtures::toy();
        for order in [&[0, 9][..], &[0], &[0, 0], &[], &[1, 0, 1]] {
            assert!(
                matches!(
                    true_mean_ttff(&m, order),
                    Err(TtffError::NotAPermutation { .. })
                ),
                "{order:?} accepted"
            );
            assert!(matches!(
                per_run_ttff(&m, order),
                Err(TtffError::NotAPermutation { .. })
            ));
        }
    }

    #[test]
    fn random_baseline_is_seeded_and_bounded() {
        let m = fixtures::toy();
        let a = random_baseline(&m, 50, &mut SmallRng::seed_from_u64(3)).expect("a");
        let b = random_baseline(&m, 50, &mut SmallRng::seed_from_u64(3)).expect("b");
        assert_eq!(a.to_bits(), b.to_bits());
        // Both orders of the toy universe score 2.5.
        assert!((a - 2.5).abs() < 1e-12);
        assert!(random_baseline(&m, 0, &mut SmallRng::seed_from_u64(3)).is_err());
    }
}
