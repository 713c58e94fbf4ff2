//! Numeric rank and row-basis selection for equality systems.

use nalgebra::{DMatrix, DVector};
use wardrop_core::Real;

/// Relative threshold used when testing a row against the span of earlier rows.
const ROW_INDEPENDENCE_TOL: Real = 1e-9;

/// Numeric rank from the singular values, with the usual
/// `max(rows, cols) * eps * sigma_max` cutoff.
pub fn numeric_rank(a: &DMatrix<Real>) -> usize {
    let (rows, cols) = a.shape();
    if rows == 0 || cols == 0 {
        return 0;
    }
    let singular_values = a.clone().svd(false, false).singular_values;
    let sigma_max = singular_values.iter().copied().fold(0.0, Real::max);
    let cutoff = rows.max(cols) as Real * Real::EPSILON * sigma_max;
    singular_values.iter().filter(|&&sv| sv > cutoff).count()
}

/// Minimum-norm least-squares solution of `a x = b` from the SVD.
///
/// Singular values below the [`numeric_rank`] cutoff are treated as zero.
pub fn least_squares(a: &DMatrix<Real>, b: &DVector<Real>) -> Option<DVector<Real>> {
    let (rows, cols) = a.shape();
    if rows == 0 || cols == 0 {
        return Some(DVector::zeros(cols));
    }
    let svd = a.clone().svd(true, true);
    let sigma_max = svd.singular_values.iter().copied().fold(0.0, Real::max);
    let cutoff = rows.max(cols) as Real * Real::EPSILON * sigma_max;
    svd.solve(b, cutoff).ok()
}

/// Greedy row basis: walk the rows in order and keep each row that is not in
/// the span of the rows kept so far (modified Gram-Schmidt).
///
/// Stops once `limit` rows are kept, so the result never exceeds the rank
/// computed by [`numeric_rank`].
pub fn independent_rows(a: &DMatrix<Real>, limit: usize) -> Vec<usize> {
    let mut basis: Vec<DVector<Real>> = Vec::with_capacity(limit);
    let mut kept = Vec::with_capacity(limit);

    for (i, row) in a.row_iter().enumerate() {
        if kept.len() == limit {
            break;
        }
        let row: DVector<Real> = row.transpose();
        let norm = row.norm();
        if norm == 0.0 {
            continue;
        }
        let mut residual = row;
        // Two passes keep the projection accurate for nearly dependent rows.
        for _ in 0..2 {
            for q in &basis {
                let proj = q.dot(&residual);
                residual -= q * proj;
            }
        }
        let residual_norm = residual.norm();
        if residual_norm > ROW_INDEPENDENCE_TOL * norm {
            basis.push(residual / residual_norm);
            kept.push(i);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_of_incidence_matrix_is_deficient() {
        // Two nodes, two parallel links: rows are negatives of each other.
        let a = DMatrix::from_row_slice(2, 2, &[-1.0, -1.0, 1.0, 1.0]);
        assert_eq!(numeric_rank(&a), 1);
        assert_eq!(independent_rows(&a, 1), vec![0]);
    }

    #[test]
    fn full_rank_keeps_all_rows() {
        let a = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 2.0, 0.0, 1.0, 1.0]);
        assert_eq!(numeric_rank(&a), 2);
        assert_eq!(independent_rows(&a, 2), vec![0, 1]);
    }

    #[test]
    fn dependent_middle_row_is_skipped() {
        let a = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 1.0, 0.0, 2.0, 2.0, 0.0, 0.0, 1.0, 1.0],
        );
        assert_eq!(numeric_rank(&a), 2);
        assert_eq!(independent_rows(&a, 2), vec![0, 2]);
    }

    #[test]
    fn least_squares_solves_consistent_deficient_system() {
        let a = DMatrix::from_row_slice(2, 2, &[-1.0, -1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![-4.0, 4.0]);
        let x = least_squares(&a, &b).unwrap();
        assert!(((&a * &x) - &b).amax() < 1e-12);
        // Minimum norm splits evenly.
        assert!((x[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn least_squares_leaves_residual_for_inconsistent_system() {
        let a = DMatrix::from_row_slice(2, 1, &[1.0, 1.0]);
        let b = DVector::from_vec(vec![3.0, 5.0]);
        let x = least_squares(&a, &b).unwrap();
        assert!((x[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn empty_matrices_have_rank_zero() {
        assert_eq!(numeric_rank(&DMatrix::zeros(3, 0)), 0);
        assert_eq!(numeric_rank(&DMatrix::zeros(0, 3)), 0);
        assert!(independent_rows(&DMatrix::zeros(3, 2), 0).is_empty());
    }
}
