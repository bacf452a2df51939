//! Dense matrix routines for covariance handling
//!
//! Small symmetric systems only: asset universes here are tens to a few
//! hundred names, so simple O(n^3) algorithms with partial pivoting are
//! both adequate and easy to audit.

use crate::error::{Result, StatsError};
use ndarray::{Array1, Array2};

/// Pivot threshold below which a matrix is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Invert a square matrix via Gauss-Jordan elimination with partial pivoting.
///
/// # Errors
/// Returns `SingularMatrix` if a pivot falls below tolerance, and a
/// dimension error for non-square input.
pub fn invert(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    // Augmented [A | I] worked in place.
    let mut a = matrix.clone();
    let mut inv = Array2::<f64>::eye(n);

    for col in 0..n {
        let mut pivot_row = col;
        let mut pivot_val = a[[col, col]].abs();
        for row in (col + 1)..n {
            let candidate = a[[row, col]].abs();
            if candidate > pivot_val {
                pivot_val = candidate;
                pivot_row = row;
            }
        }
        if pivot_val < SINGULAR_TOLERANCE {
            return Err(StatsError::SingularMatrix);
        }
        if pivot_row != col {
            for j in 0..n {
                a.swap([col, j], [pivot_row, j]);
                inv.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = a[[col, col]];
        for j in 0..n {
            a[[col, j]] /= pivot;
            inv[[col, j]] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[[row, j]] -= factor * a[[col, j]];
                inv[[row, j]] -= factor * inv[[col, j]];
            }
        }
    }

    Ok(inv)
}

/// Cholesky factorization of a symmetric positive-definite matrix.
///
/// Returns the lower-triangular factor `L` with `A = L L'`.
///
/// # Errors
/// Returns `NotPositiveDefinite` if any diagonal pivot is non-positive.
pub fn cholesky(matrix: &Array2<f64>) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut acc = matrix[[i, j]];
            for k in 0..j {
                acc -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if acc <= 0.0 {
                    return Err(StatsError::NotPositiveDefinite);
                }
                l[[i, j]] = acc.sqrt();
            } else {
                l[[i, j]] = acc / l[[j, j]];
            }
        }
    }
    Ok(l)
}

/// Whether a symmetric matrix admits a Cholesky factorization.
pub fn is_positive_definite(matrix: &Array2<f64>) -> bool {
    cholesky(matrix).is_ok()
}

/// Symmetric eigendecomposition via cyclic Jacobi sweeps.
///
/// Returns `(eigenvalues, eigenvectors)` with eigenvalues in descending
/// order and eigenvectors as matching columns.
pub fn jacobi_eigen(matrix: &Array2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    const MAX_SWEEPS: usize = 64;
    const OFF_DIAGONAL_TOLERANCE: f64 = 1e-14;

    for _sweep in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|p| ((p + 1)..n).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        if off.sqrt() < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() < OFF_DIAGONAL_TOLERANCE {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (1.0 + theta * theta).sqrt())
                } else {
                    -1.0 / (-theta + (1.0 + theta * theta).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| {
        a[[j, j]]
            .partial_cmp(&a[[i, i]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eigenvalues = Array1::from_iter(order.iter().map(|&i| a[[i, i]]));
    let mut eigenvectors = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        eigenvectors.column_mut(dst).assign(&v.column(src));
    }

    Ok((eigenvalues, eigenvectors))
}

/// Nearest positive-definite correction of a (possibly broken) covariance
/// matrix.
///
/// Symmetrizes the input, then clips every eigenvalue of the symmetric part
/// up to `min_eigenvalue` and reconstructs (the symmetric polar-factor
/// correction). Already-positive-definite input passes through unchanged up
/// to floating error.
///
/// # Arguments
///
/// * `matrix` - Square matrix to repair (typically a sample covariance)
/// * `min_eigenvalue` - Floor applied to every eigenvalue
pub fn nearest_positive_definite(matrix: &Array2<f64>, min_eigenvalue: f64) -> Result<Array2<f64>> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: matrix.ncols(),
        });
    }

    let symmetric = (matrix + &matrix.t()) / 2.0;
    let (eigenvalues, eigenvectors) = jacobi_eigen(&symmetric)?;

    let clipped = eigenvalues.mapv(|v| v.max(min_eigenvalue));

    // V * diag(clipped) * V'
    let mut scaled = eigenvectors.clone();
    for (j, &lambda) in clipped.iter().enumerate() {
        scaled.column_mut(j).mapv_inplace(|x| x * lambda);
    }
    let repaired = scaled.dot(&eigenvectors.t());

    // Re-symmetrize to wash out rounding.
    Ok((&repaired + &repaired.t()) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_invert_identity() {
        let eye = Array2::<f64>::eye(3);
        let inv = invert(&eye).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(inv[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_invert_round_trip() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let inv = invert(&m).unwrap();
        let product = m.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[[i, j]], expected, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_invert_singular() {
        let m = array![[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(invert(&m), Err(StatsError::SingularMatrix)));
    }

    #[test]
    fn test_cholesky_reconstructs() {
        let m = array![[4.0, 2.0], [2.0, 3.0]];
        let l = cholesky(&m).unwrap();
        let reconstructed = l.dot(&l.t());
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(reconstructed[[i, j]], m[[i, j]], epsilon = 1e-12);
            }
        }
        // lower triangular
        assert_relative_eq!(l[[0, 1]], 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_cholesky_rejects_indefinite() {
        let m = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(cholesky(&m), Err(StatsError::NotPositiveDefinite)));
    }

    #[test]
    fn test_jacobi_eigen_diagonal() {
        let m = array![[3.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 2.0]];
        let (values, _) = jacobi_eigen(&m).unwrap();
        assert_relative_eq!(values[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(values[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(values[2], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_jacobi_eigen_known_values() {
        // [[2, 1], [1, 2]] has eigenvalues 3 and 1.
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let (values, vectors) = jacobi_eigen(&m).unwrap();
        assert_relative_eq!(values[0], 3.0, epsilon = 1e-10);
        assert_relative_eq!(values[1], 1.0, epsilon = 1e-10);

        // Reconstruct V * diag * V'
        let mut scaled = vectors.clone();
        for (j, &lambda) in values.iter().enumerate() {
            scaled.column_mut(j).mapv_inplace(|x| x * lambda);
        }
        let reconstructed = scaled.dot(&vectors.t());
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(reconstructed[[i, j]], m[[i, j]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_nearest_positive_definite_repairs_singular() {
        // Rank-1 matrix: eigenvalues 1.25 and 0.
        let m = array![[1.0, 0.5], [0.5, 0.25]];
        assert!(!is_positive_definite(&m));
        let fixed = nearest_positive_definite(&m, 1e-8).unwrap();
        assert!(is_positive_definite(&fixed));
    }

    #[test]
    fn test_nearest_positive_definite_preserves_pd_input() {
        let m = array![[0.04, 0.006], [0.006, 0.01]];
        let fixed = nearest_positive_definite(&m, 1e-10).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert_relative_eq!(fixed[[i, j]], m[[i, j]], epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_nearest_positive_definite_repairs_negative_eigenvalue() {
        // [[1, 2], [2, 1]] has eigenvalues 3 and -1.
        let m = array![[1.0, 2.0], [2.0, 1.0]];
        let fixed = nearest_positive_definite(&m, 1e-8).unwrap();
        assert!(is_positive_definite(&fixed));
        let (values, _) = jacobi_eigen(&fixed).unwrap();
        assert!(values.iter().all(|&v| v > 0.0));
    }
}
