//! Small dense linear algebra for correlation matrices
//!
//! Matrices are row-major `Vec<f64>` of `n * n` entries. Game-scoped matrices
//! are a few dozen players wide, so cyclic Jacobi and plain Cholesky are fast
//! enough and keep results bit-reproducible.

use crate::error::{ForecastError, Result};

const MAX_SWEEPS: usize = 100;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-22;

/// Symmetric eigendecomposition (eigenvalues, column eigenvectors)
pub fn symmetric_eigen(matrix: &[f64], n: usize) -> (Vec<f64>, Vec<f64>) {
    debug_assert_eq!(matrix.len(), n * n);
    let mut a = matrix.to_vec();
    let mut v = identity(n);

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[p * n + q] * a[p * n + q];
            }
        }
        if off < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p * n + q];
                if apq == 0.0 {
                    continue;
                }
                let app = a[p * n + p];
                let aqq = a[q * n + q];
                let theta = (aqq - app) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    if k == p || k == q {
                        continue;
                    }
                    let akp = a[k * n + p];
                    let akq = a[k * n + q];
                    let new_kp = c * akp - s * akq;
                    let new_kq = s * akp + c * akq;
                    a[k * n + p] = new_kp;
                    a[p * n + k] = new_kp;
                    a[k * n + q] = new_kq;
                    a[q * n + k] = new_kq;
                }
                a[p * n + p] = app - t * apq;
                a[q * n + q] = aqq + t * apq;
                a[p * n + q] = 0.0;
                a[q * n + p] = 0.0;

                for k in 0..n {
                    let vkp = v[k * n + p];
                    let vkq = v[k * n + q];
                    v[k * n + p] = c * vkp - s * vkq;
                    v[k * n + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues = (0..n).map(|i| a[i * n + i]).collect();
    (eigenvalues, v)
}

/// Smallest eigenvalue of a symmetric matrix
pub fn min_eigenvalue(matrix: &[f64], n: usize) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let (values, _) = symmetric_eigen(matrix, n);
    values.into_iter().fold(f64::INFINITY, f64::min)
}

/// Repair a correlation matrix in place by clipping eigenvalues to `floor` and
/// rescaling to unit diagonal. Returns whether the matrix changed.
pub fn clip_to_correlation(matrix: &mut [f64], n: usize, floor: f64) -> bool {
    if n < 2 {
        return false;
    }
    let (values, vectors) = symmetric_eigen(matrix, n);
    if values.iter().all(|&lambda| lambda >= floor) {
        return false;
    }

    let clipped: Vec<f64> = values.iter().map(|&lambda| lambda.max(floor)).collect();
    let mut rebuilt = vec![0.0; n * n];
    for i in 0..n {
        for j in i..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += vectors[i * n + k] * clipped[k] * vectors[j * n + k];
            }
            rebuilt[i * n + j] = sum;
            rebuilt[j * n + i] = sum;
        }
    }

    for i in 0..n {
        for j in 0..n {
            matrix[i * n + j] = if i == j {
                1.0
            } else {
                let scale = (rebuilt[i * n + i] * rebuilt[j * n + j]).sqrt();
                (rebuilt[i * n + j] / scale).clamp(-1.0, 1.0)
            };
        }
    }
    true
}

/// Lower-triangular Cholesky factor, `None` when the matrix is not positive definite
pub fn cholesky(matrix: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut lower = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = matrix[i * n + j];
            for k in 0..j {
                sum -= lower[i * n + k] * lower[j * n + k];
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                lower[i * n + i] = sum.sqrt();
            } else {
                lower[i * n + j] = sum / lower[j * n + j];
            }
        }
    }
    Some(lower)
}

/// Cholesky with shrinking toward the identity on failure.
///
/// Attempt `k` uses `(A + jI) / (1 + j)` with `j = 1e-8 * 10^k`, which keeps a
/// unit diagonal. Returns the factor and the jitter that was applied.
pub fn cholesky_with_jitter(matrix: &[f64], n: usize, attempts: u32) -> Result<(Vec<f64>, f64)> {
    if let Some(lower) = cholesky(matrix, n) {
        return Ok((lower, 0.0));
    }

    let mut jitter = 1e-8;
    for _ in 0..attempts {
        let mut shrunk = matrix.to_vec();
        for i in 0..n {
            for j in 0..n {
                shrunk[i * n + j] = if i == j { 1.0 } else { matrix[i * n + j] / (1.0 + jitter) };
            }
        }
        if let Some(lower) = cholesky(&shrunk, n) {
            tracing::debug!(dimension = n, jitter, "cholesky succeeded after jitter");
            return Ok((lower, jitter));
        }
        jitter *= 10.0;
    }

    Err(ForecastError::Numerical(format!(
        "correlation matrix of dimension {n} is not positive definite after {attempts} jitter attempts"
    )))
}

fn identity(n: usize) -> Vec<f64> {
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        m[i * n + i] = 1.0;
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eigen_of_two_by_two() {
        let m = vec![1.0, 0.5, 0.5, 1.0];
        let (mut values, _) = symmetric_eigen(&m, 2);
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((values[0] - 0.5).abs() < 1e-12);
        assert!((values[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_eigenvectors_reconstruct_matrix() {
        let n = 3;
        let m = vec![1.0, 0.3, -0.2, 0.3, 1.0, 0.6, -0.2, 0.6, 1.0];
        let (values, vectors) = symmetric_eigen(&m, n);
        for i in 0..n {
            for j in 0..n {
                let mut sum = 0.0;
                for k in 0..n {
                    sum += vectors[i * n + k] * values[k] * vectors[j * n + k];
                }
                assert!((sum - m[i * n + j]).abs() < 1e-10, "entry ({i},{j}) = {sum}");
            }
        }
    }

    #[test]
    fn test_cholesky_reproduces_matrix() {
        let n = 3;
        let m = vec![1.0, 0.4, 0.2, 0.4, 1.0, 0.3, 0.2, 0.3, 1.0];
        let lower = cholesky(&m, n).expect("positive definite");
        for i in 0..n {
            for j in 0..n {
                let sum: f64 = (0..n).map(|k| lower[i * n + k] * lower[j * n + k]).sum();
                assert!((sum - m[i * n + j]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_inconsistent_matrix_is_repaired() {
        // a~b and a~c strongly positive but b~c strongly negative: not PSD
        let n = 3;
        let mut m = vec![1.0, 0.9, 0.9, 0.9, 1.0, -0.9, 0.9, -0.9, 1.0];
        assert!(cholesky(&m, n).is_none());
        assert!(min_eigenvalue(&m, n) < 0.0);

        let changed = clip_to_correlation(&mut m, n, 1e-6);
        assert!(changed);
        for i in 0..n {
            assert_eq!(m[i * n + i], 1.0);
            for j in 0..n {
                assert_eq!(m[i * n + j], m[j * n + i]);
                assert!(m[i * n + j].abs() <= 1.0);
            }
        }
        assert!(cholesky_with_jitter(&m, n, 5).is_ok());
    }

    #[test]
    fn test_valid_matrix_untouched() {
        let n = 2;
        let mut m = vec![1.0, 0.5, 0.5, 1.0];
        assert!(!clip_to_correlation(&mut m, n, 1e-6));
        assert_eq!(m, vec![1.0, 0.5, 0.5, 1.0]);
    }
}
