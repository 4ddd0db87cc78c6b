//! Linear algebra utilities.
//!
//! Covariance handling for the market model: symmetry and positive
//! semi-definiteness checks, the split of a covariance matrix into
//! marginal volatilities and a correlation matrix, and a square-root
//! factor used to draw correlated shocks.

use crate::error::{MathError, MathResult};
use nalgebra::{DMatrix, DVector};

/// Default relative tolerance for symmetry and PSD checks.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

fn ensure_square(matrix: &DMatrix<f64>) -> MathResult<usize> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: matrix.ncols(),
            rows2: matrix.ncols(),
            cols2: n,
        });
    }
    Ok(n)
}

/// Largest absolute entry, floored at one so tolerances stay absolute for
/// small matrices.
fn scale_of(matrix: &DMatrix<f64>) -> f64 {
    matrix.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()))
}

/// Returns true if the matrix is square and symmetric within `tolerance`
/// (relative to its largest entry).
pub fn is_symmetric(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return false;
    }
    let tol = tolerance * scale_of(matrix);
    for i in 0..n {
        for j in i + 1..n {
            if (matrix[(i, j)] - matrix[(j, i)]).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// Smallest eigenvalue of a symmetric matrix.
pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> MathResult<f64> {
    let n = ensure_square(matrix)?;
    if n == 0 {
        return Err(MathError::insufficient_data(1, 0));
    }
    let eigen = matrix.clone().symmetric_eigen();
    Ok(eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min))
}

/// Checks that a matrix is a valid covariance matrix: square, finite,
/// symmetric and positive semi-definite.
///
/// Eigenvalues down to `-tolerance * scale` are accepted as rounding noise.
pub fn ensure_positive_semi_definite(matrix: &DMatrix<f64>, tolerance: f64) -> MathResult<()> {
    ensure_square(matrix)?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(MathError::invalid_input("matrix contains non-finite entries"));
    }
    if !is_symmetric(matrix, tolerance) {
        return Err(MathError::invalid_input("matrix is not symmetric"));
    }
    let min_eig = min_eigenvalue(matrix)?;
    if min_eig < -tolerance * scale_of(matrix) {
        return Err(MathError::NotPositiveSemiDefinite {
            min_eigenvalue: min_eig,
        });
    }
    Ok(())
}

/// Splits a covariance matrix into marginal standard deviations and a
/// correlation matrix, `Σ = D C D` with `D = diag(σ)`.
///
/// Assets with zero variance get a zero standard deviation, a unit diagonal
/// and zero correlation with every other asset.
///
/// # Example
///
/// ```rust
/// use nalgebra::DMatrix;
/// use varcontrib_math::linear_algebra::covariance_to_correlation;
///
/// let cov = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 1.0]);
/// let (sigma, corr) = covariance_to_correlation(&cov).unwrap();
/// assert_eq!(sigma[0], 2.0);
/// assert_eq!(corr[(0, 1)], 0.5);
/// ```
pub fn covariance_to_correlation(
    covariance: &DMatrix<f64>,
) -> MathResult<(DVector<f64>, DMatrix<f64>)> {
    let n = ensure_square(covariance)?;

    let mut std_devs = DVector::zeros(n);
    for i in 0..n {
        let variance = covariance[(i, i)];
        if variance < 0.0 {
            return Err(MathError::invalid_input(format!(
                "negative variance {variance} on diagonal entry {i}"
            )));
        }
        std_devs[i] = variance.sqrt();
    }

    let mut correlation = DMatrix::identity(n, n);
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let denom = std_devs[i] * std_devs[j];
            correlation[(i, j)] = if denom > 0.0 {
                covariance[(i, j)] / denom
            } else {
                0.0
            };
        }
    }

    Ok((std_devs, correlation))
}

/// Square-root factor `L` of a PSD matrix with `L Lᵗ = A`.
///
/// Uses the Cholesky factor when the matrix is positive definite and falls
/// back to the eigen-decomposition factor `V sqrt(max(λ, 0))` for singular
/// matrices.
pub fn psd_factor(matrix: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let n = ensure_square(matrix)?;
    if n == 0 {
        return Err(MathError::insufficient_data(1, 0));
    }

    if let Some(cholesky) = matrix.clone().cholesky() {
        return Ok(cholesky.l());
    }

    log::warn!("matrix is not positive definite, using eigen-decomposition factor");
    let eigen = matrix.clone().symmetric_eigen();
    let min_eig = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if min_eig < -DEFAULT_TOLERANCE * scale_of(matrix) {
        return Err(MathError::NotPositiveSemiDefinite {
            min_eigenvalue: min_eig,
        });
    }

    let roots = eigen.eigenvalues.map(|lambda| lambda.max(0.0).sqrt());
    let mut factor = eigen.eigenvectors;
    for (j, root) in roots.iter().enumerate() {
        factor.column_mut(j).scale_mut(*root);
    }
    Ok(factor)
}

/// Quadratic form `xᵗ A x`.
pub fn quadratic_form(matrix: &DMatrix<f64>, x: &DVector<f64>) -> MathResult<f64> {
    let n = ensure_square(matrix)?;
    if x.len() != n {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: n,
            rows2: x.len(),
            cols2: 1,
        });
    }
    Ok(x.dot(&(matrix * x)))
}
