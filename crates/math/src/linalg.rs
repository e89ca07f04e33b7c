//! Dense linear algebra for the estimators.
//!
//! Decompositions run on `nalgebra` matrices; everything else in the
//! workspace stays on `ndarray`, so the conversions are confined to this
//! module.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::MathError;

fn to_dmatrix(a: ArrayView2<'_, f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Moore-Penrose pseudo-inverse via singular value decomposition.
///
/// Singular values below `eps * max(nrows, ncols) * largest_singular_value`
/// are treated as zero, so rank-deficient inputs are handled.
///
/// # Errors
/// Returns [`MathError::EmptyData`] for a matrix with no elements.
pub fn pinv(a: &Array2<f64>) -> Result<Array2<f64>, MathError> {
    if a.is_empty() {
        return Err(MathError::EmptyData);
    }

    let svd = to_dmatrix(a.view()).svd(true, true);
    let cutoff = f64::EPSILON * a.nrows().max(a.ncols()) as f64 * svd.singular_values.amax();
    let pseudo = svd.pseudo_inverse(cutoff).map_err(|e| MathError::Singular(e.to_string()))?;

    Ok(from_dmatrix(&pseudo))
}

/// Exact inverse of a square matrix.
///
/// `context` names the matrix being inverted so singularity failures can
/// be attributed (e.g. "weighting matrix").
///
/// # Errors
/// Returns [`MathError::Singular`] when no inverse exists and
/// [`MathError::DimensionMismatch`] for a non-square input.
pub fn inv(a: &Array2<f64>, context: &str) -> Result<Array2<f64>, MathError> {
    if a.nrows() != a.ncols() {
        return Err(MathError::DimensionMismatch { expected: a.nrows(), actual: a.ncols() });
    }
    if a.is_empty() {
        return Err(MathError::EmptyData);
    }

    to_dmatrix(a.view())
        .try_inverse()
        .map(|m| from_dmatrix(&m))
        .ok_or_else(|| MathError::Singular(context.to_string()))
}

/// Kronecker product `A ⊗ B`.
#[must_use]
pub fn kron(a: &Array2<f64>, b: &Array2<f64>) -> Array2<f64> {
    let (br, bc) = b.dim();
    Array2::from_shape_fn((a.nrows() * br, a.ncols() * bc), |(i, j)| {
        a[[i / br, j / bc]] * b[[i % br, j % bc]]
    })
}

/// Outer product of two vectors.
#[must_use]
pub fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j])
}
