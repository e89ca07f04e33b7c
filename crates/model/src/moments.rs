//! Moment-condition construction and input checks shared by the estimators.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, concatenate, s};
use sintra_math::{kron, outer};
use sintra_primitives::ReturnPanel;

use crate::ModelError;

/// Prepend a column of ones to a factor matrix, forming the instrument
/// set `[1, f_t]` used by every time-series moment block.
pub(crate) fn augment_with_ones(factors: ArrayView2<'_, f64>) -> Array2<f64> {
    let mut out = Array2::ones((factors.nrows(), factors.ncols() + 1));
    out.slice_mut(s![.., 1..]).assign(&factors);
    out
}

/// Per-period products of every instrument with every portfolio residual.
///
/// Column `i * width + j` holds `instruments[:, j] * residuals[:, i]`, so
/// each portfolio owns one contiguous block of instrument moments.
pub(crate) fn instrument_residual_products(
    instruments: ArrayView2<'_, f64>,
    residuals: ArrayView2<'_, f64>,
) -> Array2<f64> {
    let width = instruments.ncols();
    Array2::from_shape_fn((instruments.nrows(), residuals.ncols() * width), |(t, m)| {
        instruments[[t, m % width]] * residuals[[t, m / width]]
    })
}

pub(crate) fn validate_panels(
    portfolios: &ReturnPanel,
    factors: &ReturnPanel,
) -> Result<(), ModelError> {
    if portfolios.width() == 0 || factors.width() == 0 {
        return Err(ModelError::InvalidConfig(
            "portfolios and factors must each contain at least one series".to_string(),
        ));
    }
    if portfolios.nobs() != factors.nobs() {
        return Err(ModelError::DimensionMismatch {
            expected: portfolios.nobs(),
            actual: factors.nobs(),
            context: "factor observations".to_string(),
        });
    }
    // The time-series pass regresses on an intercept plus every factor.
    let required = factors.width() + 2;
    if portfolios.nobs() < required {
        return Err(ModelError::InsufficientData { required, actual: portfolios.nobs() });
    }
    Ok(())
}

/// GMM moment matrix at a flat parameter vector.
///
/// The parameter layout is `[betas (N*K, row-major), lambda (K, preceded
/// by a risk-free slot when returns are not excess), mu (K)]`. Each row
/// of the result holds one period's realized moments: the instrument
/// products of the pricing residual for every portfolio, followed by the
/// demeaned factors.
pub(crate) fn gmm_moments(
    params: &[f64],
    portfolios: ArrayView2<'_, f64>,
    factors: ArrayView2<'_, f64>,
    excess_returns: bool,
) -> Array2<f64> {
    let nrf = usize::from(!excess_returns);
    let n = portfolios.ncols();
    let k = factors.ncols();
    let s1 = n * k;
    let s2 = s1 + k + nrf;
    debug_assert_eq!(params.len(), s2 + k);

    let betas = Array2::from_shape_fn((n, k), |(i, j)| params[i * k + j]);
    let lam = ArrayView1::from(&params[s1..s2]);
    let mu = ArrayView1::from(&params[s2..]);

    let lam_factors = lam.slice(s![nrf..]);
    let riskfree = if excess_returns { 0.0 } else { lam[0] };
    let expected: Array1<f64> = (0..n).map(|i| riskfree + betas.row(i).dot(&lam_factors)).collect();

    let fe = &factors - &mu;
    let mut eps = &portfolios - &fe.dot(&betas.t());
    eps -= &expected;

    let instruments = augment_with_ones(factors);
    concatenate![Axis(1), instrument_residual_products(instruments.view(), eps.view()), fe]
}

/// GMM objective `nobs * mean(g)' W mean(g)` at a flat parameter vector.
pub(crate) fn gmm_objective(
    params: &[f64],
    portfolios: ArrayView2<'_, f64>,
    factors: ArrayView2<'_, f64>,
    excess_returns: bool,
    weight: &Array2<f64>,
) -> f64 {
    let g = gmm_moments(params, portfolios, factors, excess_returns);
    let nobs = g.nrows() as f64;
    let gbar = g.sum_axis(Axis(0)) / nobs;
    nobs * gbar.dot(weight).dot(&gbar)
}

/// Analytic derivative of the mean GMM moments with respect to the flat
/// parameter vector, used only for the final covariance sandwich.
///
/// Block structure: `I_N (x) (instruments' (f - mu' + lambda') / nobs)`
/// for the beta columns, per-portfolio outer products of the mean
/// instrument with the (augmented) loading row for the lambda and mu
/// columns, and an identity block for the demeaned-factor rows.
pub(crate) fn gmm_jacobian(
    params: &[f64],
    factors: ArrayView2<'_, f64>,
    n_portfolios: usize,
    excess_returns: bool,
) -> Array2<f64> {
    let nrf = usize::from(!excess_returns);
    let (nobs, k) = factors.dim();
    let n = n_portfolios;
    let s1 = n * k;
    let s2 = s1 + k + nrf;
    let n_params = s2 + k;
    let n_moments = n * (k + 1) + k;
    debug_assert_eq!(params.len(), n_params);

    let betas = Array2::from_shape_fn((n, k), |(i, j)| params[i * k + j]);
    let lam = ArrayView1::from(&params[s1..s2]);
    let mu = ArrayView1::from(&params[s2..]);
    let lam_factors = lam.slice(s![nrf..]);

    let instruments = augment_with_ones(factors);
    let shift = &lam_factors - &mu;
    let shifted = &factors + &shift;
    let fef = instruments.t().dot(&shifted) / nobs as f64;

    let mut jac = Array2::zeros((n_moments, n_params));
    jac.slice_mut(s![..n * (k + 1), ..s1]).assign(&kron(&Array2::eye(n), &fef));

    let favg = instruments.sum_axis(Axis(0)) / nobs as f64;
    for i in 0..n {
        let loadings = if excess_returns {
            betas.row(i).to_owned()
        } else {
            let mut padded = Array1::ones(k + 1);
            padded.slice_mut(s![1..]).assign(&betas.row(i));
            padded
        };
        jac.slice_mut(s![i * (k + 1)..(i + 1) * (k + 1), s1..s2])
            .assign(&outer(favg.view(), loadings.view()));
        jac.slice_mut(s![i * (k + 1)..(i + 1) * (k + 1), s2..])
            .assign(&(-outer(favg.view(), betas.row(i))));
    }
    jac.slice_mut(s![n_moments - k.., n_params - k..]).assign(&Array2::eye(k));

    jac
}
