//! Robust and kernel (HAC) covariance estimation for moment matrices.
//!
//! The estimators hand a moment or regressor matrix to
//! [`moment_covariance`] together with a [`CovarianceConfig`] and receive
//! the scaled outer product back. Any small-sample `nobs - debiased * dof`
//! adjustment is applied by the caller, never here.

use std::f64::consts::PI;
use std::str::FromStr;

use derive_more::Display;
use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};

use crate::MathError;

/// Covariance estimator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum CovarianceKind {
    /// Heteroskedasticity-robust contemporaneous outer product.
    #[display("robust")]
    Robust,
    /// Kernel-weighted heteroskedasticity and autocorrelation consistent
    /// estimator.
    #[display("kernel")]
    Kernel,
}

impl FromStr for CovarianceKind {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "robust" => Ok(Self::Robust),
            "kernel" => Ok(Self::Kernel),
            _ => Err(MathError::UnknownCovariance(s.to_string())),
        }
    }
}

/// HAC kernel weight families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum HacKernel {
    /// Bartlett (Newey-West) triangular kernel.
    #[default]
    #[display("bartlett")]
    Bartlett,
    /// Parzen (Gallant) kernel.
    #[display("parzen")]
    Parzen,
    /// Andrews quadratic-spectral kernel.
    #[display("quadratic-spectral")]
    QuadraticSpectral,
}

impl FromStr for HacKernel {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bartlett" | "newey-west" => Ok(Self::Bartlett),
            "parzen" | "gallant" => Ok(Self::Parzen),
            "quadratic-spectral" | "qs" | "andrews" => Ok(Self::QuadraticSpectral),
            _ => Err(MathError::UnknownKernel(s.to_string())),
        }
    }
}

/// Configuration for moment covariance estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovarianceConfig {
    /// Estimator family.
    pub kind: CovarianceKind,
    /// Kernel family, used when `kind` is [`CovarianceKind::Kernel`].
    pub kernel: HacKernel,
    /// Kernel bandwidth; `None` selects the automatic Newey-West rule.
    pub bandwidth: Option<usize>,
}

impl Default for CovarianceConfig {
    fn default() -> Self {
        Self::robust()
    }
}

impl CovarianceConfig {
    /// Heteroskedasticity-robust configuration.
    #[must_use]
    pub const fn robust() -> Self {
        Self { kind: CovarianceKind::Robust, kernel: HacKernel::Bartlett, bandwidth: None }
    }

    /// Kernel configuration with an optional fixed bandwidth.
    #[must_use]
    pub const fn kernel(kernel: HacKernel, bandwidth: Option<usize>) -> Self {
        Self { kind: CovarianceKind::Kernel, kernel, bandwidth }
    }

    /// Parse a configuration from its string surface.
    ///
    /// `kind` must be `robust` or `kernel`; `kernel_name` accepts the
    /// canonical family names plus the common literature aliases
    /// (`newey-west`, `gallant`, `qs`, `andrews`) and defaults to Bartlett.
    ///
    /// # Errors
    /// Returns [`MathError::UnknownCovariance`] or
    /// [`MathError::UnknownKernel`] for unrecognized names.
    pub fn from_parts(
        kind: &str,
        kernel_name: Option<&str>,
        bandwidth: Option<usize>,
    ) -> Result<Self, MathError> {
        let kind = kind.parse()?;
        let kernel = kernel_name.map_or(Ok(HacKernel::Bartlett), str::parse)?;
        Ok(Self { kind, kernel, bandwidth })
    }

    /// Bandwidth that will be applied to an `nobs`-row moment matrix,
    /// after the automatic rule and the `nobs - 1` lag clamp.
    #[must_use]
    pub fn effective_bandwidth(&self, nobs: usize) -> usize {
        let bandwidth = self.bandwidth.unwrap_or_else(|| newey_west_bandwidth(nobs));
        bandwidth.min(nobs.saturating_sub(1))
    }
}

/// Automatic bandwidth rule `ceil(4 * (nobs / 100)^(2/9))`.
#[must_use]
pub fn newey_west_bandwidth(nobs: usize) -> usize {
    (4.0 * (nobs as f64 / 100.0).powf(2.0 / 9.0)).ceil() as usize
}

/// Kernel weights for lags `0..=max_lag` at the given bandwidth.
///
/// Bartlett and Parzen weights vanish beyond the bandwidth, so their
/// vectors stop there; the quadratic-spectral kernel has unbounded support
/// and is evaluated at every lag up to `max_lag`. A zero bandwidth
/// collapses every family to the contemporaneous term.
#[must_use]
pub fn kernel_weights(kernel: HacKernel, bandwidth: usize, max_lag: usize) -> Vec<f64> {
    if bandwidth == 0 {
        return vec![1.0];
    }

    match kernel {
        HacKernel::Bartlett => {
            let taper = bandwidth as f64 + 1.0;
            (0..=bandwidth.min(max_lag)).map(|lag| 1.0 - lag as f64 / taper).collect()
        }
        HacKernel::Parzen => {
            let taper = bandwidth as f64 + 1.0;
            (0..=bandwidth.min(max_lag))
                .map(|lag| {
                    let z = lag as f64 / taper;
                    if z <= 0.5 {
                        1.0 - 6.0 * z.powi(2) + 6.0 * z.powi(3)
                    } else {
                        2.0 * (1.0 - z).powi(3)
                    }
                })
                .collect()
        }
        HacKernel::QuadraticSpectral => {
            let mut weights = Vec::with_capacity(max_lag + 1);
            weights.push(1.0);
            for lag in 1..=max_lag {
                let q = 6.0 * PI * (lag as f64 / bandwidth as f64) / 5.0;
                weights.push(3.0 * (q.sin() / q - q.cos()) / q.powi(2));
            }
            weights
        }
    }
}

/// Contemporaneous (heteroskedasticity-robust) covariance `XᵗX / nobs`.
///
/// # Errors
/// Returns [`MathError::EmptyData`] for a matrix with no rows.
pub fn robust_covariance(x: &Array2<f64>) -> Result<Array2<f64>, MathError> {
    if x.nrows() == 0 {
        return Err(MathError::EmptyData);
    }

    Ok(x.t().dot(x) / x.nrows() as f64)
}

/// Kernel-weighted HAC covariance of a moment matrix.
///
/// Accumulates `Γ₀ + Σ_j w_j (Γ_j + Γ_jᵗ)` over the supplied lag weights
/// (`Γ_j` the lag-`j` cross product) and scales once by the row count.
///
/// # Errors
/// Returns [`MathError::EmptyData`] for a matrix with no rows and
/// [`MathError::DimensionMismatch`] when more weights than rows are given.
pub fn kernel_covariance(x: &Array2<f64>, weights: &[f64]) -> Result<Array2<f64>, MathError> {
    let nobs = x.nrows();
    if nobs == 0 {
        return Err(MathError::EmptyData);
    }
    if weights.len() > nobs {
        return Err(MathError::DimensionMismatch { expected: nobs, actual: weights.len() });
    }

    let mut cov = x.t().dot(x);
    for (lag, &weight) in weights.iter().enumerate().skip(1) {
        let lead = x.slice(s![lag.., ..]);
        let trail = x.slice(s![..nobs - lag, ..]);
        let gamma = lead.t().dot(&trail);
        cov.scaled_add(weight, &gamma);
        cov.scaled_add(weight, &gamma.t());
    }

    Ok(cov / nobs as f64)
}

/// Covariance of a moment matrix under the given configuration.
///
/// # Errors
/// Propagates the underlying estimator errors.
pub fn moment_covariance(x: &Array2<f64>, config: &CovarianceConfig) -> Result<Array2<f64>, MathError> {
    match config.kind {
        CovarianceKind::Robust => robust_covariance(x),
        CovarianceKind::Kernel => {
            let bandwidth = config.effective_bandwidth(x.nrows());
            let weights =
                kernel_weights(config.kernel, bandwidth, x.nrows().saturating_sub(1));
            kernel_covariance(x, &weights)
        }
    }
}
