//! Time-series estimator for models with traded factors.

use ndarray::{Array2, Axis, concatenate, s};
use sintra_math::{
    CovarianceConfig, kron, moment_covariance, pinv, select_square, transpose_order,
};
use sintra_primitives::{ReturnPanel, WaldTestStatistic};

use crate::ModelError;
use crate::moments::{augment_with_ones, instrument_residual_products, validate_panels};
use crate::results::FactorModelResults;

/// Configuration for the time-series estimator.
#[derive(Debug, Clone)]
pub struct TradedConfig {
    /// Moment covariance estimator used for inference.
    pub cov: CovarianceConfig,
    /// Apply a degree-of-freedom adjustment to the covariance scaling.
    pub debiased: bool,
}

impl Default for TradedConfig {
    fn default() -> Self {
        Self { cov: CovarianceConfig::robust(), debiased: true }
    }
}

/// Time-series estimator of risk premia, loadings and zero-alpha tests.
///
/// Fits one regression per test portfolio of its excess return on an
/// intercept and the factor returns. Because the factors are themselves
/// excess returns on traded portfolios, their sample means estimate the
/// risk premia directly and every intercept is a pricing error.
#[derive(Debug, Clone)]
pub struct TradedFactorModel {
    portfolios: ReturnPanel,
    factors: ReturnPanel,
}

impl TradedFactorModel {
    /// Create an estimator over aligned portfolio and factor panels.
    ///
    /// # Errors
    /// Returns [`ModelError::DimensionMismatch`] when the panels disagree
    /// on the number of periods and [`ModelError::InsufficientData`] when
    /// there are too few periods to fit the time-series regressions.
    pub fn new(portfolios: ReturnPanel, factors: ReturnPanel) -> Result<Self, ModelError> {
        validate_panels(&portfolios, &factors)?;
        Ok(Self { portfolios, factors })
    }

    /// Test portfolio panel.
    #[must_use]
    pub const fn portfolios(&self) -> &ReturnPanel {
        &self.portfolios
    }

    /// Traded factor panel.
    #[must_use]
    pub const fn factors(&self) -> &ReturnPanel {
        &self.factors
    }

    /// Estimate the model.
    ///
    /// # Errors
    /// Returns [`ModelError::Math`] when a covariance or regressor matrix
    /// cannot be inverted.
    pub fn fit(&self, config: &TradedConfig) -> Result<FactorModelResults, ModelError> {
        let p = self.portfolios.view();
        let f = self.factors.view();
        let (nobs, k) = f.dim();
        let n = p.ncols();

        let fc = augment_with_ones(f);
        let risk_premia = f.sum_axis(Axis(0)) / nobs as f64;
        let fe = &f - &risk_premia;
        let b = pinv(&fc)?.dot(&p);
        let eps = &p - &fc.dot(&b);
        let alphas = b.row(0).to_owned();

        // Sandwich covariance of the stacked loading and premia estimates.
        let nloading = (k + 1) * n;
        let fpf = fc.t().dot(&fc) / nobs as f64;
        let mut xpxi = Array2::eye(nloading + k);
        xpxi.slice_mut(s![..nloading, ..nloading])
            .assign(&kron(&Array2::eye(n), &pinv(&fpf)?));
        let xe = concatenate![
            Axis(1),
            instrument_residual_products(fc.view(), eps.view()),
            fe
        ];
        let xeex = moment_covariance(&xe, &config.cov)?;
        let adjust = usize::from(config.debiased);
        let full_vcv = xpxi.dot(&xeex).dot(&xpxi) / (nobs - adjust * (k + 1)) as f64;
        let risk_premia_cov = moment_covariance(&fe, &config.cov)? / (nobs - adjust) as f64;

        // Regroup the loading block slot-major so the pricing errors lead.
        let loading_vcv = full_vcv.slice(s![..nloading, ..nloading]).to_owned();
        let reordered = select_square(&loading_vcv, &transpose_order(n, k + 1));
        let alpha_cov = reordered.slice(s![..n, ..n]).to_owned();

        let stat = alphas.dot(&pinv(&alpha_cov)?.dot(&alphas));
        let jstat = WaldTestStatistic::new(stat, "All alphas are 0", n, "J-statistic");

        let params = b.t().to_owned();
        let betas = b.slice(s![1.., ..]).t().to_owned();
        let residual_ss = eps.mapv(|e| e * e).sum();
        let p_mean = p.sum_axis(Axis(0)) / nobs as f64;
        let demeaned = &p - &p_mean;
        let total_ss = demeaned.mapv(|e| e * e).sum();

        let mut param_names = Vec::with_capacity(nloading + k);
        for portfolio in &self.portfolios.names {
            param_names.push(format!("alpha-{portfolio}"));
            for factor in &self.factors.names {
                param_names.push(format!("beta-{portfolio}-{factor}"));
            }
        }
        for factor in &self.factors.names {
            param_names.push(format!("lambda-{factor}"));
        }

        Ok(FactorModelResults {
            name: "TradedFactorModel".to_string(),
            params,
            cov: full_vcv,
            param_names,
            betas,
            risk_premia,
            risk_premia_cov,
            rp_names: self.factors.names.clone(),
            alphas,
            alpha_cov,
            jstat,
            rsquared: 1.0 - residual_ss / total_ss,
            total_ss,
            residual_ss,
            portfolio_names: self.portfolios.names.clone(),
            factor_names: self.factors.names.clone(),
            cov_kind: config.cov.kind,
            nobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};
    use sintra_math::HacKernel;

    use super::*;

    struct Simulated {
        portfolios: ReturnPanel,
        factors: ReturnPanel,
        betas: Array2<f64>,
    }

    /// Zero-alpha returns: p = f * betas' + noise.
    fn simulate(
        n_portfolios: usize,
        n_factors: usize,
        nobs: usize,
        noise: f64,
        seed: u64,
    ) -> Simulated {
        let mut rng = StdRng::seed_from_u64(seed);
        let factor_dist = Normal::new(0.005, 0.02).unwrap();
        let beta_dist = Normal::new(1.0, 0.25).unwrap();
        let noise_dist = Normal::new(0.0, noise).unwrap();

        let factors =
            Array2::from_shape_fn((nobs, n_factors), |_| factor_dist.sample(&mut rng));
        let betas =
            Array2::from_shape_fn((n_portfolios, n_factors), |_| beta_dist.sample(&mut rng));
        let portfolios = factors.dot(&betas.t())
            + Array2::from_shape_fn((nobs, n_portfolios), |_| noise_dist.sample(&mut rng));

        Simulated {
            portfolios: ReturnPanel::with_generated_names("p", portfolios),
            factors: ReturnPanel::with_generated_names("f", factors),
            betas,
        }
    }

    fn fit_default(sim: &Simulated) -> FactorModelResults {
        TradedFactorModel::new(sim.portfolios.clone(), sim.factors.clone())
            .unwrap()
            .fit(&TradedConfig::default())
            .unwrap()
    }

    #[test]
    fn recovers_loadings_and_premia() {
        let sim = simulate(4, 2, 1500, 0.001, 7);
        let results = fit_default(&sim);

        for (estimate, truth) in results.betas.iter().zip(sim.betas.iter()) {
            assert_relative_eq!(estimate, truth, epsilon = 0.02);
        }

        // Premia are exactly the factor sample means.
        let means = sim.factors.values.sum_axis(ndarray::Axis(0)) / 1500.0;
        for (premium, mean) in results.risk_premia.iter().zip(means.iter()) {
            assert_relative_eq!(premium, mean, epsilon = 1e-12);
        }
    }

    #[test]
    fn regression_passes_through_means() {
        let sim = simulate(3, 2, 400, 0.01, 11);
        let results = fit_default(&sim);

        // With an intercept, mean portfolio return equals alpha + beta * mean factor.
        let f_mean = sim.factors.values.sum_axis(ndarray::Axis(0)) / 400.0;
        let p_mean = sim.portfolios.values.sum_axis(ndarray::Axis(0)) / 400.0;
        let fitted = results.betas.dot(&f_mean) + &results.alphas;
        for (lhs, rhs) in fitted.iter().zip(p_mean.iter()) {
            assert_relative_eq!(lhs, rhs, epsilon = 1e-10);
        }
    }

    #[test]
    fn jstat_dof_counts_portfolios() {
        let sim = simulate(6, 1, 300, 0.01, 3);
        let results = fit_default(&sim);

        assert_eq!(results.jstat.df, 6);
        let pvalue = results.jstat.pvalue();
        assert!(pvalue > 0.0 && pvalue < 1.0);
    }

    #[test]
    fn parameter_names_and_shapes() {
        let sim = simulate(2, 1, 200, 0.01, 5);
        let results = fit_default(&sim);

        assert_eq!(
            results.param_names,
            vec!["alpha-p.0", "beta-p.0-f.0", "alpha-p.1", "beta-p.1-f.0", "lambda-f.0"]
        );
        assert_eq!(results.params.dim(), (2, 2));
        assert_eq!(results.cov.dim(), (5, 5));
        assert_eq!(results.rp_names, vec!["f.0"]);
        assert_eq!(results.nobs, 200);
    }

    #[test]
    fn portfolio_order_does_not_change_the_test() {
        let sim = simulate(3, 1, 250, 0.01, 13);
        let results = fit_default(&sim);

        let mut swapped_values = sim.portfolios.values.clone();
        let first = sim.portfolios.values.column(0).to_owned();
        let last = sim.portfolios.values.column(2).to_owned();
        swapped_values.column_mut(0).assign(&last);
        swapped_values.column_mut(2).assign(&first);
        let swapped = ReturnPanel::new(
            vec!["p.2".to_string(), "p.1".to_string(), "p.0".to_string()],
            swapped_values,
        );

        let swapped_results = TradedFactorModel::new(swapped, sim.factors.clone())
            .unwrap()
            .fit(&TradedConfig::default())
            .unwrap();

        assert_relative_eq!(results.jstat.stat, swapped_results.jstat.stat, epsilon = 1e-8);
    }

    #[test]
    fn debiasing_scales_the_covariance() {
        let sim = simulate(2, 2, 150, 0.01, 17);
        let model = TradedFactorModel::new(sim.portfolios, sim.factors).unwrap();

        let debiased = model.fit(&TradedConfig::default()).unwrap();
        let plain =
            model.fit(&TradedConfig { cov: CovarianceConfig::robust(), debiased: false }).unwrap();

        // Only the scaling changes: nobs - (k + 1) versus nobs.
        for (d, p) in debiased.cov.iter().zip(plain.cov.iter()) {
            assert_relative_eq!(d * (150.0 - 3.0), p * 150.0, epsilon = 1e-10);
        }
        for (d, p) in debiased.risk_premia_cov.iter().zip(plain.risk_premia_cov.iter()) {
            assert_relative_eq!(d * 149.0, p * 150.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn kernel_inference_smoke() {
        let sim = simulate(3, 1, 220, 0.01, 29);
        let config = TradedConfig {
            cov: CovarianceConfig::kernel(HacKernel::Bartlett, Some(4)),
            debiased: true,
        };
        let results = TradedFactorModel::new(sim.portfolios, sim.factors)
            .unwrap()
            .fit(&config)
            .unwrap();

        assert_eq!(results.cov_kind.to_string(), "kernel");
        assert_eq!(results.cov.dim(), (7, 7));
        for i in 0..7 {
            assert!(results.cov[[i, i]] > 0.0);
        }
    }

    #[test]
    fn residuals_are_orthogonal_to_regressors() {
        let sim = simulate(4, 2, 350, 0.02, 23);
        let results = fit_default(&sim);

        let eps = &sim.portfolios.values
            - &sim.factors.values.dot(&results.betas.t())
            - &results.alphas;
        let fc = augment_with_ones(sim.factors.view());
        let cross = fc.t().dot(&eps);
        for entry in &cross {
            assert_relative_eq!(*entry, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn mismatched_rows_rejected() {
        let portfolios = ReturnPanel::with_generated_names("p", Array2::zeros((10, 2)));
        let factors = ReturnPanel::with_generated_names("f", Array2::zeros((9, 1)));

        let err = TradedFactorModel::new(portfolios, factors).unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
    }

    #[test]
    fn short_sample_inference_stays_well_formed() {
        let sim = simulate(25, 3, 200, 0.01, 41);
        let results = fit_default(&sim);

        assert_eq!(results.jstat.df, 25);
        let pvalue = results.jstat.pvalue();
        assert!(pvalue > 0.0 && pvalue < 1.0);
        for i in 0..25 {
            assert!(results.alpha_cov[[i, i]] > 0.0);
        }
    }

    #[test]
    fn alpha_test_holds_size_under_the_null() {
        let mut accepted = 0;
        for seed in 0..100 {
            let sim = simulate(25, 1, 2000, 0.01, 1000 + seed);
            let results = fit_default(&sim);
            if results.jstat.pvalue() > 0.05 {
                accepted += 1;
            }
        }

        // Asymptotic size is 5%; the draws are fixed, so the count is stable.
        assert!(accepted >= 90, "accepted {accepted} of 100 under the null");
    }
}
