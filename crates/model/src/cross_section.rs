//! Two-pass cross-sectional estimator for traded or non-traded factors.

use ndarray::{Array2, Axis, concatenate, s};
use sintra_math::{
    CovarianceConfig, inv, kron, outer, pinv, select_square, two_pass_order,
};
use sintra_primitives::{ReturnPanel, WaldTestStatistic};

use crate::ModelError;
use crate::moments::{augment_with_ones, instrument_residual_products, validate_panels};
use crate::results::FactorModelResults;

/// Configuration for the two-pass estimator.
#[derive(Debug, Clone)]
pub struct CrossSectionConfig {
    /// Whether portfolio returns are in excess of the risk-free rate. When
    /// false, the risk-free rate is estimated jointly with the premia.
    pub excess_returns: bool,
    /// Covariance family recorded on the results. The cross-sectional
    /// moment covariance itself is the contemporaneous outer product.
    pub cov: CovarianceConfig,
}

impl Default for CrossSectionConfig {
    fn default() -> Self {
        Self { excess_returns: true, cov: CovarianceConfig::robust() }
    }
}

/// Two-pass estimator of risk premia, loadings and pricing-error tests.
///
/// The first pass runs one time-series regression per portfolio to
/// estimate the loadings; the second regresses mean portfolio returns on
/// those loadings to estimate the premia. Inference stacks both passes
/// into one set of moment conditions so the second-pass covariance
/// reflects the estimated loadings.
#[derive(Debug, Clone)]
pub struct LinearFactorModel {
    portfolios: ReturnPanel,
    factors: ReturnPanel,
}

impl LinearFactorModel {
    /// Create an estimator over aligned portfolio and factor panels.
    ///
    /// # Errors
    /// Returns [`ModelError::DimensionMismatch`] when the panels disagree
    /// on the number of periods or there are not enough portfolios to
    /// identify the premia, and [`ModelError::InsufficientData`] when
    /// there are too few periods for the first pass.
    pub fn new(portfolios: ReturnPanel, factors: ReturnPanel) -> Result<Self, ModelError> {
        validate_panels(&portfolios, &factors)?;
        if portfolios.width() <= factors.width() {
            return Err(ModelError::DimensionMismatch {
                expected: factors.width() + 1,
                actual: portfolios.width(),
                context: "portfolios for cross-sectional identification".to_string(),
            });
        }
        Ok(Self { portfolios, factors })
    }

    /// Test portfolio panel.
    #[must_use]
    pub const fn portfolios(&self) -> &ReturnPanel {
        &self.portfolios
    }

    /// Factor panel.
    #[must_use]
    pub const fn factors(&self) -> &ReturnPanel {
        &self.factors
    }

    /// Estimate the model.
    ///
    /// # Errors
    /// Returns [`ModelError::Math`] when the stacked moment jacobian or
    /// the pricing-error covariance is singular.
    pub fn fit(&self, config: &CrossSectionConfig) -> Result<FactorModelResults, ModelError> {
        let excess = config.excess_returns;
        let nrf = usize::from(!excess);
        let p = self.portfolios.view();
        let f = self.factors.view();
        let (nobs, k) = f.dim();
        let n = p.ncols();

        // First pass: per-portfolio time-series regressions.
        let fc = augment_with_ones(f);
        let b = pinv(&fc)?.dot(&p);
        let eps = &p - &fc.dot(&b);
        let betas = if excess {
            b.slice(s![1.., ..]).t().to_owned()
        } else {
            // A unit loading in the first column carries the risk-free rate.
            let mut augmented = b.t().to_owned();
            augmented.column_mut(0).fill(1.0);
            augmented
        };

        // Second pass: mean returns on the estimated loadings.
        let p_mean = p.sum_axis(Axis(0)) / nobs as f64;
        let lam = pinv(&betas)?.dot(&p_mean);

        let expected = betas.dot(&lam);
        let pricing_errors = &p - &expected;
        let alphas = pricing_errors.sum_axis(Axis(0)) / nobs as f64;

        // Stacked moments: first-pass scores, premia conditions, pricing errors.
        let moments = concatenate![
            Axis(1),
            instrument_residual_products(fc.view(), eps.view()),
            pricing_errors.dot(&betas),
            &pricing_errors - &alphas
        ];
        let s_mat = moments.t().dot(&moments) / nobs as f64;

        let s2 = n * (k + 1);
        let s3 = s2 + k + nrf;
        let nmom = s3 + n;
        let lam_factors = lam.slice(s![nrf..]);

        let fpf = fc.t().dot(&fc) / nobs as f64;
        let mut g = Array2::eye(nmom);
        g.slice_mut(s![..s2, ..s2]).assign(&kron(&Array2::eye(n), &fpf));
        g.slice_mut(s![s2..s3, s2..s3]).assign(&betas.t().dot(&betas));
        for i in 0..n {
            let mut block = outer(betas.row(i), lam_factors);
            for j in 0..k {
                block[[nrf + j, j]] -= alphas[i];
            }
            // The first-pass intercept column of each block stays zero.
            g.slice_mut(s![s2..s3, i * (k + 1) + 1..(i + 1) * (k + 1)]).assign(&block);
        }
        let mut zero_lam = Array2::zeros((1, k + 1));
        zero_lam.slice_mut(s![0, 1..]).assign(&lam_factors);
        g.slice_mut(s![s3.., ..s2]).assign(&kron(&Array2::eye(n), &zero_lam));

        let ginv = inv(&g, "cross-sectional jacobian")?;
        let full_vcv = ginv.dot(&s_mat).dot(&ginv.t()) / nobs as f64;

        let alpha_cov = full_vcv.slice(s![s3.., s3..]).to_owned();
        let stat = alphas.dot(&inv(&alpha_cov, "alpha covariance")?.dot(&alphas));
        let jstat = WaldTestStatistic::new(stat, "All alphas are 0", n - k, "J-statistic");

        let risk_premia_cov = full_vcv.slice(s![s2..s3, s2..s3]).to_owned();
        // Pivot each first-pass intercept slot out in favor of the
        // portfolio's pricing error so the covariance follows param_names.
        let cov = select_square(&full_vcv, &two_pass_order(n, k, nrf));

        let out_betas =
            if excess { betas } else { betas.slice(s![.., 1..]).to_owned() };
        let params =
            concatenate![Axis(1), alphas.view().insert_axis(Axis(1)), out_betas.view()];

        let residual_ss = eps.mapv(|e| e * e).sum();
        let demeaned = &p - &p_mean;
        let total_ss = demeaned.mapv(|e| e * e).sum();

        let mut param_names = Vec::with_capacity(s3);
        for portfolio in &self.portfolios.names {
            param_names.push(format!("alpha-{portfolio}"));
            for factor in &self.factors.names {
                param_names.push(format!("beta-{portfolio}-{factor}"));
            }
        }
        if !excess {
            param_names.push("lambda-risk_free".to_string());
        }
        for factor in &self.factors.names {
            param_names.push(format!("lambda-{factor}"));
        }

        let mut rp_names = self.factors.names.clone();
        if !excess {
            rp_names.insert(0, "risk_free".to_string());
        }

        Ok(FactorModelResults {
            name: "LinearFactorModel".to_string(),
            params,
            cov,
            param_names,
            betas: out_betas,
            risk_premia: lam,
            risk_premia_cov,
            rp_names,
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
    use ndarray::{Array1, Array2};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};
    use sintra_math::HacKernel;

    use super::*;
    use crate::traded::{TradedConfig, TradedFactorModel};

    fn simulate(
        n_portfolios: usize,
        n_factors: usize,
        nobs: usize,
        noise: f64,
        seed: u64,
    ) -> (ReturnPanel, ReturnPanel, Array2<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let factor_dist = Normal::new(0.004, 0.02).unwrap();
        let beta_dist = Normal::new(1.0, 0.3).unwrap();
        let noise_dist = Normal::new(0.0, noise).unwrap();

        let factors =
            Array2::from_shape_fn((nobs, n_factors), |_| factor_dist.sample(&mut rng));
        let betas =
            Array2::from_shape_fn((n_portfolios, n_factors), |_| beta_dist.sample(&mut rng));
        let portfolios = factors.dot(&betas.t())
            + Array2::from_shape_fn((nobs, n_portfolios), |_| noise_dist.sample(&mut rng));

        (
            ReturnPanel::with_generated_names("p", portfolios),
            ReturnPanel::with_generated_names("f", factors),
            betas,
        )
    }

    #[test]
    fn first_pass_matches_time_series_estimator() {
        let (portfolios, factors, _) = simulate(5, 2, 400, 0.01, 21);

        let two_pass = LinearFactorModel::new(portfolios.clone(), factors.clone())
            .unwrap()
            .fit(&CrossSectionConfig::default())
            .unwrap();
        let traded = TradedFactorModel::new(portfolios, factors)
            .unwrap()
            .fit(&TradedConfig::default())
            .unwrap();

        for (a, b) in two_pass.betas.iter().zip(traded.betas.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn premia_recovered_from_clean_returns() {
        let (portfolios, factors, betas) = simulate(6, 1, 500, 1e-8, 31);
        let results = LinearFactorModel::new(portfolios, factors.clone())
            .unwrap()
            .fit(&CrossSectionConfig::default())
            .unwrap();

        // With returns spanned by the factors, lambda is the factor mean.
        let f_mean = factors.values.sum_axis(ndarray::Axis(0))[0] / 500.0;
        assert_relative_eq!(results.risk_premia[0], f_mean, epsilon = 1e-5);
        for alpha in &results.alphas {
            assert_relative_eq!(*alpha, 0.0, epsilon = 1e-5);
        }
        for (estimate, truth) in results.betas.iter().zip(betas.iter()) {
            assert_relative_eq!(estimate, truth, epsilon = 1e-5);
        }
    }

    #[test]
    fn risk_free_rate_jointly_estimated() {
        let mut rng = StdRng::seed_from_u64(41);
        let factor_dist = Normal::new(0.0, 0.02).unwrap();
        let noise_dist = Normal::new(0.0, 1e-8).unwrap();
        let nobs = 400;
        let riskfree = 0.001;
        let premium = 0.006;

        let factors = Array2::from_shape_fn((nobs, 1), |_| factor_dist.sample(&mut rng));
        let f_mean = factors.sum_axis(ndarray::Axis(0))[0] / nobs as f64;
        let betas = Array1::from(vec![0.5, 0.8, 1.0, 1.3, 1.7]);
        let portfolios = Array2::from_shape_fn((nobs, 5), |(t, i)| {
            riskfree
                + betas[i] * premium
                + betas[i] * (factors[[t, 0]] - f_mean)
                + noise_dist.sample(&mut rng)
        });

        let model = LinearFactorModel::new(
            ReturnPanel::with_generated_names("p", portfolios),
            ReturnPanel::with_generated_names("f", factors),
        )
        .unwrap();
        let results = model
            .fit(&CrossSectionConfig { excess_returns: false, cov: CovarianceConfig::robust() })
            .unwrap();

        assert_eq!(results.rp_names, vec!["risk_free", "f.0"]);
        assert_relative_eq!(results.risk_premia[0], riskfree, epsilon = 1e-5);
        assert_relative_eq!(results.risk_premia[1], premium, epsilon = 1e-5);
        assert!(results.param_names.contains(&"lambda-risk_free".to_string()));
        assert_eq!(results.betas.dim(), (5, 1));
        assert_eq!(results.cov.dim(), (12, 12));
    }

    #[test]
    fn pricing_errors_are_orthogonal_to_loadings() {
        let (portfolios, factors, _) = simulate(6, 2, 320, 0.02, 81);
        let results = LinearFactorModel::new(portfolios, factors)
            .unwrap()
            .fit(&CrossSectionConfig::default())
            .unwrap();

        // Second-pass normal equations: loadings' * alphas = 0.
        let cross = results.betas.t().dot(&results.alphas);
        for entry in &cross {
            assert_relative_eq!(*entry, 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn excess_config_omits_risk_free_slots() {
        let (portfolios, factors, _) = simulate(4, 2, 260, 0.01, 91);
        let results = LinearFactorModel::new(portfolios, factors)
            .unwrap()
            .fit(&CrossSectionConfig::default())
            .unwrap();

        assert_eq!(results.rp_names, vec!["f.0", "f.1"]);
        assert!(!results.param_names.iter().any(|name| name.contains("risk_free")));
        assert_eq!(results.risk_premia.len(), 2);
    }

    #[test]
    fn jstat_dof_nets_out_factors() {
        let (portfolios, factors, _) = simulate(7, 2, 350, 0.01, 51);
        let results = LinearFactorModel::new(portfolios, factors)
            .unwrap()
            .fit(&CrossSectionConfig::default())
            .unwrap();

        assert_eq!(results.jstat.df, 5);
    }

    #[test]
    fn pivoted_covariance_follows_param_names() {
        let (portfolios, factors, _) = simulate(4, 1, 300, 0.01, 61);
        let results = LinearFactorModel::new(portfolios, factors)
            .unwrap()
            .fit(&CrossSectionConfig::default())
            .unwrap();

        assert_eq!(results.cov.nrows(), results.param_names.len());
        // Leading slot is the first pricing error, trailing slot the premium.
        assert_relative_eq!(results.cov[[0, 0]], results.alpha_cov[[0, 0]], epsilon = 1e-15);
        let last = results.cov.nrows() - 1;
        assert_relative_eq!(
            results.cov[[last, last]],
            results.risk_premia_cov[[0, 0]],
            epsilon = 1e-15
        );
    }

    #[test]
    fn covariance_tag_does_not_alter_the_estimates() {
        let (portfolios, factors, _) = simulate(5, 1, 280, 0.01, 71);
        let model = LinearFactorModel::new(portfolios, factors).unwrap();

        let robust = model.fit(&CrossSectionConfig::default()).unwrap();
        let kernel = model
            .fit(&CrossSectionConfig {
                excess_returns: true,
                cov: CovarianceConfig::kernel(HacKernel::Parzen, Some(6)),
            })
            .unwrap();

        assert_eq!(robust.cov_kind.to_string(), "robust");
        assert_eq!(kernel.cov_kind.to_string(), "kernel");
        assert_eq!(robust.cov, kernel.cov);
        assert_eq!(robust.jstat.stat, kernel.jstat.stat);
    }

    #[test]
    fn underidentified_panel_rejected() {
        let portfolios = ReturnPanel::with_generated_names("p", Array2::zeros((50, 2)));
        let factors = ReturnPanel::with_generated_names("f", Array2::zeros((50, 2)));

        let err = LinearFactorModel::new(portfolios, factors).unwrap_err();
        assert!(matches!(
            err,
            ModelError::DimensionMismatch { expected: 3, actual: 2, .. }
        ));
    }
}
