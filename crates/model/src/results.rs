//! Estimation results shared by the factor-model estimators.

use ndarray::{Array1, Array2};
use polars::prelude::*;
use sintra_math::CovarianceKind;
use sintra_primitives::WaldTestStatistic;

use crate::ModelError;

/// Full inference output of a linear factor-model fit.
///
/// Every estimator produces the same container: parameter estimates with
/// their covariance, risk premia, per-portfolio pricing errors, and the
/// joint chi-square test that all pricing errors are zero.
#[derive(Debug, Clone)]
pub struct FactorModelResults {
    /// Display name of the estimator that produced these results.
    pub name: String,
    /// Parameter estimates, one row per portfolio: the pricing error
    /// followed by the factor loadings.
    pub params: Array2<f64>,
    /// Covariance of the flattened parameter vector; rows and columns
    /// follow `param_names`.
    pub cov: Array2<f64>,
    /// Names labelling the rows and columns of `cov`.
    pub param_names: Vec<String>,
    /// Factor loadings, one row per portfolio.
    pub betas: Array2<f64>,
    /// Estimated risk premia.
    pub risk_premia: Array1<f64>,
    /// Covariance of the estimated risk premia.
    pub risk_premia_cov: Array2<f64>,
    /// Names labelling `risk_premia`.
    pub rp_names: Vec<String>,
    /// Per-portfolio pricing errors.
    pub alphas: Array1<f64>,
    /// Covariance of the pricing errors.
    pub alpha_cov: Array2<f64>,
    /// Joint test that every pricing error is zero.
    pub jstat: WaldTestStatistic,
    /// Pooled coefficient of determination of the time-series pass.
    pub rsquared: f64,
    /// Pooled total sum of squares.
    pub total_ss: f64,
    /// Pooled residual sum of squares.
    pub residual_ss: f64,
    /// Portfolio column names.
    pub portfolio_names: Vec<String>,
    /// Factor column names.
    pub factor_names: Vec<String>,
    /// Covariance estimator family used for inference.
    pub cov_kind: CovarianceKind,
    /// Number of observation periods.
    pub nobs: usize,
}

impl FactorModelResults {
    /// Standard errors of the flattened parameter vector.
    #[must_use]
    pub fn param_se(&self) -> Array1<f64> {
        self.cov.diag().mapv(f64::sqrt)
    }

    /// Standard errors of the risk premia.
    #[must_use]
    pub fn risk_premia_se(&self) -> Array1<f64> {
        self.risk_premia_cov.diag().mapv(f64::sqrt)
    }

    /// T-statistics of the per-portfolio pricing errors.
    #[must_use]
    pub fn alpha_tstats(&self) -> Array1<f64> {
        let se = self.alpha_cov.diag().mapv(f64::sqrt);
        &self.alphas / &se
    }

    /// Per-portfolio parameter table with one row per portfolio and one
    /// column per loading.
    ///
    /// # Errors
    /// Returns [`ModelError::Polars`] if the frame cannot be assembled.
    pub fn params_frame(&self) -> Result<DataFrame, ModelError> {
        let mut columns =
            vec![Column::new("portfolio".into(), self.portfolio_names.clone())];
        columns.push(Column::new("alpha".into(), self.alphas.to_vec()));
        for (j, factor) in self.factor_names.iter().enumerate() {
            columns.push(Column::new(
                format!("beta-{factor}").into(),
                self.betas.column(j).to_vec(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Risk premia table with point estimates and standard errors.
    ///
    /// # Errors
    /// Returns [`ModelError::Polars`] if the frame cannot be assembled.
    pub fn risk_premia_frame(&self) -> Result<DataFrame, ModelError> {
        Ok(DataFrame::new(vec![
            Column::new("factor".into(), self.rp_names.clone()),
            Column::new("premium".into(), self.risk_premia.to_vec()),
            Column::new("std_error".into(), self.risk_premia_se().to_vec()),
        ])?)
    }

    /// Print a concise summary of the fit.
    pub fn print_summary(&self) {
        println!(
            "\n================================================================================"
        );
        println!("FACTOR MODEL ESTIMATION: {}", self.name);
        println!(
            "================================================================================"
        );
        println!(
            "Portfolios: {}   Factors: {}   Observations: {}",
            self.portfolio_names.len(),
            self.factor_names.len(),
            self.nobs
        );
        println!("Covariance: {}", self.cov_kind);
        println!("R-squared: {:.4}", self.rsquared);
        println!(
            "--------------------------------------------------------------------------------"
        );

        println!("\nRISK PREMIA:");
        println!("{:<20} {:>12} {:>12} {:>12}", "Factor", "Premium", "Std Error", "T-stat");
        println!("{:-<20} {:-^12} {:-^12} {:-^12}", "", "", "", "");
        let premia_se = self.risk_premia_se();
        for (i, name) in self.rp_names.iter().enumerate() {
            println!(
                "{:<20} {:>12.4} {:>12.4} {:>12.3}",
                name,
                self.risk_premia[i],
                premia_se[i],
                self.risk_premia[i] / premia_se[i]
            );
        }

        println!("\nPRICING ERRORS:");
        println!("{:<20} {:>12} {:>12}", "Portfolio", "Alpha", "T-stat");
        println!("{:-<20} {:-^12} {:-^12}", "", "", "");
        let tstats = self.alpha_tstats();
        for (i, name) in self.portfolio_names.iter().enumerate() {
            println!("{:<20} {:>12.4} {:>12.3}", name, self.alphas[i], tstats[i]);
        }

        println!(
            "\n--------------------------------------------------------------------------------"
        );
        println!("SUMMARY:");
        println!("  {}", self.jstat);
        println!("  Null: {}", self.jstat.null);
        println!(
            "================================================================================\n"
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    fn sample_results() -> FactorModelResults {
        FactorModelResults {
            name: "TradedFactorModel".to_string(),
            params: array![[0.001, 1.2], [-0.002, 0.8]],
            cov: Array2::eye(5) * 0.04,
            param_names: vec![
                "alpha-p0".to_string(),
                "beta-p0-mkt".to_string(),
                "alpha-p1".to_string(),
                "beta-p1-mkt".to_string(),
                "lambda-mkt".to_string(),
            ],
            betas: array![[1.2], [0.8]],
            risk_premia: array![0.005],
            risk_premia_cov: array![[0.000004]],
            rp_names: vec!["mkt".to_string()],
            alphas: array![0.001, -0.002],
            alpha_cov: array![[0.0001, 0.0], [0.0, 0.0004]],
            jstat: WaldTestStatistic::new(3.2, "All alphas are 0", 2, "J-statistic"),
            rsquared: 0.91,
            total_ss: 10.0,
            residual_ss: 0.9,
            portfolio_names: vec!["p0".to_string(), "p1".to_string()],
            factor_names: vec!["mkt".to_string()],
            cov_kind: CovarianceKind::Robust,
            nobs: 500,
        }
    }

    #[test]
    fn standard_errors_are_sqrt_diagonals() {
        let results = sample_results();

        assert_relative_eq!(results.risk_premia_se()[0], 0.002, epsilon = 1e-12);
        for se in &results.param_se() {
            assert_relative_eq!(*se, 0.2, epsilon = 1e-12);
        }
    }

    #[test]
    fn alpha_tstats_scale_by_standard_error() {
        let results = sample_results();
        let tstats = results.alpha_tstats();

        assert_relative_eq!(tstats[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(tstats[1], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn params_frame_layout() {
        let frame = sample_results().params_frame().unwrap();

        assert_eq!(frame.shape(), (2, 3));
        let names: Vec<String> =
            frame.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["portfolio", "alpha", "beta-mkt"]);
    }

    #[test]
    fn risk_premia_frame_layout() {
        let frame = sample_results().risk_premia_frame().unwrap();

        assert_eq!(frame.shape(), (1, 3));
        let premium = frame.column("premium").unwrap().f64().unwrap();
        assert_relative_eq!(premium.get(0).unwrap(), 0.005, epsilon = 1e-12);
    }
}
