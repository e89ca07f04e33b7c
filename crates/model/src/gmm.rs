//! Iterated GMM estimator for traded or non-traded factors.

use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{CostFunction, Error, Executor, Gradient, KV, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use argmin_math as _;
use finitediff::FiniteDiff;
use ndarray::{Array1, Array2, ArrayView2, Axis, concatenate, s};
use sintra_math::{CovarianceConfig, intercept_slots, inv, select_square};
use sintra_primitives::{ReturnPanel, WaldTestStatistic};

use crate::ModelError;
use crate::cross_section::{CrossSectionConfig, LinearFactorModel};
use crate::moments::{gmm_jacobian, gmm_moments, gmm_objective, validate_panels};
use crate::results::FactorModelResults;

/// Reweighting stops once the objective moves less than this between steps.
const CONVERGENCE_TOL: f64 = 1e-6;

/// L-BFGS history size.
const LBFGS_MEMORY: usize = 7;

type GmmSolver =
    LBFGS<MoreThuenteLineSearch<Vec<f64>, Vec<f64>, f64>, Vec<f64>, Vec<f64>, f64>;

/// Configuration for the GMM estimator.
#[derive(Debug, Clone)]
pub struct GmmConfig {
    /// Whether portfolio returns are in excess of the risk-free rate. When
    /// false, the risk-free rate is estimated jointly with the premia.
    pub excess_returns: bool,
    /// Number of estimation steps. Two gives the standard efficient GMM
    /// estimator; larger values iterate the weighting matrix until the
    /// objective stabilizes or the step count is exhausted.
    pub steps: usize,
    /// Iteration cap for each objective minimization.
    pub max_iterations: u64,
    /// Iterations between progress log lines; zero disables them.
    pub display_every: u64,
    /// Covariance family recorded on the results. The moment covariance
    /// itself is the contemporaneous outer product.
    pub cov: CovarianceConfig,
}

impl Default for GmmConfig {
    fn default() -> Self {
        Self {
            excess_returns: true,
            steps: 2,
            max_iterations: 1000,
            display_every: 10,
            cov: CovarianceConfig::robust(),
        }
    }
}

/// Quadratic form of the mean moments under a fixed weighting matrix.
struct GmmProblem<'a> {
    portfolios: ArrayView2<'a, f64>,
    factors: ArrayView2<'a, f64>,
    excess_returns: bool,
    weight: &'a Array2<f64>,
}

impl CostFunction for GmmProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> Result<Self::Output, Error> {
        Ok(gmm_objective(
            params,
            self.portfolios,
            self.factors,
            self.excess_returns,
            self.weight,
        ))
    }
}

impl Gradient for GmmProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, params: &Self::Param) -> Result<Self::Gradient, Error> {
        let objective = |x: &Vec<f64>| -> f64 {
            gmm_objective(x, self.portfolios, self.factors, self.excess_returns, self.weight)
        };
        Ok(params.central_diff(&objective))
    }
}

/// Logs the objective as the minimizer walks a step.
struct ProgressObserver {
    step: usize,
}

impl<I> Observe<I> for ProgressObserver
where
    I: State<Float = f64>,
{
    fn observe_iter(&mut self, state: &I, _kv: &KV) -> Result<(), Error> {
        tracing::debug!(
            step = self.step,
            iteration = state.get_iter(),
            objective = state.get_cost(),
            "minimizing moment objective"
        );
        Ok(())
    }
}

/// GMM estimator of risk premia, loadings and model tests.
///
/// Estimates loadings, premia and factor means jointly from the stacked
/// instrument-residual and demeaned-factor moments. The first step
/// minimizes under a weighting matrix computed at two-pass starting
/// values; each further step reweights at the previous estimate and
/// minimizes again until the objective stabilizes. The optimized
/// objective at the final weighting is the J-statistic of the model test.
#[derive(Debug, Clone)]
pub struct GmmFactorModel {
    portfolios: ReturnPanel,
    factors: ReturnPanel,
}

impl GmmFactorModel {
    /// Create an estimator over aligned portfolio and factor panels.
    ///
    /// # Errors
    /// Returns [`ModelError::DimensionMismatch`] when the panels disagree
    /// on the number of periods and [`ModelError::InsufficientData`] when
    /// there are too few periods for the time-series moments.
    pub fn new(portfolios: ReturnPanel, factors: ReturnPanel) -> Result<Self, ModelError> {
        validate_panels(&portfolios, &factors)?;
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
    /// Returns [`ModelError::InvalidConfig`] for a zero step count,
    /// [`ModelError::Math`] when a weighting or information matrix is
    /// singular, and [`ModelError::Optimization`] when a minimization
    /// fails outright.
    pub fn fit(&self, config: &GmmConfig) -> Result<FactorModelResults, ModelError> {
        if config.steps == 0 {
            return Err(ModelError::InvalidConfig("steps must be at least 1".to_string()));
        }
        let excess = config.excess_returns;
        let nrf = usize::from(!excess);
        let p = self.portfolios.view();
        let f = self.factors.view();
        let (nobs, k) = f.dim();
        let n = p.ncols();
        let nobs_f = nobs as f64;

        // Starting values from the two-pass estimator plus factor means.
        let first_pass = LinearFactorModel::new(self.portfolios.clone(), self.factors.clone())?
            .fit(&CrossSectionConfig {
                excess_returns: excess,
                cov: CovarianceConfig::robust(),
            })?;
        let mu = f.sum_axis(Axis(0)) / nobs_f;
        let mut theta: Vec<f64> = Vec::with_capacity(n * k + 2 * k + nrf);
        theta.extend(first_pass.betas.iter());
        theta.extend(first_pass.risk_premia.iter());
        theta.extend(mu.iter());

        let g = gmm_moments(&theta, p, f, excess);
        let mut weight = inv(&(g.t().dot(&g) / nobs_f), "weighting matrix")?;

        let (mut params, mut last_objective) = self.minimize(theta, &weight, config, 1)?;

        for step in 0..config.steps - 1 {
            let g = gmm_moments(&params, p, f, excess);
            weight = inv(&(g.t().dot(&g) / nobs_f), "weighting matrix")?;
            let (next, objective) = self.minimize(params.clone(), &weight, config, step + 2)?;
            params = next;
            if (objective - last_objective).abs() < CONVERGENCE_TOL {
                break;
            }
            last_objective = objective;
        }

        // Inference at the estimated parameters.
        let g = gmm_moments(&params, p, f, excess);
        let s_mat = g.t().dot(&g) / nobs_f;
        let jac = gmm_jacobian(&params, f, n, excess);
        let s_inv = inv(&s_mat, "moment covariance")?;
        let information = jac.t().dot(&s_inv).dot(&jac);
        let full_vcv = inv(&information, "information matrix")? / nobs_f;

        let nk = n * k;
        let risk_premia = Array1::from(params[nk..nk + k + nrf].to_vec());
        let risk_premia_cov =
            full_vcv.slice(s![nk..nk + k + nrf, nk..nk + k + nrf]).to_owned();

        let gbar = g.sum_axis(Axis(0)) / nobs_f;
        let slots = intercept_slots(n, k);
        let alphas: Array1<f64> = slots.iter().map(|&i| gbar[i]).collect();
        // First-order approximation: the intercept-moment slice of S, not
        // the delta-method variance the two-pass estimator reports.
        let alpha_cov = select_square(&s_mat, &slots) / nobs_f;

        // The model test is the optimized objective at the final weighting.
        let stat = gmm_objective(&params, p, f, excess, &weight);
        let jstat = WaldTestStatistic::new(stat, "All alphas are 0", n, "J-statistic");

        let betas = Array2::from_shape_fn((n, k), |(i, j)| params[i * k + j]);
        let mut resids = &p - &f.dot(&betas.t());
        let resid_mean = resids.sum_axis(Axis(0)) / nobs_f;
        resids -= &resid_mean;
        let residual_ss = resids.mapv(|e| e * e).sum();
        let p_mean = p.sum_axis(Axis(0)) / nobs_f;
        let demeaned = &p - &p_mean;
        let total_ss = demeaned.mapv(|e| e * e).sum();

        let mut param_names = Vec::with_capacity(params.len());
        for portfolio in &self.portfolios.names {
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
        for factor in &self.factors.names {
            param_names.push(format!("mu-{factor}"));
        }
        let rp_names = param_names[nk..nk + k + nrf].to_vec();

        let out_params =
            concatenate![Axis(1), alphas.view().insert_axis(Axis(1)), betas.view()];

        Ok(FactorModelResults {
            name: "GmmFactorModel".to_string(),
            params: out_params,
            cov: full_vcv,
            param_names,
            betas,
            risk_premia,
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

    /// Minimize the objective under a fixed weighting matrix, returning
    /// the best parameters and objective value.
    fn minimize(
        &self,
        start: Vec<f64>,
        weight: &Array2<f64>,
        config: &GmmConfig,
        step: usize,
    ) -> Result<(Vec<f64>, f64), ModelError> {
        let problem = GmmProblem {
            portfolios: self.portfolios.view(),
            factors: self.factors.view(),
            excess_returns: config.excess_returns,
            weight,
        };
        let solver: GmmSolver = LBFGS::new(MoreThuenteLineSearch::new(), LBFGS_MEMORY);
        let mut executor = Executor::new(problem, solver)
            .configure(|state| state.param(start.clone()).max_iters(config.max_iterations));
        if config.display_every > 0 {
            executor = executor
                .add_observer(ProgressObserver { step }, ObserverMode::Every(config.display_every));
        }

        let mut state = executor
            .run()
            .map_err(|e| ModelError::Optimization(e.to_string()))?
            .state()
            .clone();
        if state.get_iter() >= config.max_iterations {
            tracing::warn!(
                step,
                iterations = state.get_iter(),
                "moment objective minimization hit the iteration cap"
            );
        }

        let objective = state.get_best_cost();
        let params = state.take_best_param().unwrap_or(start);
        Ok((params, objective))
    }
}
