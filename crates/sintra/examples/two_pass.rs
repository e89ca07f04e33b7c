//! Example: Two-Pass Estimation with a Non-Traded Factor
//!
//! When a factor is not itself a portfolio return (industrial production,
//! consumption growth, ...), its sample mean no longer estimates the risk
//! premium. This example demonstrates the two-pass answer:
//! 1. Simulate returns priced by a macro factor whose premium differs
//!    from its time-series mean
//! 2. Fit the two-pass estimator, estimating the risk-free rate jointly
//! 3. Compare the estimated premium against the factor mean

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use sintra::model::{CrossSectionConfig, LinearFactorModel};
use sintra::primitives::ReturnPanel;

const N_PORTFOLIOS: usize = 8;
const N_OBS: usize = 600;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Two-Pass Cross-Sectional Estimation ===\n");

    // =========================================================================
    // SIMULATE A NON-TRADED FACTOR ECONOMY
    // =========================================================================

    let riskfree = 0.0015;
    let premium = 0.005;

    let mut rng = StdRng::seed_from_u64(5678);
    let factor_dist = Normal::new(0.002, 0.02)?;
    let noise_dist = Normal::new(0.0, 0.004)?;

    let factor = Array2::from_shape_fn((N_OBS, 1), |_| factor_dist.sample(&mut rng));
    let factor_mean = factor.sum_axis(Axis(0))[0] / N_OBS as f64;

    // Loadings spread out so the cross-section identifies the premium.
    let betas = Array1::linspace(0.5, 1.9, N_PORTFOLIOS);
    let portfolios = Array2::from_shape_fn((N_OBS, N_PORTFOLIOS), |(t, i)| {
        riskfree
            + betas[i] * premium
            + betas[i] * (factor[[t, 0]] - factor_mean)
            + noise_dist.sample(&mut rng)
    });

    println!("True risk-free rate:   {riskfree:.4}");
    println!("True factor premium:   {premium:.4}");
    println!("Factor sample mean:    {factor_mean:.4}");
    println!("The factor mean says nothing about the premium here.\n");

    let portfolios = ReturnPanel::with_generated_names("port", portfolios);
    let factor = ReturnPanel::new(vec!["ip_growth".to_string()], factor);

    // =========================================================================
    // FIT, ESTIMATING THE RISK-FREE RATE JOINTLY
    // =========================================================================

    let model = LinearFactorModel::new(portfolios, factor)?;
    let results = model.fit(&CrossSectionConfig {
        excess_returns: false,
        ..CrossSectionConfig::default()
    })?;

    results.print_summary();

    // =========================================================================
    // COMPARE ESTIMATES AGAINST THE TRUTH
    // =========================================================================

    println!("{:<24} {:>12} {:>12}", "Quantity", "True", "Estimated");
    println!("{:-<24} {:-^12} {:-^12}", "", "", "");
    println!("{:<24} {:>12.4} {:>12.4}", "risk-free rate", riskfree, results.risk_premia[0]);
    println!("{:<24} {:>12.4} {:>12.4}", "factor premium", premium, results.risk_premia[1]);

    println!(
        "\nThe joint test has {} degrees of freedom: {} portfolios less {} factor.",
        results.jstat.df,
        N_PORTFOLIOS,
        1
    );
    println!("p-value: {:.4}", results.jstat.pvalue());

    Ok(())
}
