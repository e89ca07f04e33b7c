//! Chi-square test statistic container.

use std::fmt;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// A Wald test statistic with a chi-square null distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaldTestStatistic {
    /// Value of the test statistic.
    pub stat: f64,
    /// Degrees of freedom of the null distribution.
    pub df: usize,
    /// Description of the null hypothesis.
    pub null: String,
    /// Display name of the test.
    pub name: String,
}

impl WaldTestStatistic {
    /// Create a new test statistic.
    #[must_use]
    pub fn new(stat: f64, null: impl Into<String>, df: usize, name: impl Into<String>) -> Self {
        Self { stat, df, null: null.into(), name: name.into() }
    }

    /// Probability of observing a larger statistic under the null.
    ///
    /// Returns NaN when the null distribution is degenerate (zero degrees
    /// of freedom).
    #[must_use]
    pub fn pvalue(&self) -> f64 {
        ChiSquared::new(self.df as f64)
            .map(|dist| 1.0 - dist.cdf(self.stat))
            .unwrap_or(f64::NAN)
    }

    /// Critical value of the null distribution at significance level `alpha`.
    #[must_use]
    pub fn critical_value(&self, alpha: f64) -> f64 {
        ChiSquared::new(self.df as f64)
            .map(|dist| dist.inverse_cdf(1.0 - alpha))
            .unwrap_or(f64::NAN)
    }
}

impl fmt::Display for WaldTestStatistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.4}, p-value: {:.4}, distributed: chi2({})",
            self.name,
            self.stat,
            self.pvalue(),
            self.df
        )
    }
}
