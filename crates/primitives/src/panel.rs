//! Labeled return panel type.

use ndarray::{Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A time-ordered panel of returns with named columns.
///
/// Rows are observation periods, columns are series (test portfolios or
/// candidate factors). Panels are read-only after construction; the
/// estimators never mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnPanel {
    /// Column names, one per series.
    pub names: Vec<String>,
    /// Return observations, one row per period.
    #[serde(skip)]
    pub values: Array2<f64>,
}

impl ReturnPanel {
    /// Create a new panel.
    #[must_use]
    pub fn new(names: Vec<String>, values: Array2<f64>) -> Self {
        debug_assert_eq!(names.len(), values.ncols());
        Self { names, values }
    }

    /// Create a panel with generated column names `{prefix}.0`, `{prefix}.1`, ...
    #[must_use]
    pub fn with_generated_names(prefix: &str, values: Array2<f64>) -> Self {
        let names = (0..values.ncols()).map(|i| format!("{prefix}.{i}")).collect();
        Self { names, values }
    }

    /// Number of observation periods.
    #[must_use]
    pub fn nobs(&self) -> usize {
        self.values.nrows()
    }

    /// Number of series.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.names.len()
    }

    /// Check if the panel has no series or no observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() || self.values.nrows() == 0
    }

    /// View of the underlying matrix.
    #[must_use]
    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Get the series for a specific column name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.names.iter().position(|n| n == name).map(|i| self.values.column(i))
    }
}
