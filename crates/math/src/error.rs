//! Error types for mathematical operations.

/// Errors that can occur during mathematical operations.
#[derive(Debug, thiserror::Error)]
pub enum MathError {
    /// Unrecognized covariance estimator name.
    #[error("unknown covariance estimator: {0} (expected 'robust' or 'kernel')")]
    UnknownCovariance(String),

    /// Unrecognized kernel name.
    #[error("unknown kernel: {0} (expected 'bartlett', 'parzen' or 'quadratic-spectral')")]
    UnknownKernel(String),

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// A required matrix inverse does not exist.
    #[error("singular matrix: {0}")]
    Singular(String),

    /// Empty data.
    #[error("empty data provided")]
    EmptyData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = MathError::UnknownCovariance("hac".to_string());
        assert!(err.to_string().contains("hac"));

        let err = MathError::DimensionMismatch { expected: 10, actual: 5 };
        assert!(err.to_string().contains("10") && err.to_string().contains("5"));

        let err = MathError::Singular("weighting matrix".to_string());
        assert!(err.to_string().contains("weighting matrix"));
    }
}
