//! Error types for the divergence engine.

use thiserror::Error;

/// Main error type for divergence engine operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DivergenceError {
    /// Distribution dimensions don't match
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A distribution or sample had no elements
    #[error("Empty input: {0}")]
    EmptyInput(&'static str),

    /// Normalization of a vector whose sum is exactly zero
    #[error("Cannot normalize: vector sums to zero")]
    ZeroSum,

    /// Invalid smoothing constant, log base, or similar parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical error (overflow, underflow, NaN)
    #[error("Numerical error: {0}")]
    NumericalError(String),
}

/// Result type alias for divergence operations.
pub type Result<T> = std::result::Result<T, DivergenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DivergenceError::DimensionMismatch {
            expected: 2,
            got: 3,
        };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 2, got 3");
    }
}
