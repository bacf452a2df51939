//! Error types for statistical operations.

use thiserror::Error;

/// Result type for statistical operations.
pub type Result<T> = std::result::Result<T, StatsError>;

/// Errors that can occur during statistical computation.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Not enough observations for the requested estimate
    #[error("Insufficient data: need at least {required} periods, got {actual}")]
    InsufficientData {
        /// Required number of periods
        required: usize,
        /// Actual number of periods
        actual: usize,
    },

    /// Returns table has no assets
    #[error("Returns matrix must contain at least one asset")]
    NoAssets,

    /// Duplicate asset identifier in a returns table
    #[error("Duplicate asset identifier: {0}")]
    DuplicateAsset(String),

    /// Non-finite value in an input series
    #[error("Non-finite value for asset {asset} at period {period}")]
    NonFiniteValue {
        /// Asset identifier
        asset: String,
        /// Row index of the offending value
        period: usize,
    },

    /// Malformed input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch between related inputs
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },

    /// Matrix is singular and cannot be inverted
    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    /// Matrix is not positive definite
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    /// Invalid portfolio weights
    #[error("Invalid portfolio weights: {0}")]
    InvalidWeights(String),
}
