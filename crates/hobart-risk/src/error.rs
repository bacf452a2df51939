//! Error types for risk calculations.

use hobart_stats::StatsError;
use thiserror::Error;

/// Errors that can occur during risk calculation.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Confidence level outside the open interval (0, 1)
    #[error("Confidence level must lie in (0, 1), got {0}")]
    InvalidConfidence(f64),

    /// Not enough observations for the requested estimate
    #[error("Insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData {
        /// Required number of observations
        required: usize,
        /// Actual number of observations
        actual: usize,
    },

    /// Malformed or out-of-domain input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A matrix or distribution operation broke down numerically
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Error from the statistics layer
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
}
