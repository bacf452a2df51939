//! Error types for portfolio optimization.

use hobart_stats::StatsError;
use thiserror::Error;

/// Errors that can occur during portfolio optimization.
///
/// Nothing here is retried internally: every error is raised once at the
/// point of detection and propagated to the caller, so a failed optimization
/// can never be mistaken for a degraded-but-plausible result.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Malformed or out-of-domain input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Inconsistent optimizer configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Mutually exclusive configuration options were both set
    #[error("Conflicting constraints: {0}")]
    ConflictingConstraints(String),

    /// The constrained solver did not converge
    #[error("Optimization failed after {iterations} iterations: {message}")]
    NotConverged {
        /// Iterations consumed before giving up
        iterations: usize,
        /// Solver diagnostic
        message: String,
    },

    /// A matrix operation broke down numerically
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Error from the statistics layer
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
}
