//! Error types for data ingestion.

use hobart_stats::StatsError;
use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading a returns table.
#[derive(Debug, Error)]
pub enum DataError {
    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// A required column is missing
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Malformed table content
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// A cell could not be read as the expected type
    #[error("Invalid value in column {column} at row {row}")]
    InvalidValue {
        /// Column the value sits in
        column: String,
        /// Zero-based row index
        row: usize,
    },

    /// Error validating the resulting returns matrix
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
}
