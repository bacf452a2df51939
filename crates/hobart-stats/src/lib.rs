#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod matrix;
pub mod metrics;
pub mod moments;
pub mod returns;

pub use error::{Result, StatsError};
pub use matrix::{cholesky, invert, is_positive_definite, nearest_positive_definite};
pub use metrics::{PERIODS_PER_YEAR, PortfolioMetrics, PortfolioWeights, portfolio_metrics};
pub use moments::{SampleEstimates, excess_kurtosis, percentile, skewness};
pub use returns::ReturnsMatrix;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
