#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export the workspace members under short names
pub use hobart_data as data;
pub use hobart_optimize as optimize;
pub use hobart_risk as risk;
pub use hobart_stats as stats;

// Re-export the types most callers start from
pub use hobart_optimize::{OptimizerKind, PortfolioOptimizer};
pub use hobart_risk::{MonteCarloSimulator, VarMethod};
pub use hobart_stats::{PortfolioMetrics, PortfolioWeights, ReturnsMatrix};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
