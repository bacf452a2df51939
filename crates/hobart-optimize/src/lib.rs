#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod black_litterman;
pub mod error;
pub mod frontier;
pub mod hrp;
pub mod mean_variance;
pub mod optimizer;
pub mod risk_parity;
mod solver;

pub use black_litterman::{BlackLittermanConfig, BlackLittermanOptimizer, InvestorView};
pub use error::OptimizeError;
pub use frontier::{EfficientFrontier, EfficientFrontierBuilder, FrontierConfig, FrontierPoint};
pub use hrp::{HierarchicalRiskParityOptimizer, HrpConfig, LinkageMethod};
pub use mean_variance::{MeanVarianceConfig, MeanVarianceOptimizer};
pub use optimizer::{
    AssetReturn, OptimizationOutcome, OptimizerKind, PortfolioOptimizer, RiskContribution,
};
pub use risk_parity::{RiskParityConfig, RiskParityOptimizer};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
