//! Optimizer interface and dispatch
//!
//! Every allocation model produces the same `OptimizationOutcome`; model
//! selection is a closed enum rather than a string key, so an unsupported
//! method is unrepresentable at the API boundary.

use crate::black_litterman::{BlackLittermanConfig, BlackLittermanOptimizer};
use crate::error::OptimizeError;
use crate::hrp::{HierarchicalRiskParityOptimizer, HrpConfig};
use crate::mean_variance::{MeanVarianceConfig, MeanVarianceOptimizer};
use crate::risk_parity::{RiskParityConfig, RiskParityOptimizer};
use hobart_stats::{PortfolioMetrics, PortfolioWeights, ReturnsMatrix};
use serde::{Deserialize, Serialize};

/// Common interface implemented by every allocation model.
pub trait PortfolioOptimizer {
    /// Run the optimization and return weights plus portfolio metrics.
    fn optimize(&self) -> Result<OptimizationOutcome, OptimizeError>;
}

/// Result of a portfolio optimization.
#[derive(Debug, Clone)]
pub struct OptimizationOutcome {
    /// Optimal weights, summing to one.
    pub weights: PortfolioWeights,
    /// Annualized metrics of the optimal portfolio.
    pub metrics: PortfolioMetrics,
    /// Realized per-asset risk contributions (risk parity only).
    pub risk_contributions: Option<Vec<RiskContribution>>,
    /// Market-implied equilibrium returns (Black-Litterman only).
    pub equilibrium_returns: Option<Vec<AssetReturn>>,
}

/// Expected return attached to a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetReturn {
    /// Asset identifier.
    pub asset: String,
    /// Periodic expected return.
    pub expected_return: f64,
}

/// Realized risk contribution of a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskContribution {
    /// Asset identifier.
    pub asset: String,
    /// Final portfolio weight.
    pub weight: f64,
    /// Absolute contribution to periodic portfolio volatility.
    pub contribution: f64,
    /// Share of total portfolio risk, in percent.
    pub contribution_pct: f64,
}

/// Closed set of allocation models, each carrying its configuration.
#[derive(Debug, Clone)]
pub enum OptimizerKind {
    /// Markowitz mean-variance optimization.
    MeanVariance(MeanVarianceConfig),
    /// Risk-budgeted risk parity.
    RiskParity(RiskParityConfig),
    /// Black-Litterman posterior blending feeding mean-variance.
    BlackLitterman(BlackLittermanConfig),
    /// Hierarchical risk parity.
    HierarchicalRiskParity(HrpConfig),
}

impl OptimizerKind {
    /// Construct the configured optimizer over `returns` and run it.
    pub fn optimize(
        &self,
        returns: &ReturnsMatrix,
    ) -> Result<OptimizationOutcome, OptimizeError> {
        match self {
            Self::MeanVariance(config) => {
                MeanVarianceOptimizer::new(returns, config.clone())?.optimize()
            }
            Self::RiskParity(config) => {
                RiskParityOptimizer::new(returns, config.clone())?.optimize()
            }
            Self::BlackLitterman(config) => {
                BlackLittermanOptimizer::new(returns, config.clone())?.optimize()
            }
            Self::HierarchicalRiskParity(config) => {
                HierarchicalRiskParityOptimizer::new(returns, config.clone())?.optimize()
            }
        }
    }

    /// Stable name of the model, for logging and serialized reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MeanVariance(_) => "mean_variance",
            Self::RiskParity(_) => "risk_parity",
            Self::BlackLitterman(_) => "black_litterman",
            Self::HierarchicalRiskParity(_) => "hierarchical_risk_parity",
        }
    }
}
