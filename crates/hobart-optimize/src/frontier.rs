//! Efficient frontier construction
//!
//! Sweeps evenly spaced target returns between the minimum-volatility
//! portfolio's return and the best single asset's return, solving a
//! mean-variance optimization at each target. Targets where the solver
//! fails are logged and skipped; only an entirely empty frontier is fatal.

use crate::error::OptimizeError;
use crate::mean_variance::{
    annualize_return, solve_min_volatility, solve_target_return,
};
use hobart_stats::{PortfolioWeights, ReturnsMatrix, SampleEstimates, portfolio_metrics};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Configuration for frontier construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierConfig {
    /// Number of target returns swept between the extremes.
    pub num_points: usize,
    /// Uniform per-asset weight bounds (default `[0, 1]`).
    pub weight_bounds: (f64, f64),
    /// Annual risk-free rate for Sharpe ratios.
    pub risk_free_rate: f64,
    /// Iteration budget per solve.
    pub max_iterations: usize,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            num_points: 20,
            weight_bounds: (0.0, 1.0),
            risk_free_rate: 0.0,
            max_iterations: 1000,
        }
    }
}

/// One portfolio on (or near) the efficient frontier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierPoint {
    /// Annualized expected return.
    pub expected_return: f64,
    /// Annualized volatility.
    pub volatility: f64,
    /// Sharpe ratio at the configured risk-free rate.
    pub sharpe_ratio: f64,
    /// Portfolio weights, in asset order.
    pub weights: Vec<f64>,
}

/// A swept efficient frontier with its named extreme portfolios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficientFrontier {
    /// Asset identifiers fixing the weight ordering.
    pub assets: Vec<String>,
    /// Frontier points, sorted by ascending volatility.
    pub points: Vec<FrontierPoint>,
    /// Minimum-volatility portfolio.
    pub min_volatility: FrontierPoint,
    /// Maximum-return portfolio.
    pub max_return: FrontierPoint,
    /// Max-Sharpe (tangency) portfolio among the swept points.
    pub tangency: FrontierPoint,
}

/// Builder sweeping mean-variance solves across target returns.
#[derive(Debug)]
pub struct EfficientFrontierBuilder {
    estimates: SampleEstimates,
    config: FrontierConfig,
}

impl EfficientFrontierBuilder {
    /// Build a frontier builder over a returns table.
    pub fn new(returns: &ReturnsMatrix, config: FrontierConfig) -> Result<Self, OptimizeError> {
        if config.num_points < 2 {
            return Err(OptimizeError::InvalidConfiguration(
                "num_points must be at least 2".to_string(),
            ));
        }
        crate::solver::validate_bounds(config.weight_bounds, returns.n_assets())?;
        Ok(Self {
            estimates: SampleEstimates::from_returns(returns),
            config,
        })
    }

    fn point_from(&self, weights: Array1<f64>) -> Result<FrontierPoint, OptimizeError> {
        let weights = PortfolioWeights::new(self.estimates.assets().to_vec(), weights)?
            .normalized()?;
        let metrics = portfolio_metrics(
            &weights,
            self.estimates.mean_returns(),
            self.estimates.covariance(),
            self.config.risk_free_rate,
        )?;
        Ok(FrontierPoint {
            expected_return: metrics.expected_return,
            volatility: metrics.volatility,
            sharpe_ratio: metrics.sharpe_ratio,
            weights: weights.values().to_vec(),
        })
    }

    /// Trace the frontier.
    ///
    /// # Errors
    /// Propagates failures of the two extreme solves; sweep failures are
    /// skipped. Returns `NotConverged` if every swept target fails.
    pub fn build(&self) -> Result<EfficientFrontier, OptimizeError> {
        let mean_returns = self.estimates.mean_returns();
        let covariance = self.estimates.covariance();
        let bounds = self.config.weight_bounds;
        let max_iterations = self.config.max_iterations;

        let min_vol_weights = solve_min_volatility(covariance, bounds, max_iterations)?;
        let min_volatility = self.point_from(min_vol_weights)?;

        let max_asset_return = mean_returns
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let high_target = annualize_return(max_asset_return);
        let max_return_weights = solve_target_return(
            mean_returns,
            covariance,
            high_target,
            bounds,
            max_iterations,
        )?;
        let max_return = self.point_from(max_return_weights)?;

        let low_target = min_volatility.expected_return;
        let span = high_target - low_target;
        let steps = (self.config.num_points - 1) as f64;

        let mut points = Vec::with_capacity(self.config.num_points);
        for i in 0..self.config.num_points {
            let target = low_target + span * i as f64 / steps;
            match solve_target_return(mean_returns, covariance, target, bounds, max_iterations)
            {
                Ok(weights) => points.push(self.point_from(weights)?),
                Err(error) => {
                    warn!(target_return = target, %error, "skipping frontier point");
                }
            }
        }

        if points.is_empty() {
            return Err(OptimizeError::NotConverged {
                iterations: max_iterations,
                message: "no frontier target converged".to_string(),
            });
        }

        points.sort_by(|a, b| {
            a.volatility
                .partial_cmp(&b.volatility)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let tangency = points
            .iter()
            .max_by(|a, b| {
                a.sharpe_ratio
                    .partial_cmp(&b.sharpe_ratio)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
            .unwrap_or_else(|| min_volatility.clone());

        Ok(EfficientFrontier {
            assets: self.estimates.assets().to_vec(),
            points,
            min_volatility,
            max_return,
            tangency,
        })
    }
}
