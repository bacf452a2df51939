//! Risk parity optimization
//!
//! Allocates so each asset's share of portfolio risk matches a target risk
//! budget. An asset's risk contribution is `w_i * (Sigma w)_i / sigma_p`;
//! the objective minimizes the squared gap between each contribution share
//! and its budget.
//!
//! Weight bounds are enforced through a large penalty term in the objective
//! rather than as hard solver constraints. This keeps the objective smooth
//! for the solver, at the cost of marginal bound violations before the
//! final clip-and-renormalize step.

use crate::error::OptimizeError;
use crate::optimizer::{OptimizationOutcome, PortfolioOptimizer, RiskContribution};
use crate::solver::{self, SolverConfig};
use hobart_stats::{PortfolioWeights, ReturnsMatrix, SampleEstimates, portfolio_metrics};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Penalty weight on bound violations in the objective.
const BOUND_PENALTY: f64 = 1e4;

/// Slack the solver box leaves around the configured bounds.
const BOX_SLACK: f64 = 0.5;

/// Configuration for risk-parity optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParityConfig {
    /// Per-asset target risk budgets, summing to one. `None` means equal
    /// budgets of 1/N.
    pub risk_weights: Option<Vec<f64>>,
    /// Uniform per-asset weight bounds (default `[0, 1]`).
    pub weight_bounds: (f64, f64),
    /// Annual risk-free rate for metrics.
    pub risk_free_rate: f64,
    /// Iteration budget for the solver.
    pub max_iterations: usize,
}

impl Default for RiskParityConfig {
    fn default() -> Self {
        Self {
            risk_weights: None,
            weight_bounds: (0.0, 1.0),
            risk_free_rate: 0.0,
            max_iterations: 1000,
        }
    }
}

/// Risk-parity optimizer.
#[derive(Debug)]
pub struct RiskParityOptimizer {
    estimates: SampleEstimates,
    budgets: Array1<f64>,
    config: RiskParityConfig,
}

impl RiskParityOptimizer {
    /// Build an optimizer over a returns table.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the risk budgets do not match the
    /// asset count, are non-positive, or do not sum to one.
    pub fn new(returns: &ReturnsMatrix, config: RiskParityConfig) -> Result<Self, OptimizeError> {
        let n = returns.n_assets();
        solver::validate_bounds(config.weight_bounds, n)?;

        let budgets = match &config.risk_weights {
            None => Array1::from_elem(n, 1.0 / n as f64),
            Some(weights) => {
                if weights.len() != n {
                    return Err(OptimizeError::InvalidConfiguration(format!(
                        "expected {n} risk weights, got {}",
                        weights.len()
                    )));
                }
                if weights.iter().any(|&b| !b.is_finite() || b <= 0.0) {
                    return Err(OptimizeError::InvalidConfiguration(
                        "risk weights must be strictly positive".to_string(),
                    ));
                }
                let total: f64 = weights.iter().sum();
                if (total - 1.0).abs() > 1e-6 {
                    return Err(OptimizeError::InvalidConfiguration(format!(
                        "risk weights must sum to 1.0, got {total}"
                    )));
                }
                Array1::from_vec(weights.clone())
            }
        };

        Ok(Self {
            estimates: SampleEstimates::from_returns(returns),
            budgets,
            config,
        })
    }

    /// Realized risk contributions for a weight vector.
    fn contributions(&self, weights: &Array1<f64>) -> Vec<RiskContribution> {
        let covariance = self.estimates.covariance();
        let sigma_w = covariance.dot(weights);
        let variance = weights.dot(&sigma_w).max(0.0);
        let volatility = variance.sqrt();

        self.estimates
            .assets()
            .iter()
            .enumerate()
            .map(|(i, asset)| {
                let contribution = if volatility > 0.0 {
                    weights[i] * sigma_w[i] / volatility
                } else {
                    0.0
                };
                let contribution_pct = if variance > 0.0 {
                    weights[i] * sigma_w[i] / variance * 100.0
                } else {
                    0.0
                };
                RiskContribution {
                    asset: asset.clone(),
                    weight: weights[i],
                    contribution,
                    contribution_pct,
                }
            })
            .collect()
    }
}

impl PortfolioOptimizer for RiskParityOptimizer {
    fn optimize(&self) -> Result<OptimizationOutcome, OptimizeError> {
        let covariance = self.estimates.covariance();
        let budgets = &self.budgets;
        let (lower, upper) = self.config.weight_bounds;
        let n = budgets.len();

        let objective = |w: &Array1<f64>| {
            let sigma_w = covariance.dot(w);
            let variance = w.dot(&sigma_w).max(1e-16);

            let mut gap = 0.0;
            for i in 0..n {
                let share = w[i] * sigma_w[i] / variance;
                gap += (share - budgets[i]).powi(2);
            }

            let mut violation = 0.0;
            for &wi in w.iter() {
                violation += (lower - wi).max(0.0).powi(2) + (wi - upper).max(0.0).powi(2);
            }

            gap + BOUND_PENALTY * violation
        };

        let start = Array1::from_elem(n, 1.0 / n as f64);
        let solution = solver::minimize(
            objective,
            &start,
            lower - BOX_SLACK,
            upper + BOX_SLACK,
            &SolverConfig::with_max_iterations(self.config.max_iterations),
        )?;

        // Marginal penalty-phase violations are cleaned up here.
        let weights = PortfolioWeights::new(self.estimates.assets().to_vec(), solution.weights)?
            .clipped(lower, upper)?;
        let metrics = portfolio_metrics(
            &weights,
            self.estimates.mean_returns(),
            covariance,
            self.config.risk_free_rate,
        )?;
        let risk_contributions = self.contributions(weights.values());

        Ok(OptimizationOutcome {
            weights,
            metrics,
            risk_contributions: Some(risk_contributions),
            equilibrium_returns: None,
        })
    }
}
