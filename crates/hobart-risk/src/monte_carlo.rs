//! Monte Carlo portfolio simulation
//!
//! Simulates correlated asset return paths by drawing standard normal
//! shocks through the Cholesky factor of the sample covariance, compounding
//! the weighted portfolio return multiplicatively into a distribution of
//! terminal values. If the raw covariance is not positive definite it is
//! repaired with the symmetric eigenvalue-clipping correction first; an
//! ill-conditioned but valid covariance must never abort a simulation.
//!
//! Runs are deterministic for a fixed seed.

use crate::error::RiskError;
use hobart_stats::{
    PortfolioWeights, ReturnsMatrix, SampleEstimates, cholesky, nearest_positive_definite,
    percentile,
};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Floor applied to clipped eigenvalues when repairing the covariance.
const REPAIR_MIN_EIGENVALUE: f64 = 1e-10;

/// Configuration for Monte Carlo simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    /// Number of simulated paths.
    pub num_simulations: usize,
    /// Path length in periods.
    pub time_horizon: usize,
    /// Confidence levels for intervals and VaR, fractions in (0, 1).
    pub confidence_levels: Vec<f64>,
    /// RNG seed; identical seeds reproduce identical results.
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            time_horizon: 252,
            confidence_levels: vec![0.90, 0.95, 0.99],
            seed: 42,
        }
    }
}

/// Two-sided confidence interval over terminal values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Confidence level of the interval.
    pub level: f64,
    /// Lower percentile bound.
    pub lower: f64,
    /// Upper percentile bound.
    pub upper: f64,
}

/// Simulation-based VaR and CVaR at one confidence level, in value units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatedVar {
    /// Confidence level.
    pub level: f64,
    /// Loss versus the initial value at the lower-tail percentile.
    pub var: f64,
    /// Expected loss beyond the VaR threshold.
    pub cvar: f64,
}

/// Distribution of simulated terminal portfolio values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Terminal value of every simulated path.
    pub terminal_values: Vec<f64>,
    /// Two-sided confidence intervals, one per configured level.
    pub confidence_intervals: Vec<ConfidenceInterval>,
    /// Simulation-based VaR/CVaR, one per configured level.
    pub value_at_risk: Vec<SimulatedVar>,
    /// Mean return over the horizon, relative to the initial value.
    pub expected_return: f64,
    /// Standard deviation of the horizon returns.
    pub volatility: f64,
    /// Fraction of paths finishing below the initial value.
    pub probability_of_loss: f64,
}

/// Correlated geometric-Brownian-motion simulator.
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    config: MonteCarloConfig,
}

impl MonteCarloSimulator {
    /// Build a simulator.
    ///
    /// # Errors
    /// Returns an error for a zero simulation count or horizon, or any
    /// confidence level outside (0, 1).
    pub fn new(config: MonteCarloConfig) -> Result<Self, RiskError> {
        if config.num_simulations == 0 {
            return Err(RiskError::InvalidInput(
                "num_simulations must be at least 1".to_string(),
            ));
        }
        if config.time_horizon == 0 {
            return Err(RiskError::InvalidInput(
                "time_horizon must be at least 1 period".to_string(),
            ));
        }
        if config.confidence_levels.is_empty() {
            return Err(RiskError::InvalidInput(
                "at least one confidence level is required".to_string(),
            ));
        }
        for &level in &config.confidence_levels {
            if !level.is_finite() || level <= 0.0 || level >= 1.0 {
                return Err(RiskError::InvalidConfidence(level));
            }
        }
        Ok(Self { config })
    }

    /// The simulator configuration.
    pub const fn config(&self) -> &MonteCarloConfig {
        &self.config
    }

    /// Simulate terminal portfolio values starting from `initial_value`.
    ///
    /// # Arguments
    ///
    /// * `returns` - Historical per-asset returns the moments are drawn from
    /// * `weights` - Portfolio weights over the same assets
    /// * `initial_value` - Starting portfolio value, strictly positive
    pub fn run(
        &self,
        returns: &ReturnsMatrix,
        weights: &PortfolioWeights,
        initial_value: f64,
    ) -> Result<SimulationResult, RiskError> {
        if !initial_value.is_finite() || initial_value <= 0.0 {
            return Err(RiskError::InvalidInput(format!(
                "initial value must be positive, got {initial_value}"
            )));
        }
        if weights.assets() != returns.assets() {
            return Err(RiskError::InvalidInput(
                "weights do not match the assets of the returns matrix".to_string(),
            ));
        }

        let estimates = SampleEstimates::from_returns(returns);
        let mean_returns = estimates.mean_returns();
        let factor = self.cholesky_factor(estimates.covariance())?;
        let w = weights.normalized()?;

        let n_assets = returns.n_assets();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut shocks = Array1::<f64>::zeros(n_assets);
        let mut terminal_values = Vec::with_capacity(self.config.num_simulations);

        for _ in 0..self.config.num_simulations {
            let mut value = initial_value;
            for _ in 0..self.config.time_horizon {
                for z in shocks.iter_mut() {
                    *z = StandardNormal.sample(&mut rng);
                }
                let correlated = factor.dot(&shocks) + mean_returns;
                let portfolio_return = w.values().dot(&correlated);
                value *= 1.0 + portfolio_return;
            }
            terminal_values.push(value);
        }

        self.summarize(terminal_values, initial_value)
    }

    /// Cholesky factor of the covariance, repairing non-positive-definite
    /// input instead of failing.
    fn cholesky_factor(&self, covariance: &Array2<f64>) -> Result<Array2<f64>, RiskError> {
        match cholesky(covariance) {
            Ok(factor) => Ok(factor),
            Err(_) => {
                warn!("covariance is not positive definite; applying nearest-PD correction");
                let repaired = nearest_positive_definite(covariance, REPAIR_MIN_EIGENVALUE)?;
                cholesky(&repaired).map_err(|_| {
                    RiskError::NumericalInstability(
                        "covariance could not be made positive definite".to_string(),
                    )
                })
            }
        }
    }

    fn summarize(
        &self,
        terminal_values: Vec<f64>,
        initial_value: f64,
    ) -> Result<SimulationResult, RiskError> {
        let horizon_returns: Vec<f64> = terminal_values
            .iter()
            .map(|&v| v / initial_value - 1.0)
            .collect();
        let n = horizon_returns.len() as f64;
        let expected_return = horizon_returns.iter().sum::<f64>() / n;
        let volatility = if horizon_returns.len() > 1 {
            (horizon_returns
                .iter()
                .map(|r| (r - expected_return).powi(2))
                .sum::<f64>()
                / (n - 1.0))
                .sqrt()
        } else {
            0.0
        };
        let probability_of_loss = terminal_values
            .iter()
            .filter(|&&v| v < initial_value)
            .count() as f64
            / n;

        let mut confidence_intervals = Vec::with_capacity(self.config.confidence_levels.len());
        let mut value_at_risk = Vec::with_capacity(self.config.confidence_levels.len());
        for &level in &self.config.confidence_levels {
            let lower = percentile(&terminal_values, (1.0 - level) / 2.0 * 100.0)?;
            let upper = percentile(&terminal_values, (1.0 + level) / 2.0 * 100.0)?;
            confidence_intervals.push(ConfidenceInterval {
                level,
                lower,
                upper,
            });

            let threshold = percentile(&terminal_values, (1.0 - level) * 100.0)?;
            let tail: Vec<f64> = terminal_values
                .iter()
                .copied()
                .filter(|&v| v <= threshold)
                .collect();
            let tail_mean = if tail.is_empty() {
                threshold
            } else {
                tail.iter().sum::<f64>() / tail.len() as f64
            };
            value_at_risk.push(SimulatedVar {
                level,
                var: initial_value - threshold,
                cvar: initial_value - tail_mean,
            });
        }

        Ok(SimulationResult {
            terminal_values,
            confidence_intervals,
            value_at_risk,
            expected_return,
            volatility,
            probability_of_loss,
        })
    }
}
