//! Markowitz mean-variance optimization
//!
//! Objective selection follows the configured targets: minimize volatility
//! at a target return, maximize return at a target volatility, or maximize
//! the Sharpe ratio when no target is set. Targets are annualized, matching
//! `PortfolioMetrics`. Target constraints are enforced through quadratic
//! penalties and the residual is verified after the solve, so a portfolio
//! that misses its target is reported as a failure rather than returned.

use crate::error::OptimizeError;
use crate::optimizer::{OptimizationOutcome, PortfolioOptimizer};
use crate::solver::{self, SolverConfig};
use hobart_stats::{PERIODS_PER_YEAR, PortfolioWeights, ReturnsMatrix, SampleEstimates,
    portfolio_metrics};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Weight on the squared target-constraint residual in the objective.
const TARGET_PENALTY: f64 = 1e5;

/// Acceptable annualized residual on a target constraint after the solve.
const TARGET_TOLERANCE: f64 = 1e-3;

/// Guard added to the volatility denominator of the Sharpe objective.
const SHARPE_EPSILON: f64 = 1e-8;

/// Configuration for mean-variance optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanVarianceConfig {
    /// Uniform per-asset weight bounds (default long-only, `[0, 1]`).
    pub weight_bounds: (f64, f64),
    /// Annualized target return; mutually exclusive with `target_volatility`.
    pub target_return: Option<f64>,
    /// Annualized target volatility; mutually exclusive with `target_return`.
    pub target_volatility: Option<f64>,
    /// Annual risk-free rate for the Sharpe objective and metrics.
    pub risk_free_rate: f64,
    /// Iteration budget for the solver.
    pub max_iterations: usize,
}

impl Default for MeanVarianceConfig {
    fn default() -> Self {
        Self {
            weight_bounds: (0.0, 1.0),
            target_return: None,
            target_volatility: None,
            risk_free_rate: 0.0,
            max_iterations: 1000,
        }
    }
}

/// Markowitz mean-variance optimizer.
#[derive(Debug)]
pub struct MeanVarianceOptimizer {
    estimates: SampleEstimates,
    config: MeanVarianceConfig,
}

impl MeanVarianceOptimizer {
    /// Build an optimizer over a returns table.
    ///
    /// # Errors
    /// Returns `ConflictingConstraints` if both targets are configured, and
    /// a configuration error for infeasible bounds or a non-positive
    /// volatility target.
    pub fn new(
        returns: &ReturnsMatrix,
        config: MeanVarianceConfig,
    ) -> Result<Self, OptimizeError> {
        if config.target_return.is_some() && config.target_volatility.is_some() {
            return Err(OptimizeError::ConflictingConstraints(
                "target_return and target_volatility are mutually exclusive".to_string(),
            ));
        }
        solver::validate_bounds(config.weight_bounds, returns.n_assets())?;
        if let Some(target) = config.target_return {
            if !target.is_finite() {
                return Err(OptimizeError::InvalidConfiguration(
                    "target_return must be finite".to_string(),
                ));
            }
        }
        if let Some(target) = config.target_volatility {
            if !target.is_finite() || target <= 0.0 {
                return Err(OptimizeError::InvalidConfiguration(
                    "target_volatility must be positive".to_string(),
                ));
            }
        }

        Ok(Self {
            estimates: SampleEstimates::from_returns(returns),
            config,
        })
    }

    /// The sample estimates this optimizer operates on.
    pub const fn estimates(&self) -> &SampleEstimates {
        &self.estimates
    }
}

impl PortfolioOptimizer for MeanVarianceOptimizer {
    fn optimize(&self) -> Result<OptimizationOutcome, OptimizeError> {
        let mean_returns = self.estimates.mean_returns();
        let covariance = self.estimates.covariance();
        let bounds = self.config.weight_bounds;
        let max_iterations = self.config.max_iterations;

        let solved = if let Some(target) = self.config.target_return {
            solve_target_return(mean_returns, covariance, target, bounds, max_iterations)?
        } else if let Some(target) = self.config.target_volatility {
            solve_target_volatility(mean_returns, covariance, target, bounds, max_iterations)?
        } else {
            solve_max_sharpe(
                mean_returns,
                covariance,
                self.config.risk_free_rate,
                bounds,
                max_iterations,
            )?
        };

        let weights = PortfolioWeights::new(self.estimates.assets().to_vec(), solved)?
            .normalized()?;
        let metrics = portfolio_metrics(
            &weights,
            mean_returns,
            covariance,
            self.config.risk_free_rate,
        )?;

        Ok(OptimizationOutcome {
            weights,
            metrics,
            risk_contributions: None,
            equilibrium_returns: None,
        })
    }
}

/// Annualize a periodic return by compounding over 252 periods.
pub(crate) fn annualize_return(periodic: f64) -> f64 {
    (1.0 + periodic).powf(PERIODS_PER_YEAR) - 1.0
}

/// Annualize a periodic variance into an annual volatility.
pub(crate) fn annualize_volatility(periodic_variance: f64) -> f64 {
    periodic_variance.max(0.0).sqrt() * PERIODS_PER_YEAR.sqrt()
}

fn annual_return_of(weights: &Array1<f64>, mean_returns: &Array1<f64>) -> f64 {
    annualize_return(weights.dot(mean_returns))
}

fn annual_volatility_of(weights: &Array1<f64>, covariance: &Array2<f64>) -> f64 {
    annualize_volatility(weights.dot(&covariance.dot(weights)))
}

fn equal_start(n: usize) -> Array1<f64> {
    Array1::from_elem(n, 1.0 / n as f64)
}

/// Maximize the Sharpe ratio over the budget set.
pub(crate) fn solve_max_sharpe(
    mean_returns: &Array1<f64>,
    covariance: &Array2<f64>,
    risk_free_rate: f64,
    bounds: (f64, f64),
    max_iterations: usize,
) -> Result<Array1<f64>, OptimizeError> {
    let objective = |w: &Array1<f64>| {
        let ret = annual_return_of(w, mean_returns);
        let vol = annual_volatility_of(w, covariance);
        -(ret - risk_free_rate) / (vol + SHARPE_EPSILON)
    };
    let solution = solver::minimize(
        objective,
        &equal_start(mean_returns.len()),
        bounds.0,
        bounds.1,
        &SolverConfig::with_max_iterations(max_iterations),
    )?;
    Ok(solution.weights)
}

/// Minimize annualized volatility over the budget set.
pub(crate) fn solve_min_volatility(
    covariance: &Array2<f64>,
    bounds: (f64, f64),
    max_iterations: usize,
) -> Result<Array1<f64>, OptimizeError> {
    let objective = |w: &Array1<f64>| annual_volatility_of(w, covariance);
    let solution = solver::minimize(
        objective,
        &equal_start(covariance.nrows()),
        bounds.0,
        bounds.1,
        &SolverConfig::with_max_iterations(max_iterations),
    )?;
    Ok(solution.weights)
}

/// Minimize volatility subject to an annualized target return.
pub(crate) fn solve_target_return(
    mean_returns: &Array1<f64>,
    covariance: &Array2<f64>,
    target: f64,
    bounds: (f64, f64),
    max_iterations: usize,
) -> Result<Array1<f64>, OptimizeError> {
    let objective = |w: &Array1<f64>| {
        let residual = annual_return_of(w, mean_returns) - target;
        annual_volatility_of(w, covariance) + TARGET_PENALTY * residual * residual
    };
    let solution = solver::minimize(
        objective,
        &equal_start(mean_returns.len()),
        bounds.0,
        bounds.1,
        &SolverConfig::with_max_iterations(max_iterations),
    )?;

    let residual = annual_return_of(&solution.weights, mean_returns) - target;
    if residual.abs() > TARGET_TOLERANCE {
        return Err(OptimizeError::NotConverged {
            iterations: solution.iterations,
            message: format!(
                "target-return constraint missed by {residual:.4e} (target {target:.4})"
            ),
        });
    }
    Ok(solution.weights)
}

/// Maximize return subject to an annualized target volatility.
pub(crate) fn solve_target_volatility(
    mean_returns: &Array1<f64>,
    covariance: &Array2<f64>,
    target: f64,
    bounds: (f64, f64),
    max_iterations: usize,
) -> Result<Array1<f64>, OptimizeError> {
    let objective = |w: &Array1<f64>| {
        let residual = annual_volatility_of(w, covariance) - target;
        -annual_return_of(w, mean_returns) + TARGET_PENALTY * residual * residual
    };
    let solution = solver::minimize(
        objective,
        &equal_start(mean_returns.len()),
        bounds.0,
        bounds.1,
        &SolverConfig::with_max_iterations(max_iterations),
    )?;

    let residual = annual_volatility_of(&solution.weights, covariance) - target;
    if residual.abs() > TARGET_TOLERANCE {
        return Err(OptimizeError::NotConverged {
            iterations: solution.iterations,
            message: format!(
                "target-volatility constraint missed by {residual:.4e} (target {target:.4})"
            ),
        });
    }
    Ok(solution.weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn single_asset() -> ReturnsMatrix {
        ReturnsMatrix::new(
            vec!["AAA".to_string()],
            Array1::from_vec(vec![0.01, -0.005, 0.008, 0.002, -0.001, 0.004])
                .into_shape_with_order((6, 1))
                .unwrap(),
        )
        .unwrap()
    }

    fn two_assets() -> ReturnsMatrix {
        // AAA clearly dominates BBB on a Sharpe basis.
        let rows = vec![
            [0.010, 0.001],
            [0.012, -0.002],
            [0.008, 0.002],
            [0.011, -0.001],
            [0.009, 0.001],
            [0.010, 0.000],
            [0.012, -0.003],
            [0.009, 0.002],
        ];
        let mut data = Array2::<f64>::zeros((rows.len(), 2));
        for (i, row) in rows.iter().enumerate() {
            data[[i, 0]] = row[0];
            data[[i, 1]] = row[1];
        }
        ReturnsMatrix::new(vec!["AAA".to_string(), "BBB".to_string()], data).unwrap()
    }

    #[test]
    fn test_single_asset_gets_full_weight() {
        let optimizer =
            MeanVarianceOptimizer::new(&single_asset(), MeanVarianceConfig::default()).unwrap();
        let outcome = optimizer.optimize().unwrap();
        assert_relative_eq!(outcome.weights.values()[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(outcome.weights.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_conflicting_targets_rejected() {
        let config = MeanVarianceConfig {
            target_return: Some(0.10),
            target_volatility: Some(0.15),
            ..Default::default()
        };
        let result = MeanVarianceOptimizer::new(&two_assets(), config);
        assert!(matches!(
            result,
            Err(OptimizeError::ConflictingConstraints(_))
        ));
    }

    #[test]
    fn test_max_sharpe_prefers_dominant_asset() {
        let optimizer =
            MeanVarianceOptimizer::new(&two_assets(), MeanVarianceConfig::default()).unwrap();
        let outcome = optimizer.optimize().unwrap();
        let w = outcome.weights.values();
        assert!(w[0] > w[1], "dominant asset should be overweighted: {w:?}");
        assert_relative_eq!(outcome.weights.sum(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weights_respect_bounds() {
        let config = MeanVarianceConfig {
            weight_bounds: (0.2, 0.8),
            ..Default::default()
        };
        let optimizer = MeanVarianceOptimizer::new(&two_assets(), config).unwrap();
        let outcome = optimizer.optimize().unwrap();
        for (_, w) in outcome.weights.iter() {
            assert!(w >= 0.2 - 1e-9 && w <= 0.8 + 1e-9, "weight {w} out of bounds");
        }
    }

    #[test]
    fn test_target_return_hits_target() {
        let returns = two_assets();
        let estimates = SampleEstimates::from_returns(&returns);
        let low = annualize_return(estimates.mean_returns()[1]);
        let high = annualize_return(estimates.mean_returns()[0]);
        let target = 0.5 * (low + high);

        let config = MeanVarianceConfig {
            target_return: Some(target),
            ..Default::default()
        };
        let optimizer = MeanVarianceOptimizer::new(&returns, config).unwrap();
        let outcome = optimizer.optimize().unwrap();
        assert_relative_eq!(outcome.metrics.expected_return, target, epsilon = 2e-3);
    }

    #[test]
    fn test_infeasible_target_reports_failure() {
        let config = MeanVarianceConfig {
            // Far above the best single asset's annualized return.
            target_return: Some(50.0),
            ..Default::default()
        };
        let optimizer = MeanVarianceOptimizer::new(&two_assets(), config).unwrap();
        assert!(matches!(
            optimizer.optimize(),
            Err(OptimizeError::NotConverged { .. })
        ));
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let config = MeanVarianceConfig {
            weight_bounds: (0.0, 0.3),
            ..Default::default()
        };
        assert!(MeanVarianceOptimizer::new(&two_assets(), config).is_err());
    }
}
