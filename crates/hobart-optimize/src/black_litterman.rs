//! Black-Litterman optimization
//!
//! Blends market-implied equilibrium returns with subjective investor views
//! into posterior expected returns, then hands the posterior to a
//! max-Sharpe mean-variance optimization over the unchanged covariance.
//!
//! Prior:      Pi = lambda * Sigma * w_mkt
//! Posterior:  mu = [(tau Sigma)^-1 + P' Omega^-1 P]^-1
//!                  [(tau Sigma)^-1 Pi + P' Omega^-1 Q]
//!
//! View uncertainty is `Omega_ii = 1 / confidence_i`. With no views the
//! posterior equals the prior exactly; no matrix algebra runs.

use crate::error::OptimizeError;
use crate::mean_variance::solve_max_sharpe;
use crate::optimizer::{AssetReturn, OptimizationOutcome, PortfolioOptimizer};
use crate::solver;
use hobart_stats::{PortfolioWeights, ReturnsMatrix, SampleEstimates, matrix, portfolio_metrics};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A subjective view on the relative performance of a set of assets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestorView {
    /// Assets the view spans.
    pub assets: Vec<String>,
    /// Relative weights across those assets, summing to one.
    pub relative_weights: Vec<f64>,
    /// Periodic expected return of the weighted combination.
    pub expected_return: f64,
    /// Confidence in `(0, 1]`; higher means tighter uncertainty.
    pub confidence: f64,
}

/// Configuration for Black-Litterman optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlackLittermanConfig {
    /// Per-asset market capitalizations; `None` assumes equal market weights.
    pub market_caps: Option<Vec<f64>>,
    /// Risk-aversion coefficient lambda.
    pub risk_aversion: f64,
    /// Prior-uncertainty scale tau.
    pub tau: f64,
    /// Investor views blended into the posterior.
    pub views: Vec<InvestorView>,
    /// Uniform per-asset weight bounds (default `[0, 1]`).
    pub weight_bounds: (f64, f64),
    /// Annual risk-free rate for the Sharpe stage and metrics.
    pub risk_free_rate: f64,
    /// Iteration budget for the mean-variance stage.
    pub max_iterations: usize,
}

impl Default for BlackLittermanConfig {
    fn default() -> Self {
        Self {
            market_caps: None,
            risk_aversion: 2.5,
            tau: 0.05,
            views: Vec::new(),
            weight_bounds: (0.0, 1.0),
            risk_free_rate: 0.0,
            max_iterations: 1000,
        }
    }
}

/// Black-Litterman optimizer.
#[derive(Debug)]
pub struct BlackLittermanOptimizer {
    estimates: SampleEstimates,
    market_weights: Array1<f64>,
    config: BlackLittermanConfig,
}

impl BlackLittermanOptimizer {
    /// Build an optimizer over a returns table.
    ///
    /// # Errors
    /// Returns `InvalidInput` for non-positive market caps, out-of-range
    /// view confidence, view weights that do not sum to one, or views on
    /// unknown assets.
    pub fn new(
        returns: &ReturnsMatrix,
        config: BlackLittermanConfig,
    ) -> Result<Self, OptimizeError> {
        let n = returns.n_assets();
        solver::validate_bounds(config.weight_bounds, n)?;

        if !config.risk_aversion.is_finite() || config.risk_aversion <= 0.0 {
            return Err(OptimizeError::InvalidConfiguration(
                "risk_aversion must be positive".to_string(),
            ));
        }
        if !config.tau.is_finite() || config.tau <= 0.0 {
            return Err(OptimizeError::InvalidConfiguration(
                "tau must be positive".to_string(),
            ));
        }

        let market_weights = match &config.market_caps {
            None => Array1::from_elem(n, 1.0 / n as f64),
            Some(caps) => {
                if caps.len() != n {
                    return Err(OptimizeError::InvalidInput(format!(
                        "expected {n} market caps, got {}",
                        caps.len()
                    )));
                }
                if caps.iter().any(|&c| !c.is_finite() || c <= 0.0) {
                    return Err(OptimizeError::InvalidInput(
                        "market caps must be strictly positive".to_string(),
                    ));
                }
                let total: f64 = caps.iter().sum();
                Array1::from_iter(caps.iter().map(|&c| c / total))
            }
        };

        for (k, view) in config.views.iter().enumerate() {
            if view.assets.is_empty() {
                return Err(OptimizeError::InvalidInput(format!(
                    "view {k} references no assets"
                )));
            }
            if view.assets.len() != view.relative_weights.len() {
                return Err(OptimizeError::InvalidInput(format!(
                    "view {k} has {} assets but {} relative weights",
                    view.assets.len(),
                    view.relative_weights.len()
                )));
            }
            for asset in &view.assets {
                if !returns.assets().contains(asset) {
                    return Err(OptimizeError::InvalidInput(format!(
                        "view {k} references unknown asset {asset}"
                    )));
                }
            }
            let total: f64 = view.relative_weights.iter().sum();
            if (total - 1.0).abs() > 1e-6 {
                return Err(OptimizeError::InvalidInput(format!(
                    "view {k} relative weights must sum to 1.0, got {total}"
                )));
            }
            if !view.confidence.is_finite()
                || view.confidence <= 0.0
                || view.confidence > 1.0
            {
                return Err(OptimizeError::InvalidInput(format!(
                    "view {k} confidence must lie in (0, 1], got {}",
                    view.confidence
                )));
            }
            if !view.expected_return.is_finite() {
                return Err(OptimizeError::InvalidInput(format!(
                    "view {k} expected return must be finite"
                )));
            }
        }

        Ok(Self {
            estimates: SampleEstimates::from_returns(returns),
            market_weights,
            config,
        })
    }

    /// Market-implied equilibrium returns `Pi = lambda * Sigma * w_mkt`.
    pub fn equilibrium_returns(&self) -> Array1<f64> {
        self.estimates.covariance().dot(&self.market_weights) * self.config.risk_aversion
    }

    /// Posterior expected returns after blending the configured views.
    pub fn posterior_returns(&self) -> Result<Array1<f64>, OptimizeError> {
        let prior = self.equilibrium_returns();
        if self.config.views.is_empty() {
            return Ok(prior);
        }

        let assets = self.estimates.assets();
        let n = assets.len();
        let k = self.config.views.len();

        // Pick matrix P (K x N) and view returns Q (K).
        let mut pick = Array2::<f64>::zeros((k, n));
        let mut view_returns = Array1::<f64>::zeros(k);
        for (row, view) in self.config.views.iter().enumerate() {
            for (asset, &weight) in view.assets.iter().zip(&view.relative_weights) {
                // Membership was validated at construction.
                let col = assets.iter().position(|a| a == asset).unwrap_or(0);
                pick[[row, col]] = weight;
            }
            view_returns[row] = view.expected_return;
        }

        // Omega is diagonal with Omega_kk = 1 / confidence_k, so its inverse
        // is just the confidence vector.
        let omega_inv =
            Array1::from_iter(self.config.views.iter().map(|view| view.confidence));

        let tau_sigma = self.estimates.covariance() * self.config.tau;
        let tau_sigma_inv = matrix::invert(&tau_sigma).map_err(|_| {
            OptimizeError::NumericalInstability(
                "covariance matrix is singular; cannot form the Black-Litterman posterior"
                    .to_string(),
            )
        })?;

        // P' Omega^-1 P and P' Omega^-1 Q.
        let mut pt_omega_inv_p = Array2::<f64>::zeros((n, n));
        let mut pt_omega_inv_q = Array1::<f64>::zeros(n);
        for row in 0..k {
            let scale = omega_inv[row];
            for i in 0..n {
                let pi = pick[[row, i]];
                if pi == 0.0 {
                    continue;
                }
                pt_omega_inv_q[i] += scale * pi * view_returns[row];
                for j in 0..n {
                    pt_omega_inv_p[[i, j]] += scale * pi * pick[[row, j]];
                }
            }
        }

        let lhs = &tau_sigma_inv + &pt_omega_inv_p;
        let rhs = tau_sigma_inv.dot(&prior) + pt_omega_inv_q;
        let lhs_inv = matrix::invert(&lhs).map_err(|_| {
            OptimizeError::NumericalInstability(
                "posterior precision matrix is singular".to_string(),
            )
        })?;

        Ok(lhs_inv.dot(&rhs))
    }
}

impl PortfolioOptimizer for BlackLittermanOptimizer {
    fn optimize(&self) -> Result<OptimizationOutcome, OptimizeError> {
        let prior = self.equilibrium_returns();
        let posterior = self.posterior_returns()?;
        let covariance = self.estimates.covariance();

        let solved = solve_max_sharpe(
            &posterior,
            covariance,
            self.config.risk_free_rate,
            self.config.weight_bounds,
            self.config.max_iterations,
        )?;

        let weights =
            PortfolioWeights::new(self.estimates.assets().to_vec(), solved)?.normalized()?;
        let metrics = portfolio_metrics(
            &weights,
            &posterior,
            covariance,
            self.config.risk_free_rate,
        )?;

        let equilibrium_returns = self
            .estimates
            .assets()
            .iter()
            .zip(prior.iter())
            .map(|(asset, &expected_return)| AssetReturn {
                asset: asset.clone(),
                expected_return,
            })
            .collect();

        Ok(OptimizationOutcome {
            weights,
            metrics,
            risk_contributions: None,
            equilibrium_returns: Some(equilibrium_returns),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn three_assets() -> ReturnsMatrix {
        let rows = vec![
            [0.010, 0.002, -0.004],
            [-0.006, 0.004, 0.008],
            [0.008, -0.002, 0.002],
            [0.004, 0.006, -0.006],
            [-0.002, 0.001, 0.004],
            [0.006, -0.003, 0.001],
            [0.002, 0.005, -0.002],
            [-0.004, 0.002, 0.006],
        ];
        let mut data = Array2::<f64>::zeros((rows.len(), 3));
        for (i, row) in rows.iter().enumerate() {
            for j in 0..3 {
                data[[i, j]] = row[j];
            }
        }
        ReturnsMatrix::new(
            vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
            data,
        )
        .unwrap()
    }

    #[test]
    fn test_no_views_posterior_equals_prior() {
        let optimizer =
            BlackLittermanOptimizer::new(&three_assets(), BlackLittermanConfig::default())
                .unwrap();
        let prior = optimizer.equilibrium_returns();
        let posterior = optimizer.posterior_returns().unwrap();
        for (p, q) in prior.iter().zip(posterior.iter()) {
            assert_relative_eq!(p, q, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_confident_bullish_view_lifts_posterior() {
        let returns = three_assets();
        let config = BlackLittermanConfig {
            views: vec![InvestorView {
                assets: vec!["AAA".to_string()],
                relative_weights: vec![1.0],
                expected_return: 0.01,
                confidence: 0.95,
            }],
            ..Default::default()
        };
        let optimizer = BlackLittermanOptimizer::new(&returns, config).unwrap();
        let prior = optimizer.equilibrium_returns();
        let posterior = optimizer.posterior_returns().unwrap();
        assert!(
            posterior[0] > prior[0],
            "bullish view should lift AAA: prior {} posterior {}",
            prior[0],
            posterior[0]
        );
    }

    #[test]
    fn test_single_view_posterior_matches_closed_form() {
        // One asset, one view: the blend collapses to
        //   mu = (1/(tau s2) + c)^-1 * (lambda/tau + c q)
        // with the view uncertainty entering as 1/confidence.
        let returns = ReturnsMatrix::new(
            vec!["AAA".to_string()],
            Array2::from_shape_vec((4, 1), vec![0.01, -0.01, 0.01, -0.01]).unwrap(),
        )
        .unwrap();
        let (lambda, tau, c, q) = (2.5, 0.05, 0.5, 0.02);
        let config = BlackLittermanConfig {
            risk_aversion: lambda,
            tau,
            views: vec![InvestorView {
                assets: vec!["AAA".to_string()],
                relative_weights: vec![1.0],
                expected_return: q,
                confidence: c,
            }],
            ..Default::default()
        };
        let optimizer = BlackLittermanOptimizer::new(&returns, config).unwrap();

        let s2 = SampleEstimates::from_returns(&returns).covariance()[[0, 0]];
        let expected = (lambda / tau + c * q) / (1.0 / (tau * s2) + c);
        let posterior = optimizer.posterior_returns().unwrap();
        assert_relative_eq!(posterior[0], expected, epsilon = 1e-12);
    }

    #[test]
    fn test_market_caps_drive_prior() {
        let returns = three_assets();
        let config = BlackLittermanConfig {
            market_caps: Some(vec![3.0e9, 1.0e9, 1.0e9]),
            ..Default::default()
        };
        let optimizer = BlackLittermanOptimizer::new(&returns, config).unwrap();
        let prior = optimizer.equilibrium_returns();
        assert_eq!(prior.len(), 3);
        assert!(prior.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_non_positive_market_cap_rejected() {
        let config = BlackLittermanConfig {
            market_caps: Some(vec![1.0e9, 0.0, 1.0e9]),
            ..Default::default()
        };
        assert!(matches!(
            BlackLittermanOptimizer::new(&three_assets(), config),
            Err(OptimizeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        for confidence in [0.0, -0.5, 1.5] {
            let config = BlackLittermanConfig {
                views: vec![InvestorView {
                    assets: vec!["AAA".to_string()],
                    relative_weights: vec![1.0],
                    expected_return: 0.01,
                    confidence,
                }],
                ..Default::default()
            };
            assert!(matches!(
                BlackLittermanOptimizer::new(&three_assets(), config),
                Err(OptimizeError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_view_weights_must_sum_to_one() {
        let config = BlackLittermanConfig {
            views: vec![InvestorView {
                assets: vec!["AAA".to_string(), "BBB".to_string()],
                relative_weights: vec![0.8, 0.8],
                expected_return: 0.01,
                confidence: 0.5,
            }],
            ..Default::default()
        };
        assert!(BlackLittermanOptimizer::new(&three_assets(), config).is_err());
    }

    #[test]
    fn test_unknown_view_asset_rejected() {
        let config = BlackLittermanConfig {
            views: vec![InvestorView {
                assets: vec!["ZZZ".to_string()],
                relative_weights: vec![1.0],
                expected_return: 0.01,
                confidence: 0.5,
            }],
            ..Default::default()
        };
        assert!(BlackLittermanOptimizer::new(&three_assets(), config).is_err());
    }

    #[test]
    fn test_optimize_reports_equilibrium_returns() {
        let optimizer =
            BlackLittermanOptimizer::new(&three_assets(), BlackLittermanConfig::default())
                .unwrap();
        let outcome = optimizer.optimize().unwrap();
        let equilibrium = outcome.equilibrium_returns.unwrap();
        assert_eq!(equilibrium.len(), 3);
        assert_relative_eq!(outcome.weights.sum(), 1.0, epsilon = 1e-9);
    }
}
