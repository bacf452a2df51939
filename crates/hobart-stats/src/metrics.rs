//! Portfolio weights and annualized portfolio metrics
//!
//! Metrics are derived strictly from a weights vector plus sample moments:
//! periodic portfolio return `w'mu`, periodic volatility `sqrt(w' Sigma w)`,
//! annualized assuming 252 periods per year.

use crate::error::{Result, StatsError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Trading periods per year used for annualization.
pub const PERIODS_PER_YEAR: f64 = 252.0;

/// Guard added to the volatility denominator of the Sharpe ratio.
const SHARPE_EPSILON: f64 = 1e-8;

/// Mapping from asset identifiers to portfolio weights.
///
/// The identifier list fixes the ordering; values are kept as a dense vector
/// so weights can flow straight into matrix arithmetic.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioWeights {
    assets: Vec<String>,
    values: Array1<f64>,
}

impl PortfolioWeights {
    /// Build a weights vector over the given assets.
    ///
    /// # Errors
    /// Returns an error if the lengths differ or any weight is non-finite.
    pub fn new(assets: Vec<String>, values: Array1<f64>) -> Result<Self> {
        if assets.len() != values.len() {
            return Err(StatsError::DimensionMismatch {
                expected: assets.len(),
                actual: values.len(),
            });
        }
        if values.iter().any(|w| !w.is_finite()) {
            return Err(StatsError::InvalidWeights(
                "weights must be finite".to_string(),
            ));
        }
        Ok(Self { assets, values })
    }

    /// Equal weights, 1/N per asset.
    pub fn equal(assets: Vec<String>) -> Result<Self> {
        if assets.is_empty() {
            return Err(StatsError::NoAssets);
        }
        let n = assets.len();
        let values = Array1::from_elem(n, 1.0 / n as f64);
        Self::new(assets, values)
    }

    /// Asset identifiers, in vector order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// The raw weight vector.
    pub const fn values(&self) -> &Array1<f64> {
        &self.values
    }

    /// Weight for a single asset, if present.
    pub fn get(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.values[i])
    }

    /// Sum of all weights.
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// A copy rescaled so the weights sum to one.
    ///
    /// # Errors
    /// Returns an error if the weights sum to (numerically) zero.
    pub fn normalized(&self) -> Result<Self> {
        let total = self.sum();
        if total.abs() < 1e-12 {
            return Err(StatsError::InvalidWeights(
                "weights sum to zero and cannot be normalized".to_string(),
            ));
        }
        Ok(Self {
            assets: self.assets.clone(),
            values: &self.values / total,
        })
    }

    /// A copy with every weight clamped into `[lower, upper]`, then
    /// renormalized to sum to one.
    pub fn clipped(&self, lower: f64, upper: f64) -> Result<Self> {
        let values = self.values.mapv(|w| w.clamp(lower, upper));
        Self {
            assets: self.assets.clone(),
            values,
        }
        .normalized()
    }

    /// Iterate over `(asset, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Annualized portfolio metrics derived from weights and sample moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    /// Annualized expected return, compounded from the periodic mean.
    pub expected_return: f64,
    /// Annualized volatility, `sqrt(w' Sigma w) * sqrt(252)`.
    pub volatility: f64,
    /// Sharpe ratio of annualized excess return over annualized volatility.
    pub sharpe_ratio: f64,
    /// Annual risk-free rate used for the Sharpe ratio.
    pub risk_free_rate: f64,
}

/// Compute annualized metrics for a weighted portfolio.
///
/// The weights are renormalized to sum to one before use.
///
/// # Arguments
///
/// * `weights` - Portfolio weights over the assets of the sample moments
/// * `mean_returns` - Periodic (not annualized) per-asset mean returns
/// * `covariance` - Periodic sample covariance, same asset ordering
/// * `risk_free_rate` - Annual risk-free rate for the Sharpe ratio
pub fn portfolio_metrics(
    weights: &PortfolioWeights,
    mean_returns: &Array1<f64>,
    covariance: &Array2<f64>,
    risk_free_rate: f64,
) -> Result<PortfolioMetrics> {
    let n = weights.values().len();
    if mean_returns.len() != n {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: mean_returns.len(),
        });
    }
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(StatsError::DimensionMismatch {
            expected: n,
            actual: covariance.nrows(),
        });
    }

    let w = weights.normalized()?;
    let periodic_return = w.values().dot(mean_returns);
    let periodic_variance = w.values().dot(&covariance.dot(w.values())).max(0.0);

    let expected_return = (1.0 + periodic_return).powf(PERIODS_PER_YEAR) - 1.0;
    let volatility = periodic_variance.sqrt() * PERIODS_PER_YEAR.sqrt();
    let sharpe_ratio = (expected_return - risk_free_rate) / (volatility + SHARPE_EPSILON);

    Ok(PortfolioMetrics {
        expected_return,
        volatility,
        sharpe_ratio,
        risk_free_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn assets(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("A{i}")).collect()
    }

    #[test]
    fn test_equal_weights() {
        let w = PortfolioWeights::equal(assets(4)).unwrap();
        for (_, value) in w.iter() {
            assert_relative_eq!(value, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_normalized() {
        let w = PortfolioWeights::new(assets(2), array![2.0, 3.0]).unwrap();
        let n = w.normalized().unwrap();
        assert_relative_eq!(n.values()[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(n.values()[1], 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_normalize_zero_sum_fails() {
        let w = PortfolioWeights::new(assets(2), array![0.5, -0.5]).unwrap();
        assert!(w.normalized().is_err());
    }

    #[test]
    fn test_clipped_renormalizes() {
        let w = PortfolioWeights::new(assets(2), array![1.4, -0.4]).unwrap();
        let clipped = w.clipped(0.0, 1.0).unwrap();
        assert_relative_eq!(clipped.values()[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(clipped.values()[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_lookup() {
        let w = PortfolioWeights::new(assets(2), array![0.7, 0.3]).unwrap();
        assert_relative_eq!(w.get("A1").unwrap(), 0.3, epsilon = 1e-12);
        assert!(w.get("ZZZ").is_none());
    }

    #[test]
    fn test_metrics_single_asset() {
        let w = PortfolioWeights::new(assets(1), array![1.0]).unwrap();
        let mean = array![0.001];
        let cov = array![[0.0004]];
        let metrics = portfolio_metrics(&w, &mean, &cov, 0.0).unwrap();

        assert_relative_eq!(
            metrics.expected_return,
            1.001_f64.powf(252.0) - 1.0,
            epsilon = 1e-10
        );
        assert_relative_eq!(metrics.volatility, 0.02 * 252.0_f64.sqrt(), epsilon = 1e-10);
        assert!(metrics.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_metrics_renormalizes_weights() {
        let mean = array![0.001, 0.001];
        let cov = array![[0.0004, 0.0], [0.0, 0.0004]];
        let half = PortfolioWeights::new(assets(2), array![0.5, 0.5]).unwrap();
        let doubled = PortfolioWeights::new(assets(2), array![1.0, 1.0]).unwrap();

        let a = portfolio_metrics(&half, &mean, &cov, 0.0).unwrap();
        let b = portfolio_metrics(&doubled, &mean, &cov, 0.0).unwrap();
        assert_relative_eq!(a.expected_return, b.expected_return, epsilon = 1e-12);
        assert_relative_eq!(a.volatility, b.volatility, epsilon = 1e-12);
    }

    #[test]
    fn test_metrics_zero_volatility_guarded() {
        let w = PortfolioWeights::new(assets(1), array![1.0]).unwrap();
        let mean = array![0.0];
        let cov = array![[0.0]];
        let metrics = portfolio_metrics(&w, &mean, &cov, 0.0).unwrap();
        assert!(metrics.sharpe_ratio.is_finite());
    }

    #[test]
    fn test_metrics_dimension_mismatch() {
        let w = PortfolioWeights::new(assets(2), array![0.5, 0.5]).unwrap();
        let mean = array![0.001];
        let cov = array![[0.0004]];
        assert!(portfolio_metrics(&w, &mean, &cov, 0.0).is_err());
    }
}
