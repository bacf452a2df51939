//! Scenario stress testing
//!
//! Each scenario applies a flat return shock uniformly to the portfolio's
//! periodic returns and re-derives parametric VaR under the shocked
//! distribution. Because the shock shifts the mean and leaves the
//! dispersion untouched, stressed VaR moves one-for-one with the shock.

use crate::error::RiskError;
use crate::var::{TailDistribution, parametric_var};
use hobart_stats::{PortfolioWeights, ReturnsMatrix};
use serde::{Deserialize, Serialize};

/// A named flat-shock scenario, in periodic return units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    /// Scenario name, carried through to the result.
    pub name: String,
    /// Flat return shock added to every period.
    pub shock: f64,
}

impl StressScenario {
    /// Build a scenario from a name and a flat shock.
    pub fn new(name: impl Into<String>, shock: f64) -> Self {
        Self {
            name: name.into(),
            shock,
        }
    }

    /// A -1% daily drawdown environment.
    pub fn mild_correction() -> Self {
        Self::new("mild_correction", -0.01)
    }

    /// A -5% daily crash environment.
    pub fn market_crash() -> Self {
        Self::new("market_crash", -0.05)
    }

    /// A -10% daily crisis environment.
    pub fn severe_crisis() -> Self {
        Self::new("severe_crisis", -0.10)
    }
}

/// The built-in scenario set.
pub fn default_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario::mild_correction(),
        StressScenario::market_crash(),
        StressScenario::severe_crisis(),
    ]
}

/// Stressed VaR for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    /// Scenario name.
    pub scenario: String,
    /// Parametric VaR of the shocked portfolio returns.
    pub var: f64,
}

/// Parametric VaR of the weighted portfolio under each scenario.
///
/// # Arguments
///
/// * `returns` - Historical per-asset returns
/// * `weights` - Portfolio weights over the same assets
/// * `scenarios` - Named flat shocks to apply, one result each
/// * `confidence` - Confidence level for the stressed VaR, in (0, 1)
pub fn stress_test(
    returns: &ReturnsMatrix,
    weights: &PortfolioWeights,
    scenarios: &[StressScenario],
    confidence: f64,
) -> Result<Vec<StressResult>, RiskError> {
    let portfolio = returns.portfolio_returns(weights)?;

    scenarios
        .iter()
        .map(|scenario| {
            if !scenario.shock.is_finite() {
                return Err(RiskError::InvalidInput(format!(
                    "scenario {} has a non-finite shock",
                    scenario.name
                )));
            }
            let shocked = portfolio.mapv(|r| r + scenario.shock);
            let var = parametric_var(&shocked, confidence, TailDistribution::Normal)?;
            Ok(StressResult {
                scenario: scenario.name.clone(),
                var,
            })
        })
        .collect()
}
