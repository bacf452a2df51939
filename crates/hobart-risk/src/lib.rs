#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod monte_carlo;
pub mod stress;
pub mod var;

pub use error::RiskError;
pub use monte_carlo::{
    ConfidenceInterval, MonteCarloConfig, MonteCarloSimulator, SimulatedVar, SimulationResult,
};
pub use stress::{StressResult, StressScenario, default_scenarios, stress_test};
pub use var::{
    RiskResult, TailDistribution, VarMethod, conditional_var, historical_var, modified_var,
    parametric_var, risk_result, value_at_risk,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
