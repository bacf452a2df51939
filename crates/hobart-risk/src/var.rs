//! Value at Risk and Conditional VaR
//!
//! Stateless functions over a periodic returns series. VaR is reported in
//! return space with the sign of the underlying quantile: a 95% VaR of
//! -0.025 means the portfolio is not expected to lose more than 2.5% in one
//! period at 95% confidence. CVaR is the expected return in the tail at or
//! beyond that threshold, so `cvar <= var` always holds.
//!
//! Confidence levels are fractions in the open interval (0, 1); anything
//! else is rejected outright rather than clamped.

use crate::error::RiskError;
use hobart_stats::moments::{excess_kurtosis, mean, skewness, std_dev};
use hobart_stats::percentile;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal, StudentsT};

/// Minimum observations for any VaR estimate.
const MIN_OBSERVATIONS: usize = 2;

/// Minimum observations before the Cornish-Fisher expansion is trusted.
const MODIFIED_MIN_OBSERVATIONS: usize = 4;

/// Cap on the fitted Student-t degrees of freedom (effectively normal).
const MAX_DEGREES_OF_FREEDOM: f64 = 200.0;

/// Distribution assumed by parametric VaR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailDistribution {
    /// Gaussian tails.
    #[default]
    Normal,
    /// Student-t tails with degrees of freedom fitted from sample kurtosis.
    StudentT,
}

/// VaR estimation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarMethod {
    /// Empirical quantile of the observed returns.
    Historical,
    /// Distribution fit to the sample mean and standard deviation.
    Parametric(TailDistribution),
    /// Cornish-Fisher quantile adjustment for skew and kurtosis.
    Modified,
}

/// VaR and CVaR for one (confidence, method) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Value at Risk, in return space.
    pub var: f64,
    /// Conditional VaR (expected shortfall), in return space.
    pub cvar: f64,
    /// Confidence level the figures correspond to.
    pub confidence_level: f64,
    /// Horizon in periods; figures are scaled by its square root.
    pub time_horizon: f64,
    /// Method that produced the figures.
    pub method: VarMethod,
}

fn validate_confidence(confidence: f64) -> Result<(), RiskError> {
    if !confidence.is_finite() || confidence <= 0.0 || confidence >= 1.0 {
        return Err(RiskError::InvalidConfidence(confidence));
    }
    Ok(())
}

fn validate_sample(returns: &Array1<f64>) -> Result<(), RiskError> {
    if returns.len() < MIN_OBSERVATIONS {
        return Err(RiskError::InsufficientData {
            required: MIN_OBSERVATIONS,
            actual: returns.len(),
        });
    }
    Ok(())
}

fn standard_normal() -> Result<Normal, RiskError> {
    Normal::new(0.0, 1.0)
        .map_err(|e| RiskError::NumericalInstability(format!("standard normal: {e}")))
}

/// Student-t degrees of freedom fitted by method of moments from sample
/// excess kurtosis: `df = 4 + 6 / kurtosis`, capped when tails look normal
/// or thin.
fn fitted_degrees_of_freedom(returns: &Array1<f64>) -> f64 {
    let kurtosis = excess_kurtosis(returns.view());
    if kurtosis > 0.0 {
        (4.0 + 6.0 / kurtosis).min(MAX_DEGREES_OF_FREEDOM)
    } else {
        MAX_DEGREES_OF_FREEDOM
    }
}

/// Historical VaR: the `(1 - confidence)` quantile of the observed returns.
pub fn historical_var(returns: &Array1<f64>, confidence: f64) -> Result<f64, RiskError> {
    validate_confidence(confidence)?;
    validate_sample(returns)?;
    Ok(percentile(&returns.to_vec(), (1.0 - confidence) * 100.0)?)
}

/// Parametric VaR: `mean + z_{1-confidence} * std` under the chosen
/// distribution.
///
/// Student-t quantiles are rescaled by `sqrt((df - 2) / df)` so the fitted
/// distribution matches the sample variance.
///
/// # Arguments
///
/// * `returns` - Observed periodic returns
/// * `confidence` - Confidence level, a fraction in (0, 1)
/// * `distribution` - Tail shape fitted to the sample
pub fn parametric_var(
    returns: &Array1<f64>,
    confidence: f64,
    distribution: TailDistribution,
) -> Result<f64, RiskError> {
    validate_confidence(confidence)?;
    validate_sample(returns)?;

    let sample_mean = mean(returns.view());
    let sample_std = std_dev(returns.view());
    let alpha = 1.0 - confidence;

    let z = match distribution {
        TailDistribution::Normal => standard_normal()?.inverse_cdf(alpha),
        TailDistribution::StudentT => {
            let df = fitted_degrees_of_freedom(returns);
            let student = StudentsT::new(0.0, 1.0, df).map_err(|e| {
                RiskError::NumericalInstability(format!("student-t with df {df}: {e}"))
            })?;
            student.inverse_cdf(alpha) * ((df - 2.0) / df).sqrt()
        }
    };

    Ok(sample_mean + z * sample_std)
}

/// Modified (Cornish-Fisher) VaR: the normal quantile adjusted for sample
/// skewness and excess kurtosis.
///
/// Falls back to parametric normal VaR below four observations, where the
/// higher moments are not estimable.
pub fn modified_var(returns: &Array1<f64>, confidence: f64) -> Result<f64, RiskError> {
    validate_confidence(confidence)?;
    validate_sample(returns)?;

    if returns.len() < MODIFIED_MIN_OBSERVATIONS {
        return parametric_var(returns, confidence, TailDistribution::Normal);
    }

    let sample_mean = mean(returns.view());
    let sample_std = std_dev(returns.view());
    let skew = skewness(returns.view());
    let kurtosis = excess_kurtosis(returns.view());

    let z = standard_normal()?.inverse_cdf(1.0 - confidence);
    let z2 = z * z;
    let z3 = z2 * z;
    let adjusted = z
        + (z2 - 1.0) * skew / 6.0
        + (z3 - 3.0 * z) * kurtosis / 24.0
        - (2.0 * z3 - 5.0 * z) * skew * skew / 36.0;

    Ok(sample_mean + adjusted * sample_std)
}

/// Conditional VaR (expected shortfall) at the given confidence level.
///
/// For `Historical` and `Modified` this is the mean of the returns at or
/// below the method's VaR threshold; for `Parametric` the distribution's
/// closed form (`mean - std * phi(z_alpha) / alpha` under normal tails).
pub fn conditional_var(
    returns: &Array1<f64>,
    confidence: f64,
    method: VarMethod,
) -> Result<f64, RiskError> {
    validate_confidence(confidence)?;
    validate_sample(returns)?;

    match method {
        VarMethod::Historical => {
            let threshold = historical_var(returns, confidence)?;
            Ok(tail_mean(returns, threshold))
        }
        VarMethod::Modified => {
            let threshold = modified_var(returns, confidence)?;
            Ok(tail_mean(returns, threshold))
        }
        VarMethod::Parametric(TailDistribution::Normal) => {
            let sample_mean = mean(returns.view());
            let sample_std = std_dev(returns.view());
            let alpha = 1.0 - confidence;
            let normal = standard_normal()?;
            let z = normal.inverse_cdf(alpha);
            Ok(sample_mean - sample_std * normal.pdf(z) / alpha)
        }
        VarMethod::Parametric(TailDistribution::StudentT) => {
            // Closed-form expected shortfall of the variance-matched t fit:
            // ES = mean - std * k * f(t_a) * (df + t_a^2) / ((df - 1) * alpha)
            let sample_mean = mean(returns.view());
            let sample_std = std_dev(returns.view());
            let alpha = 1.0 - confidence;
            let df = fitted_degrees_of_freedom(returns);
            let student = StudentsT::new(0.0, 1.0, df).map_err(|e| {
                RiskError::NumericalInstability(format!("student-t with df {df}: {e}"))
            })?;
            let t_alpha = student.inverse_cdf(alpha);
            let scale = ((df - 2.0) / df).sqrt();
            let shortfall =
                student.pdf(t_alpha) * (df + t_alpha * t_alpha) / ((df - 1.0) * alpha);
            Ok(sample_mean - sample_std * scale * shortfall)
        }
    }
}

/// VaR for the configured method.
pub fn value_at_risk(
    returns: &Array1<f64>,
    confidence: f64,
    method: VarMethod,
) -> Result<f64, RiskError> {
    match method {
        VarMethod::Historical => historical_var(returns, confidence),
        VarMethod::Parametric(distribution) => parametric_var(returns, confidence, distribution),
        VarMethod::Modified => modified_var(returns, confidence),
    }
}

/// Assemble a `RiskResult` for one (confidence, method) pair, scaling the
/// one-period figures by the square root of the horizon.
pub fn risk_result(
    returns: &Array1<f64>,
    confidence: f64,
    method: VarMethod,
    time_horizon: f64,
) -> Result<RiskResult, RiskError> {
    if !time_horizon.is_finite() || time_horizon <= 0.0 {
        return Err(RiskError::InvalidInput(format!(
            "time horizon must be positive, got {time_horizon}"
        )));
    }

    let scale = time_horizon.sqrt();
    let var = value_at_risk(returns, confidence, method)? * scale;
    let cvar = conditional_var(returns, confidence, method)? * scale;

    Ok(RiskResult {
        var,
        cvar,
        confidence_level: confidence,
        time_horizon,
        method,
    })
}

/// Mean of the observations at or below `threshold`. An empty tail means
/// the threshold sits beyond the worst observation, so the threshold itself
/// is the best available shortfall estimate (and keeps `cvar <= var`).
fn tail_mean(returns: &Array1<f64>, threshold: f64) -> f64 {
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= threshold).collect();
    if tail.is_empty() {
        threshold
    } else {
        tail.iter().sum::<f64>() / tail.len() as f64
    }
}
