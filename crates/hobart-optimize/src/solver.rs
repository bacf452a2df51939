//! Shared constrained solver
//!
//! Projected-gradient descent over the budget set `{ sum(w) = 1,
//! lower <= w_i <= upper }` with central-difference gradients and an
//! adaptive backtracking step. Target constraints (return, volatility)
//! enter through quadratic penalties added by the caller's objective; the
//! caller checks the constraint residual on exit.
//!
//! The solver is deterministic: no randomness, no restarts. If it exhausts
//! its iteration budget it reports `NotConverged` with a diagnostic rather
//! than returning the best point found.

use crate::error::OptimizeError;
use ndarray::Array1;
use tracing::debug;

/// Step size below which the search is considered stationary.
const MIN_STEP: f64 = 1e-12;

/// Perturbation for central-difference gradients.
const GRADIENT_STEP: f64 = 1e-7;

/// Solver tuning knobs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SolverConfig {
    /// Maximum gradient iterations before reporting failure.
    pub max_iterations: usize,
    /// Relative sufficient-decrease tolerance.
    pub tolerance: f64,
    /// Initial gradient step.
    pub initial_step: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-10,
            initial_step: 0.1,
        }
    }
}

impl SolverConfig {
    pub(crate) fn with_max_iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }
}

/// A converged solution.
#[derive(Debug, Clone)]
pub(crate) struct Solution {
    pub weights: Array1<f64>,
    pub objective: f64,
    pub iterations: usize,
}

/// Project a weight vector onto `{ sum(w) = 1, lower <= w_i <= upper }`.
///
/// Clamps into the box, then spreads the remaining budget across the
/// coordinates that are not pinned at the blocking bound, repeating until
/// the budget closes. With feasible bounds (`n * lower <= 1 <= n * upper`)
/// this converges in a handful of passes.
pub(crate) fn project_onto_budget(weights: &mut Array1<f64>, lower: f64, upper: f64) {
    let n = weights.len();
    weights.mapv_inplace(|w| w.clamp(lower, upper));

    for _ in 0..64 {
        let deficit = 1.0 - weights.sum();
        if deficit.abs() < 1e-12 {
            break;
        }

        let free: Vec<usize> = (0..n)
            .filter(|&i| {
                if deficit > 0.0 {
                    weights[i] < upper - 1e-15
                } else {
                    weights[i] > lower + 1e-15
                }
            })
            .collect();
        if free.is_empty() {
            break;
        }

        let share = deficit / free.len() as f64;
        for &i in &free {
            weights[i] = (weights[i] + share).clamp(lower, upper);
        }
    }
}

/// Minimize `objective` over the budget set.
pub(crate) fn minimize<F>(
    objective: F,
    start: &Array1<f64>,
    lower: f64,
    upper: f64,
    config: &SolverConfig,
) -> Result<Solution, OptimizeError>
where
    F: Fn(&Array1<f64>) -> f64,
{
    let n = start.len();
    let mut weights = start.clone();
    project_onto_budget(&mut weights, lower, upper);

    let mut value = objective(&weights);
    if !value.is_finite() {
        return Err(OptimizeError::NumericalInstability(
            "objective is not finite at the starting point".to_string(),
        ));
    }

    let mut step = config.initial_step;
    let mut gradient = Array1::<f64>::zeros(n);

    for iteration in 1..=config.max_iterations {
        for i in 0..n {
            let mut forward = weights.clone();
            let mut backward = weights.clone();
            forward[i] += GRADIENT_STEP;
            backward[i] -= GRADIENT_STEP;
            gradient[i] = (objective(&forward) - objective(&backward)) / (2.0 * GRADIENT_STEP);
        }
        if gradient.iter().any(|g| !g.is_finite()) {
            return Err(OptimizeError::NumericalInstability(
                "non-finite gradient encountered".to_string(),
            ));
        }

        let mut improved = false;
        while step >= MIN_STEP {
            let mut candidate = &weights - &gradient.mapv(|g| g * step);
            project_onto_budget(&mut candidate, lower, upper);
            let candidate_value = objective(&candidate);

            if candidate_value.is_finite()
                && candidate_value < value - config.tolerance * value.abs().max(1.0)
            {
                weights = candidate;
                value = candidate_value;
                step = (step * 1.5).min(1.0);
                improved = true;
                break;
            }
            step *= 0.5;
        }

        if !improved {
            debug!(
                iterations = iteration,
                objective = value,
                "projected gradient reached a stationary point"
            );
            return Ok(Solution {
                weights,
                objective: value,
                iterations: iteration,
            });
        }
    }

    Err(OptimizeError::NotConverged {
        iterations: config.max_iterations,
        message: format!(
            "projected gradient exhausted {} iterations without reaching a stationary point \
             (last objective {:.6e}, step {:.3e})",
            config.max_iterations, value, step
        ),
    })
}

/// Validate a uniform bound pair against the budget constraint.
pub(crate) fn validate_bounds(
    bounds: (f64, f64),
    n_assets: usize,
) -> Result<(), OptimizeError> {
    let (lower, upper) = bounds;
    if !lower.is_finite() || !upper.is_finite() {
        return Err(OptimizeError::InvalidConfiguration(
            "weight bounds must be finite".to_string(),
        ));
    }
    if lower > upper {
        return Err(OptimizeError::InvalidConfiguration(format!(
            "lower bound {lower} exceeds upper bound {upper}"
        )));
    }
    let n = n_assets as f64;
    if n * lower > 1.0 + 1e-9 || n * upper < 1.0 - 1e-9 {
        return Err(OptimizeError::InvalidConfiguration(format!(
            "bounds [{lower}, {upper}] cannot accommodate weights summing to one \
             across {n_assets} assets"
        )));
    }
    Ok(())
}
