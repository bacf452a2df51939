//! Sample moment estimation
//!
//! Expected-return vectors and covariance matrices are estimated fresh from
//! a `ReturnsMatrix` on every optimizer construction; nothing here caches or
//! mutates. Covariance uses the unbiased (n-1) estimator and is left at the
//! periodic frequency; annualization happens only in `metrics`.

use crate::error::{Result, StatsError};
use crate::returns::ReturnsMatrix;
use ndarray::{Array1, Array2, ArrayView1};

/// Periodic sample moments of a returns table.
///
/// Holds the per-asset mean vector and the sample covariance matrix in the
/// same asset ordering as the source `ReturnsMatrix`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleEstimates {
    assets: Vec<String>,
    mean_returns: Array1<f64>,
    covariance: Array2<f64>,
}

impl SampleEstimates {
    /// Estimate moments from a returns table.
    pub fn from_returns(returns: &ReturnsMatrix) -> Self {
        let data = returns.data();
        let (n_periods, n_assets) = data.dim();
        let t = n_periods as f64;

        let mean_returns = data.sum_axis(ndarray::Axis(0)) / t;

        let mut covariance = Array2::<f64>::zeros((n_assets, n_assets));
        for i in 0..n_assets {
            for j in i..n_assets {
                let mut acc = 0.0;
                for row in 0..n_periods {
                    acc += (data[[row, i]] - mean_returns[i]) * (data[[row, j]] - mean_returns[j]);
                }
                let cov = acc / (t - 1.0);
                covariance[[i, j]] = cov;
                covariance[[j, i]] = cov;
            }
        }

        Self {
            assets: returns.assets().to_vec(),
            mean_returns,
            covariance,
        }
    }

    /// Asset identifiers, in moment order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Per-asset periodic mean returns.
    pub const fn mean_returns(&self) -> &Array1<f64> {
        &self.mean_returns
    }

    /// Periodic sample covariance matrix.
    pub const fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    /// Correlation matrix derived from the covariance matrix.
    ///
    /// Assets with zero variance correlate at zero with everything else and
    /// at one with themselves.
    pub fn correlation(&self) -> Array2<f64> {
        let n = self.covariance.nrows();
        let stds: Vec<f64> = (0..n).map(|i| self.covariance[[i, i]].max(0.0).sqrt()).collect();

        let mut corr = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    corr[[i, j]] = 1.0;
                } else if stds[i] > 0.0 && stds[j] > 0.0 {
                    corr[[i, j]] = (self.covariance[[i, j]] / (stds[i] * stds[j])).clamp(-1.0, 1.0);
                }
            }
        }
        corr
    }
}

/// Sample mean of a series.
pub fn mean(series: ArrayView1<'_, f64>) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    series.sum() / series.len() as f64
}

/// Unbiased sample standard deviation of a series.
pub fn std_dev(series: ArrayView1<'_, f64>) -> f64 {
    let n = series.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(series);
    let var = series.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    var.sqrt()
}

/// Moment-based sample skewness `m3 / m2^(3/2)`.
pub fn skewness(series: ArrayView1<'_, f64>) -> f64 {
    let n = series.len();
    if n < 3 {
        return 0.0;
    }
    let m = mean(series);
    let t = n as f64;
    let m2 = series.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / t;
    let m3 = series.iter().map(|&x| (x - m).powi(3)).sum::<f64>() / t;
    if m2 <= 0.0 {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

/// Moment-based sample excess kurtosis `m4 / m2^2 - 3`.
pub fn excess_kurtosis(series: ArrayView1<'_, f64>) -> f64 {
    let n = series.len();
    if n < 4 {
        return 0.0;
    }
    let m = mean(series);
    let t = n as f64;
    let m2 = series.iter().map(|&x| (x - m).powi(2)).sum::<f64>() / t;
    let m4 = series.iter().map(|&x| (x - m).powi(4)).sum::<f64>() / t;
    if m2 <= 0.0 {
        return 0.0;
    }
    m4 / (m2 * m2) - 3.0
}

/// Linear-interpolated percentile of a sample, `pct` in `[0, 100]`.
///
/// Matches the standard linear definition: with the sample sorted, the
/// percentile sits at rank `(n - 1) * pct / 100`, interpolating between the
/// two neighboring order statistics.
///
/// # Errors
/// Returns an error if the sample is empty or `pct` lies outside `[0, 100]`.
pub fn percentile(values: &[f64], pct: f64) -> Result<f64> {
    if values.is_empty() {
        return Err(StatsError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    if !(0.0..=100.0).contains(&pct) {
        return Err(StatsError::InvalidInput(format!(
            "percentile must lie in [0, 100], got {pct}"
        )));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (sorted.len() - 1) as f64 * pct / 100.0;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return Ok(sorted[lower]);
    }
    let frac = rank - lower as f64;
    Ok(sorted[lower] + frac * (sorted[upper] - sorted[lower]))
}
