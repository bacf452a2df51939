//! Historical returns table
//!
//! `ReturnsMatrix` is the single input type shared by every optimizer and
//! risk calculator: rows are time periods (chronological, fixed frequency),
//! columns are assets. The constructor enforces the invariants the rest of
//! the workspace relies on, so downstream code never re-validates shape.

use crate::error::{Result, StatsError};
use crate::metrics::PortfolioWeights;
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::HashSet;

/// Minimum number of periods required to estimate moments.
pub const MIN_PERIODS: usize = 2;

/// Immutable table of periodic returns, rows = periods, columns = assets.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnsMatrix {
    assets: Vec<String>,
    data: Array2<f64>,
}

impl ReturnsMatrix {
    /// Build a returns matrix from asset identifiers and a periods x assets
    /// table of periodic returns.
    ///
    /// # Errors
    /// Returns an error if the table has fewer than two periods, no assets,
    /// duplicate asset identifiers, a column count that does not match the
    /// identifier list, or any non-finite value.
    pub fn new(assets: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if assets.is_empty() {
            return Err(StatsError::NoAssets);
        }
        if data.ncols() != assets.len() {
            return Err(StatsError::DimensionMismatch {
                expected: assets.len(),
                actual: data.ncols(),
            });
        }
        if data.nrows() < MIN_PERIODS {
            return Err(StatsError::InsufficientData {
                required: MIN_PERIODS,
                actual: data.nrows(),
            });
        }

        let mut seen = HashSet::with_capacity(assets.len());
        for asset in &assets {
            if !seen.insert(asset.as_str()) {
                return Err(StatsError::DuplicateAsset(asset.clone()));
            }
        }

        for (j, asset) in assets.iter().enumerate() {
            for (i, &value) in data.column(j).iter().enumerate() {
                if !value.is_finite() {
                    return Err(StatsError::NonFiniteValue {
                        asset: asset.clone(),
                        period: i,
                    });
                }
            }
        }

        Ok(Self { assets, data })
    }

    /// Build a returns matrix from a periods x assets table of prices,
    /// converting each series to simple returns `p[t] / p[t-1] - 1`.
    ///
    /// Prices must be strictly positive; the resulting table has one fewer
    /// row than the price table.
    pub fn from_prices(assets: Vec<String>, prices: Array2<f64>) -> Result<Self> {
        if prices.nrows() < MIN_PERIODS + 1 {
            return Err(StatsError::InsufficientData {
                required: MIN_PERIODS + 1,
                actual: prices.nrows(),
            });
        }
        for (j, asset) in assets.iter().enumerate() {
            if j >= prices.ncols() {
                break;
            }
            for (i, &price) in prices.column(j).iter().enumerate() {
                if !price.is_finite() || price <= 0.0 {
                    return Err(StatsError::InvalidInput(format!(
                        "non-positive price for asset {asset} at period {i}"
                    )));
                }
            }
        }

        let (n_periods, n_assets) = prices.dim();
        let mut returns = Array2::<f64>::zeros((n_periods - 1, n_assets));
        for t in 1..n_periods {
            for j in 0..n_assets {
                returns[[t - 1, j]] = prices[[t, j]] / prices[[t - 1, j]] - 1.0;
            }
        }

        Self::new(assets, returns)
    }

    /// Asset identifiers, in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Number of assets (columns).
    pub fn n_assets(&self) -> usize {
        self.data.ncols()
    }

    /// Number of periods (rows).
    pub fn n_periods(&self) -> usize {
        self.data.nrows()
    }

    /// The underlying periods x assets table.
    pub const fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Return series for a single asset, if present.
    pub fn series(&self, asset: &str) -> Option<ArrayView1<'_, f64>> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|j| self.data.column(j))
    }

    /// Weighted combination of the asset return series, one value per period.
    ///
    /// The weights must cover exactly the assets of this table, in the same
    /// order; they are renormalized to sum to one before combining.
    pub fn portfolio_returns(&self, weights: &PortfolioWeights) -> Result<Array1<f64>> {
        if weights.assets() != self.assets() {
            return Err(StatsError::InvalidWeights(
                "weights do not match the assets of the returns matrix".to_string(),
            ));
        }
        let w = weights.normalized()?;
        Ok(self.data.dot(w.values()))
    }
}
