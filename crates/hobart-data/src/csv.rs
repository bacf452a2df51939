//! CSV loading of dated return and price tables
//!
//! The expected layout is one `date` column (`YYYY-MM-DD`) followed by one
//! numeric column per asset. Dates must be strictly increasing; cells must
//! all be present. A gap in the table is an error here, not something to
//! forward-fill silently.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use hobart_stats::ReturnsMatrix;
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;

/// A validated returns table plus the dates its rows correspond to.
#[derive(Debug, Clone)]
pub struct LoadedReturns {
    /// The returns matrix, ready for optimizers and risk calculators.
    pub returns: ReturnsMatrix,
    /// Date of each row, same length as the matrix has periods.
    pub dates: Vec<NaiveDate>,
}

/// Load a CSV of periodic returns.
pub fn load_returns_csv(path: &Path) -> Result<LoadedReturns> {
    returns_from_dataframe(read_csv(path)?)
}

/// Load a CSV of prices, converting each series to simple returns
/// `p[t] / p[t-1] - 1`. The first dated row is consumed by the conversion.
pub fn load_prices_csv(path: &Path) -> Result<LoadedReturns> {
    prices_from_dataframe(read_csv(path)?)
}

/// Build a returns table from an already-parsed DataFrame.
pub fn returns_from_dataframe(df: DataFrame) -> Result<LoadedReturns> {
    let (assets, dates, data) = read_table(&df)?;
    let returns = ReturnsMatrix::new(assets, data)?;
    Ok(LoadedReturns { returns, dates })
}

/// Build a returns table from an already-parsed DataFrame of prices.
pub fn prices_from_dataframe(df: DataFrame) -> Result<LoadedReturns> {
    let (assets, mut dates, prices) = read_table(&df)?;
    let returns = ReturnsMatrix::from_prices(assets, prices)?;
    dates.remove(0);
    Ok(LoadedReturns { returns, dates })
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn read_table(df: &DataFrame) -> Result<(Vec<String>, Vec<NaiveDate>, Array2<f64>)> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let date_name = names
        .iter()
        .find(|name| name.eq_ignore_ascii_case("date"))
        .cloned()
        .ok_or_else(|| DataError::MissingColumn("date".to_string()))?;
    let assets: Vec<String> = names
        .into_iter()
        .filter(|name| *name != date_name)
        .collect();
    if assets.is_empty() {
        return Err(DataError::Parse(
            "table needs at least one asset column besides the date".to_string(),
        ));
    }

    let date_series = df.column(&date_name)?.as_materialized_series();
    let date_strings = date_series.str().map_err(|_| {
        DataError::Parse(format!("column {date_name} must contain date strings"))
    })?;

    let mut dates = Vec::with_capacity(df.height());
    for (row, value) in date_strings.into_iter().enumerate() {
        let value = value.ok_or_else(|| DataError::InvalidValue {
            column: date_name.clone(),
            row,
        })?;
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|e| DataError::Parse(format!("row {row}: bad date {value:?}: {e}")))?;
        dates.push(date);
    }
    for (row, pair) in dates.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(DataError::Parse(format!(
                "dates must be strictly increasing, violated at row {}",
                row + 1
            )));
        }
    }

    let mut data = Array2::<f64>::zeros((df.height(), assets.len()));
    for (j, asset) in assets.iter().enumerate() {
        let series = df
            .column(asset)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        let values = series.f64()?;
        for (row, value) in values.into_iter().enumerate() {
            data[[row, j]] = value.ok_or_else(|| DataError::InvalidValue {
                column: asset.clone(),
                row,
            })?;
        }
    }

    Ok((assets, dates, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn returns_frame() -> DataFrame {
        df![
            "date" => ["2024-01-02", "2024-01-03", "2024-01-04"],
            "AAA" => [0.010, -0.004, 0.006],
            "BBB" => [0.002, 0.001, -0.003],
        ]
        .unwrap()
    }

    #[test]
    fn test_returns_from_dataframe() {
        let loaded = returns_from_dataframe(returns_frame()).unwrap();
        assert_eq!(loaded.returns.assets(), &["AAA", "BBB"]);
        assert_eq!(loaded.returns.n_periods(), 3);
        assert_eq!(loaded.dates.len(), 3);
        assert_relative_eq!(loaded.returns.data()[[1, 0]], -0.004, epsilon = 1e-12);
    }

    #[test]
    fn test_prices_from_dataframe() {
        let frame = df![
            "date" => ["2024-01-02", "2024-01-03", "2024-01-04"],
            "AAA" => [100.0, 110.0, 99.0],
        ]
        .unwrap();
        let loaded = prices_from_dataframe(frame).unwrap();
        assert_eq!(loaded.returns.n_periods(), 2);
        assert_eq!(loaded.dates.len(), 2);
        assert_relative_eq!(loaded.returns.data()[[0, 0]], 0.10, epsilon = 1e-12);
        assert_eq!(
            loaded.dates[0],
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
    }

    #[test]
    fn test_missing_date_column() {
        let frame = df![
            "AAA" => [0.01, 0.02],
            "BBB" => [0.01, 0.02],
        ]
        .unwrap();
        assert!(matches!(
            returns_from_dataframe(frame),
            Err(DataError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_no_asset_columns() {
        let frame = df![
            "date" => ["2024-01-02", "2024-01-03"],
        ]
        .unwrap();
        assert!(matches!(
            returns_from_dataframe(frame),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_out_of_order_dates_rejected() {
        let frame = df![
            "date" => ["2024-01-03", "2024-01-02", "2024-01-04"],
            "AAA" => [0.01, 0.02, 0.03],
        ]
        .unwrap();
        assert!(matches!(
            returns_from_dataframe(frame),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_date_format_rejected() {
        let frame = df![
            "date" => ["02/01/2024", "03/01/2024"],
            "AAA" => [0.01, 0.02],
        ]
        .unwrap();
        assert!(returns_from_dataframe(frame).is_err());
    }

    #[test]
    fn test_non_numeric_cell_rejected() {
        let frame = df![
            "date" => ["2024-01-02", "2024-01-03"],
            "AAA" => ["high", "low"],
        ]
        .unwrap();
        assert!(returns_from_dataframe(frame).is_err());
    }
}
