//! Runs all four allocation models over a synthetic returns table.
//!
//! Run with: cargo run --example optimizer_demo

use hobart_optimize::{
    BlackLittermanConfig, HrpConfig, MeanVarianceConfig, OptimizerKind, RiskParityConfig,
};
use hobart_stats::ReturnsMatrix;
use ndarray::Array2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Four assets, sixty trading days of synthetic daily returns.
    let assets = vec![
        "EQ_US".to_string(),
        "EQ_EU".to_string(),
        "BOND".to_string(),
        "GOLD".to_string(),
    ];
    let n_periods = 60;
    let mut data = Array2::<f64>::zeros((n_periods, 4));
    for t in 0..n_periods {
        let cycle = (t as f64 / 7.0).sin();
        data[[t, 0]] = 0.0009 + 0.012 * cycle;
        data[[t, 1]] = 0.0007 + 0.010 * (cycle + 0.2 * (t as f64 / 3.0).cos());
        data[[t, 2]] = 0.0002 + 0.002 * (t as f64 / 11.0).cos();
        data[[t, 3]] = 0.0004 - 0.006 * cycle;
    }
    let returns = ReturnsMatrix::new(assets, data)?;

    let kinds = [
        OptimizerKind::MeanVariance(MeanVarianceConfig::default()),
        OptimizerKind::RiskParity(RiskParityConfig::default()),
        OptimizerKind::BlackLitterman(BlackLittermanConfig::default()),
        OptimizerKind::HierarchicalRiskParity(HrpConfig::default()),
    ];

    for kind in &kinds {
        let outcome = kind.optimize(&returns)?;
        println!("=== {} ===", kind.name());
        for (asset, weight) in outcome.weights.iter() {
            println!("  {asset:<6} {:>7.2}%", weight * 100.0);
        }
        println!(
            "  return {:.2}%  vol {:.2}%  sharpe {:.2}\n",
            outcome.metrics.expected_return * 100.0,
            outcome.metrics.volatility * 100.0,
            outcome.metrics.sharpe_ratio
        );
    }

    Ok(())
}
