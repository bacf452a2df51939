//! Monte Carlo simulation throughput.

use criterion::{Criterion, criterion_group, criterion_main};
use hobart_risk::{MonteCarloConfig, MonteCarloSimulator};
use hobart_stats::{PortfolioWeights, ReturnsMatrix};
use ndarray::Array2;

fn synthetic_returns(n_periods: usize, n_assets: usize) -> ReturnsMatrix {
    let assets: Vec<String> = (0..n_assets).map(|i| format!("A{i}")).collect();
    let mut data = Array2::<f64>::zeros((n_periods, n_assets));
    for t in 0..n_periods {
        for j in 0..n_assets {
            let phase = t as f64 / (7.0 + j as f64);
            data[[t, j]] = 0.0005 + 0.01 * phase.sin();
        }
    }
    ReturnsMatrix::new(assets, data).unwrap()
}

fn bench_simulation(c: &mut Criterion) {
    let returns = synthetic_returns(252, 8);
    let weights = PortfolioWeights::equal(returns.assets().to_vec()).unwrap();
    let simulator = MonteCarloSimulator::new(MonteCarloConfig {
        num_simulations: 1_000,
        time_horizon: 21,
        ..Default::default()
    })
    .unwrap();

    c.bench_function("monte_carlo_1000_paths_21_periods", |b| {
        b.iter(|| simulator.run(&returns, &weights, 1_000_000.0).unwrap())
    });
}

criterion_group!(benches, bench_simulation);
criterion_main!(benches);
