//! End-to-end checks across the workspace: optimizers, risk figures, and
//! the documented differential behavior on degenerate covariance input.

use hobart::optimize::{
    BlackLittermanConfig, HrpConfig, InvestorView, MeanVarianceConfig, OptimizeError,
    OptimizerKind, RiskParityConfig,
};
use hobart::risk::{
    MonteCarloConfig, MonteCarloSimulator, TailDistribution, VarMethod, conditional_var,
    risk_result, value_at_risk,
};
use hobart::stats::{PortfolioWeights, ReturnsMatrix};
use ndarray::Array2;
use rstest::rstest;

fn market_returns() -> ReturnsMatrix {
    let rows = vec![
        [0.0100, 0.0020, -0.0040, 0.0008],
        [-0.0060, 0.0040, 0.0080, -0.0002],
        [0.0080, -0.0020, 0.0020, 0.0010],
        [0.0040, 0.0060, -0.0060, 0.0004],
        [-0.0020, 0.0010, 0.0040, -0.0006],
        [0.0060, -0.0030, 0.0010, 0.0012],
        [0.0020, 0.0050, -0.0020, 0.0002],
        [-0.0040, 0.0020, 0.0060, 0.0006],
        [0.0090, 0.0010, -0.0030, -0.0004],
        [0.0010, 0.0030, 0.0050, 0.0008],
        [-0.0050, -0.0010, 0.0020, 0.0002],
        [0.0070, 0.0040, -0.0010, 0.0010],
    ];
    let mut data = Array2::<f64>::zeros((rows.len(), 4));
    for (i, row) in rows.iter().enumerate() {
        for j in 0..4 {
            data[[i, j]] = row[j];
        }
    }
    ReturnsMatrix::new(
        vec![
            "EQ_US".to_string(),
            "EQ_EU".to_string(),
            "BOND".to_string(),
            "CASH".to_string(),
        ],
        data,
    )
    .unwrap()
}

fn rank_deficient_returns() -> ReturnsMatrix {
    // Second asset is a leveraged clone of the first.
    let base = [0.010, -0.004, 0.006, -0.002, 0.008, 0.001, -0.006, 0.004];
    let mut data = Array2::<f64>::zeros((base.len(), 3));
    for (i, &r) in base.iter().enumerate() {
        data[[i, 0]] = r;
        data[[i, 1]] = 2.0 * r;
        data[[i, 2]] = 0.001 - 0.5 * r;
    }
    ReturnsMatrix::new(
        vec!["AAA".to_string(), "LEV".to_string(), "HEDGE".to_string()],
        data,
    )
    .unwrap()
}

fn all_kinds() -> Vec<OptimizerKind> {
    vec![
        OptimizerKind::MeanVariance(MeanVarianceConfig::default()),
        OptimizerKind::RiskParity(RiskParityConfig::default()),
        OptimizerKind::BlackLitterman(BlackLittermanConfig::default()),
        OptimizerKind::HierarchicalRiskParity(HrpConfig::default()),
    ]
}

#[test]
fn test_every_optimizer_produces_valid_weights() {
    let returns = market_returns();
    for kind in all_kinds() {
        let outcome = kind.optimize(&returns).unwrap();
        let total = outcome.weights.sum();
        assert!(
            (total - 1.0).abs() < 1e-6,
            "{} weights sum to {total}",
            kind.name()
        );
        for (asset, weight) in outcome.weights.iter() {
            assert!(
                (-1e-9..=1.0 + 1e-9).contains(&weight),
                "{} weight for {asset} out of bounds: {weight}",
                kind.name()
            );
        }
        assert!(outcome.metrics.volatility >= 0.0);
    }
}

#[test]
fn test_optimizers_are_deterministic() {
    let returns = market_returns();
    for kind in all_kinds() {
        let first = kind.optimize(&returns).unwrap();
        let second = kind.optimize(&returns).unwrap();
        assert_eq!(
            first.weights.values(),
            second.weights.values(),
            "{} must be deterministic",
            kind.name()
        );
    }
}

#[test]
fn test_hrp_survives_what_breaks_black_litterman() {
    let returns = rank_deficient_returns();

    let hrp = OptimizerKind::HierarchicalRiskParity(HrpConfig::default());
    let outcome = hrp.optimize(&returns).unwrap();
    assert!((outcome.weights.sum() - 1.0).abs() < 1e-6);

    // The same covariance is singular, so the posterior blend cannot form.
    let bl = OptimizerKind::BlackLitterman(BlackLittermanConfig {
        views: vec![InvestorView {
            assets: vec!["AAA".to_string()],
            relative_weights: vec![1.0],
            expected_return: 0.01,
            confidence: 0.9,
        }],
        ..Default::default()
    });
    assert!(matches!(
        bl.optimize(&returns),
        Err(OptimizeError::NumericalInstability(_))
    ));
}

#[rstest]
#[case(VarMethod::Historical)]
#[case(VarMethod::Parametric(TailDistribution::Normal))]
#[case(VarMethod::Modified)]
fn test_optimized_portfolio_risk_is_coherent(#[case] method: VarMethod) {
    let returns = market_returns();
    let outcome = OptimizerKind::MeanVariance(MeanVarianceConfig::default())
        .optimize(&returns)
        .unwrap();
    let portfolio = returns.portfolio_returns(&outcome.weights).unwrap();

    let result = risk_result(&portfolio, 0.95, method, 1.0).unwrap();
    assert!(result.cvar <= result.var + 1e-12);
    assert_eq!(result.confidence_level, 0.95);

    let var = value_at_risk(&portfolio, 0.95, method).unwrap();
    let cvar = conditional_var(&portfolio, 0.95, method).unwrap();
    assert_eq!(result.var, var);
    assert_eq!(result.cvar, cvar);
}

#[test]
fn test_simulation_consumes_optimizer_weights() {
    let returns = market_returns();
    let outcome = OptimizerKind::RiskParity(RiskParityConfig::default())
        .optimize(&returns)
        .unwrap();

    let simulator = MonteCarloSimulator::new(MonteCarloConfig {
        num_simulations: 500,
        time_horizon: 21,
        ..Default::default()
    })
    .unwrap();
    let result = simulator.run(&returns, &outcome.weights, 1_000_000.0).unwrap();

    assert_eq!(result.terminal_values.len(), 500);
    assert_eq!(result.value_at_risk.len(), 3);
    assert!(result.terminal_values.iter().all(|v| v.is_finite()));
}

#[test]
fn test_equal_weights_round_trip() {
    let returns = market_returns();
    let weights = PortfolioWeights::equal(returns.assets().to_vec()).unwrap();
    let portfolio = returns.portfolio_returns(&weights).unwrap();
    assert_eq!(portfolio.len(), returns.n_periods());
}
