//! Hobart CLI binary.
//!
//! Command-line interface for the Hobart portfolio analytics workspace:
//! reads a dated CSV of returns (or prices), runs the selected optimizer or
//! risk calculation, and prints the result as text or JSON.

use clap::{Parser, Subcommand};
use hobart_data::{LoadedReturns, load_prices_csv, load_returns_csv};
use hobart_optimize::{
    BlackLittermanConfig, EfficientFrontierBuilder, FrontierConfig, HrpConfig, InvestorView,
    LinkageMethod, MeanVarianceConfig, OptimizationOutcome, OptimizerKind, RiskParityConfig,
};
use hobart_risk::{
    MonteCarloConfig, MonteCarloSimulator, SimulationResult, TailDistribution, VarMethod,
    default_scenarios, risk_result, stress_test,
};
use hobart_stats::{PortfolioWeights, ReturnsMatrix};
use ndarray::Array1;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "hobart")]
#[command(about = "Hobart: Portfolio construction and risk analytics", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute portfolio weights under an allocation model
    Optimize {
        /// CSV with a date column and one return column per asset
        input: PathBuf,

        /// Treat the input columns as prices and convert to returns
        #[arg(long)]
        prices: bool,

        /// Allocation model: mean-variance, risk-parity, black-litterman, hrp
        #[arg(long, default_value = "mean-variance")]
        method: String,

        /// Annualized target return (mean-variance only)
        #[arg(long)]
        target_return: Option<f64>,

        /// Annualized target volatility (mean-variance only)
        #[arg(long)]
        target_volatility: Option<f64>,

        /// Annual risk-free rate
        #[arg(long, default_value = "0.0")]
        risk_free_rate: f64,

        /// Lower weight bound per asset
        #[arg(long, default_value = "0.0")]
        lower_bound: f64,

        /// Upper weight bound per asset
        #[arg(long, default_value = "1.0")]
        upper_bound: f64,

        /// Comma-separated risk budgets (risk-parity only)
        #[arg(long)]
        risk_weights: Option<String>,

        /// Comma-separated market caps (black-litterman only)
        #[arg(long)]
        market_caps: Option<String>,

        /// JSON file with investor views (black-litterman only)
        #[arg(long)]
        views: Option<PathBuf>,

        /// Linkage rule: single, complete, average (hrp only)
        #[arg(long, default_value = "single")]
        linkage: String,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Trace the efficient frontier
    Frontier {
        /// CSV with a date column and one return column per asset
        input: PathBuf,

        /// Treat the input columns as prices and convert to returns
        #[arg(long)]
        prices: bool,

        /// Number of target returns swept between the extremes
        #[arg(long, default_value = "20")]
        points: usize,

        /// Annual risk-free rate
        #[arg(long, default_value = "0.0")]
        risk_free_rate: f64,

        /// Lower weight bound per asset
        #[arg(long, default_value = "0.0")]
        lower_bound: f64,

        /// Upper weight bound per asset
        #[arg(long, default_value = "1.0")]
        upper_bound: f64,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Value at Risk and Conditional VaR of a weighted portfolio
    Var {
        /// CSV with a date column and one return column per asset
        input: PathBuf,

        /// Treat the input columns as prices and convert to returns
        #[arg(long)]
        prices: bool,

        /// Comma-separated portfolio weights (default: equal weights)
        #[arg(long)]
        weights: Option<String>,

        /// Confidence level in (0, 1)
        #[arg(long, default_value = "0.95")]
        confidence: f64,

        /// Method: historical, parametric, parametric-t, modified
        #[arg(long, default_value = "historical")]
        method: String,

        /// Horizon in periods; figures scale with its square root
        #[arg(long, default_value = "1.0")]
        horizon: f64,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Stressed VaR under the built-in shock scenarios
    Stress {
        /// CSV with a date column and one return column per asset
        input: PathBuf,

        /// Treat the input columns as prices and convert to returns
        #[arg(long)]
        prices: bool,

        /// Comma-separated portfolio weights (default: equal weights)
        #[arg(long)]
        weights: Option<String>,

        /// Confidence level in (0, 1)
        #[arg(long, default_value = "0.95")]
        confidence: f64,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Monte Carlo simulation of terminal portfolio values
    Simulate {
        /// CSV with a date column and one return column per asset
        input: PathBuf,

        /// Treat the input columns as prices and convert to returns
        #[arg(long)]
        prices: bool,

        /// Comma-separated portfolio weights (default: equal weights)
        #[arg(long)]
        weights: Option<String>,

        /// Number of simulated paths
        #[arg(long, default_value = "10000")]
        simulations: usize,

        /// Path length in periods
        #[arg(long, default_value = "252")]
        horizon: usize,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Initial portfolio value
        #[arg(long, default_value = "1000000.0")]
        initial: f64,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Optimize {
            input,
            prices,
            method,
            target_return,
            target_volatility,
            risk_free_rate,
            lower_bound,
            upper_bound,
            risk_weights,
            market_caps,
            views,
            linkage,
            format,
        } => {
            let loaded = load_table(&input, prices)?;
            let kind = build_optimizer(
                &method,
                target_return,
                target_volatility,
                risk_free_rate,
                (lower_bound, upper_bound),
                risk_weights.as_deref(),
                market_caps.as_deref(),
                views.as_deref(),
                &linkage,
            )?;
            let outcome = kind.optimize(&loaded.returns)?;
            if is_json(&format) {
                print_outcome_json(&kind, &outcome);
            } else {
                print_outcome_text(&kind, &outcome, &loaded);
            }
        }
        Commands::Frontier {
            input,
            prices,
            points,
            risk_free_rate,
            lower_bound,
            upper_bound,
            format,
        } => {
            let loaded = load_table(&input, prices)?;
            let config = FrontierConfig {
                num_points: points,
                weight_bounds: (lower_bound, upper_bound),
                risk_free_rate,
                ..Default::default()
            };
            let frontier = EfficientFrontierBuilder::new(&loaded.returns, config)?.build()?;
            if is_json(&format) {
                println!("{}", serde_json::to_string_pretty(&frontier)?);
            } else {
                print_frontier_text(&frontier);
            }
        }
        Commands::Var {
            input,
            prices,
            weights,
            confidence,
            method,
            horizon,
            format,
        } => {
            let loaded = load_table(&input, prices)?;
            let weights = parse_weights(weights.as_deref(), &loaded.returns)?;
            let portfolio = loaded.returns.portfolio_returns(&weights)?;
            let method = parse_var_method(&method)?;
            let result = risk_result(&portfolio, confidence, method, horizon)?;
            if is_json(&format) {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Value at Risk");
                println!("=============\n");
                println!("  Method:      {:?}", result.method);
                println!("  Confidence:  {:.1}%", result.confidence_level * 100.0);
                println!("  Horizon:     {} period(s)", result.time_horizon);
                println!("  VaR:         {:>8.4}%", result.var * 100.0);
                println!("  CVaR:        {:>8.4}%", result.cvar * 100.0);
            }
        }
        Commands::Stress {
            input,
            prices,
            weights,
            confidence,
            format,
        } => {
            let loaded = load_table(&input, prices)?;
            let weights = parse_weights(weights.as_deref(), &loaded.returns)?;
            let scenarios = default_scenarios();
            let results = stress_test(&loaded.returns, &weights, &scenarios, confidence)?;
            if is_json(&format) {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("Stress Test ({:.1}% confidence)", confidence * 100.0);
                println!("==============================\n");
                for result in &results {
                    println!("  {:<18} VaR {:>8.4}%", result.scenario, result.var * 100.0);
                }
            }
        }
        Commands::Simulate {
            input,
            prices,
            weights,
            simulations,
            horizon,
            seed,
            initial,
            format,
        } => {
            let loaded = load_table(&input, prices)?;
            let weights = parse_weights(weights.as_deref(), &loaded.returns)?;
            let simulator = MonteCarloSimulator::new(MonteCarloConfig {
                num_simulations: simulations,
                time_horizon: horizon,
                seed,
                ..Default::default()
            })?;
            let result = simulator.run(&loaded.returns, &weights, initial)?;
            if is_json(&format) {
                print_simulation_json(&result, initial, simulations, horizon, seed);
            } else {
                print_simulation_text(&result, initial, simulations, horizon);
            }
        }
    }

    Ok(())
}

fn load_table(path: &Path, prices: bool) -> Result<LoadedReturns, Box<dyn std::error::Error>> {
    let loaded = if prices {
        load_prices_csv(path)?
    } else {
        load_returns_csv(path)?
    };
    Ok(loaded)
}

fn is_json(format: &str) -> bool {
    format.eq_ignore_ascii_case("json")
}

fn parse_list(raw: &str) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("bad number {:?}: {}", part.trim(), e).into())
        })
        .collect()
}

fn parse_weights(
    raw: Option<&str>,
    returns: &ReturnsMatrix,
) -> Result<PortfolioWeights, Box<dyn std::error::Error>> {
    match raw {
        None => Ok(PortfolioWeights::equal(returns.assets().to_vec())?),
        Some(raw) => {
            let values = Array1::from_vec(parse_list(raw)?);
            Ok(PortfolioWeights::new(returns.assets().to_vec(), values)?)
        }
    }
}

fn parse_var_method(name: &str) -> Result<VarMethod, Box<dyn std::error::Error>> {
    let method = match name.to_lowercase().as_str() {
        "historical" => VarMethod::Historical,
        "parametric" | "normal" => VarMethod::Parametric(TailDistribution::Normal),
        "parametric-t" | "student-t" => VarMethod::Parametric(TailDistribution::StudentT),
        "modified" | "cornish-fisher" => VarMethod::Modified,
        _ => return Err(format!("Unknown VaR method: {}", name).into()),
    };
    Ok(method)
}

fn parse_linkage(name: &str) -> Result<LinkageMethod, Box<dyn std::error::Error>> {
    let linkage = match name.to_lowercase().as_str() {
        "single" => LinkageMethod::Single,
        "complete" => LinkageMethod::Complete,
        "average" => LinkageMethod::Average,
        _ => return Err(format!("Unknown linkage method: {}", name).into()),
    };
    Ok(linkage)
}

#[allow(clippy::too_many_arguments)]
fn build_optimizer(
    method: &str,
    target_return: Option<f64>,
    target_volatility: Option<f64>,
    risk_free_rate: f64,
    weight_bounds: (f64, f64),
    risk_weights: Option<&str>,
    market_caps: Option<&str>,
    views: Option<&Path>,
    linkage: &str,
) -> Result<OptimizerKind, Box<dyn std::error::Error>> {
    let kind = match method.to_lowercase().as_str() {
        "mean-variance" | "mv" => OptimizerKind::MeanVariance(MeanVarianceConfig {
            weight_bounds,
            target_return,
            target_volatility,
            risk_free_rate,
            ..Default::default()
        }),
        "risk-parity" | "rp" => OptimizerKind::RiskParity(RiskParityConfig {
            risk_weights: risk_weights.map(parse_list).transpose()?,
            weight_bounds,
            risk_free_rate,
            ..Default::default()
        }),
        "black-litterman" | "bl" => {
            let views = match views {
                None => Vec::new(),
                Some(path) => {
                    let raw = std::fs::read_to_string(path)?;
                    serde_json::from_str::<Vec<InvestorView>>(&raw)?
                }
            };
            OptimizerKind::BlackLitterman(BlackLittermanConfig {
                market_caps: market_caps.map(parse_list).transpose()?,
                views,
                weight_bounds,
                risk_free_rate,
                ..Default::default()
            })
        }
        "hrp" | "hierarchical-risk-parity" => OptimizerKind::HierarchicalRiskParity(HrpConfig {
            linkage_method: parse_linkage(linkage)?,
            weight_bounds,
            risk_free_rate,
        }),
        _ => return Err(format!("Unknown optimization method: {}", method).into()),
    };
    Ok(kind)
}

fn print_outcome_text(kind: &OptimizerKind, outcome: &OptimizationOutcome, loaded: &LoadedReturns) {
    println!("\nPortfolio Optimization: {}", kind.name());
    println!("========================{}\n", "=".repeat(kind.name().len()));

    if let (Some(first), Some(last)) = (loaded.dates.first(), loaded.dates.last()) {
        println!(
            "  Data: {} assets, {} periods ({} to {})\n",
            loaded.returns.n_assets(),
            loaded.returns.n_periods(),
            first,
            last
        );
    }

    println!("  Weights:");
    for (asset, weight) in outcome.weights.iter() {
        println!("    {:<10} {:>7.2}%", asset, weight * 100.0);
    }

    let metrics = &outcome.metrics;
    println!("\n  Expected Return: {:>7.2}%", metrics.expected_return * 100.0);
    println!("  Volatility:      {:>7.2}%", metrics.volatility * 100.0);
    println!("  Sharpe Ratio:    {:>7.2}", metrics.sharpe_ratio);

    if let Some(contributions) = &outcome.risk_contributions {
        println!("\n  Risk Contributions:");
        for rc in contributions {
            println!("    {:<10} {:>7.2}%", rc.asset, rc.contribution_pct);
        }
    }

    if let Some(equilibrium) = &outcome.equilibrium_returns {
        println!("\n  Equilibrium Returns (periodic):");
        for entry in equilibrium {
            println!("    {:<10} {:>10.6}", entry.asset, entry.expected_return);
        }
    }
    println!();
}

fn print_outcome_json(kind: &OptimizerKind, outcome: &OptimizationOutcome) {
    let weights: serde_json::Map<String, serde_json::Value> = outcome
        .weights
        .iter()
        .map(|(asset, weight)| (asset.to_string(), json!(weight)))
        .collect();

    let mut output = json!({
        "method": kind.name(),
        "weights": weights,
        "metrics": outcome.metrics,
    });
    if let Some(contributions) = &outcome.risk_contributions {
        output["risk_contributions"] = json!(contributions);
    }
    if let Some(equilibrium) = &outcome.equilibrium_returns {
        output["equilibrium_returns"] = json!(equilibrium);
    }

    match serde_json::to_string_pretty(&output) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => eprintln!("Error: {}", e),
    }
}

fn print_frontier_text(frontier: &hobart_optimize::EfficientFrontier) {
    println!("Efficient Frontier ({} points)", frontier.points.len());
    println!("==============================\n");

    println!("  {:>4} {:>10} {:>10} {:>8}", "#", "Return", "Vol", "Sharpe");
    for (i, point) in frontier.points.iter().enumerate() {
        println!(
            "  {:>4} {:>9.2}% {:>9.2}% {:>8.2}",
            i + 1,
            point.expected_return * 100.0,
            point.volatility * 100.0,
            point.sharpe_ratio
        );
    }

    println!("\n  Named portfolios:");
    for (label, point) in [
        ("min-volatility", &frontier.min_volatility),
        ("max-return", &frontier.max_return),
        ("tangency", &frontier.tangency),
    ] {
        println!(
            "  {:<16} return {:>6.2}%  vol {:>6.2}%  sharpe {:>6.2}",
            label,
            point.expected_return * 100.0,
            point.volatility * 100.0,
            point.sharpe_ratio
        );
    }
}

fn print_simulation_text(
    result: &SimulationResult,
    initial: f64,
    simulations: usize,
    horizon: usize,
) {
    println!("Monte Carlo Simulation");
    println!("======================\n");
    println!("  Paths:            {}", simulations);
    println!("  Horizon:          {} period(s)", horizon);
    println!("  Initial Value:    {:.2}", initial);
    println!("  Expected Return:  {:>7.2}%", result.expected_return * 100.0);
    println!("  Volatility:       {:>7.2}%", result.volatility * 100.0);
    println!("  P(loss):          {:>7.2}%", result.probability_of_loss * 100.0);

    println!("\n  Confidence Intervals:");
    for interval in &result.confidence_intervals {
        println!(
            "    {:>4.0}%  [{:>14.2}, {:>14.2}]",
            interval.level * 100.0,
            interval.lower,
            interval.upper
        );
    }

    println!("\n  Simulated VaR / CVaR:");
    for entry in &result.value_at_risk {
        println!(
            "    {:>4.0}%  VaR {:>14.2}  CVaR {:>14.2}",
            entry.level * 100.0,
            entry.var,
            entry.cvar
        );
    }
}

fn print_simulation_json(
    result: &SimulationResult,
    initial: f64,
    simulations: usize,
    horizon: usize,
    seed: u64,
) {
    // Terminal values are omitted: ten thousand floats are not a report.
    let output = json!({
        "num_simulations": simulations,
        "time_horizon": horizon,
        "seed": seed,
        "initial_value": initial,
        "expected_return": result.expected_return,
        "volatility": result.volatility,
        "probability_of_loss": result.probability_of_loss,
        "confidence_intervals": result.confidence_intervals,
        "value_at_risk": result.value_at_risk,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => eprintln!("Error: {}", e),
    }
}
