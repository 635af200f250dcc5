mod cycle;
mod error;
mod settings;

use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use gt_core::NodeId;
use gt_graph::{GasState, Network, NetworkError, PortTag};
use gt_solver::{NetworkCall, NewtonSolver, Variator, VariatorSolver};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::cycle::{Stations, Targets};
use crate::error::CliResult;
use crate::settings::SolveSettings;

#[derive(Parser)]
#[command(name = "gt-cli")]
#[command(about = "Gas-turbine cycle demos for the relaxation and Newton engines", long_about = None)]
struct Cli {
    /// YAML file with `relax`, `newton` and `cycle` sections
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relax a recuperated cycle closed by a cycle breaker
    Recuperated,
    /// Solve for air flow and turbine inlet temperature meeting two targets
    Balance {
        /// Net shaft power in kW
        #[arg(long, default_value_t = 1600.0)]
        power_kw: f64,
        /// Turbine exhaust temperature in K
        #[arg(long, default_value_t = 850.0)]
        exhaust_k: f64,
    },
    /// Print the effective settings as YAML
    Settings,
}

#[derive(Debug, Clone, Serialize)]
struct CycleSummary {
    converged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    relax_passes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    newton_iterations: Option<usize>,
    residual: f64,
    mass_flow_kgps: f64,
    turbine_inlet_k: f64,
    stack_k: f64,
    fuel_air_ratio: f64,
    net_power_kw: f64,
    thermal_efficiency: f64,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => SolveSettings::load(path)?,
        None => SolveSettings::default(),
    };

    match cli.command {
        Commands::Recuperated => {
            let summary = run_recuperated(&settings)?;
            emit(&summary, cli.json)
        }
        Commands::Balance {
            power_kw,
            exhaust_k,
        } => {
            let targets = Targets {
                power: power_kw * 1e3,
                exhaust_temperature: exhaust_k,
            };
            let summary = run_balance(&settings, targets)?;
            emit(&summary, cli.json)
        }
        Commands::Settings => {
            print!("{}", serde_yaml::to_string(&settings)?);
            Ok(())
        }
    }
}

fn run_recuperated(settings: &SolveSettings) -> CliResult<CycleSummary> {
    settings.validate()?;
    let (mut net, stations) = cycle::recuperated(&settings.cycle)?;
    let report = net.solve(&settings.relax)?;

    let mut summary = summarize(&net, &stations, settings.cycle.mass_flow)?;
    summary.converged = report.converged;
    summary.relax_passes = Some(report.iterations);
    summary.residual = report.residual;
    Ok(summary)
}

fn run_balance(settings: &SolveSettings, targets: Targets) -> CliResult<CycleSummary> {
    settings.validate()?;
    let scheme = cycle::balance(&settings.cycle, targets)?;
    let variators = vec![
        Variator::from_cell("mass_flow", Rc::clone(&scheme.mass_flow)),
        Variator::from_cell(
            "turbine_inlet_temperature",
            Rc::clone(&scheme.turbine_inlet_temperature),
        ),
    ];
    // step scaled to each seed's magnitude
    let steps = variators
        .iter()
        .map(|v| settings.newton.step * v.get().abs().max(1.0))
        .collect();

    let call = NetworkCall::new(scheme.net, scheme.residuals, "out", settings.relax)?;
    let mut solver = VariatorSolver::new(variators, call, NewtonSolver::new(steps)?);
    let report = solver.solve_with(&settings.newton)?;
    let net = solver.into_call().into_network();

    let mut summary = summarize(&net, &scheme.stations, scheme.mass_flow.get())?;
    summary.converged = true;
    summary.newton_iterations = Some(report.iterations);
    summary.residual = report.residual_norm;
    Ok(summary)
}

fn gas(net: &Network, node: NodeId, tag: PortTag) -> CliResult<GasState> {
    let state = net
        .state(node, tag)?
        .ok_or(NetworkError::EmptyPort { node, tag })?;
    Ok(*state.as_gas()?)
}

fn summarize(net: &Network, stations: &Stations, air_flow: f64) -> CliResult<CycleSummary> {
    let hot = gas(net, stations.burner, "out")?;
    let stack = gas(net, stations.stack.0, stations.stack.1)?;
    let power = net
        .state(stations.shaft, "net")?
        .ok_or(NetworkError::EmptyPort {
            node: stations.shaft,
            tag: "net",
        })?
        .as_scalar()?;
    let far = hot.fuel_air_ratio.value;

    Ok(CycleSummary {
        converged: false,
        relax_passes: None,
        newton_iterations: None,
        residual: f64::NAN,
        mass_flow_kgps: air_flow,
        turbine_inlet_k: hot.temperature.value,
        stack_k: stack.temperature.value,
        fuel_air_ratio: far,
        net_power_kw: power / 1e3,
        thermal_efficiency: cycle::thermal_efficiency(power, air_flow, far),
    })
}

fn emit(summary: &CycleSummary, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    match (summary.relax_passes, summary.newton_iterations) {
        (_, Some(n)) => println!("✓ Balanced in {n} Newton iterations"),
        (Some(n), None) if summary.converged => println!("✓ Converged in {n} passes"),
        (Some(n), None) => println!("✗ Not converged after {n} passes"),
        (None, None) => {}
    }
    println!("  Residual:            {:.3e}", summary.residual);
    println!("  Air flow:            {:.3} kg/s", summary.mass_flow_kgps);
    println!("  Turbine inlet:       {:.1} K", summary.turbine_inlet_k);
    println!("  Stack:               {:.1} K", summary.stack_k);
    println!("  Fuel/air ratio:      {:.5}", summary.fuel_air_ratio);
    println!("  Net power:           {:.1} kW", summary.net_power_kw);
    println!("  Thermal efficiency:  {:.2} %", summary.thermal_efficiency * 100.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recuperated_summary_is_plausible() {
        let s = run_recuperated(&SolveSettings::default()).unwrap();
        assert!(s.converged);
        assert!(s.net_power_kw > 0.0);
        assert!(s.thermal_efficiency > 0.0 && s.thermal_efficiency < 1.0);
        assert_eq!(s.turbine_inlet_k, 1200.0);
    }

    #[test]
    fn balance_meets_both_targets() {
        let targets = Targets {
            power: 1.6e6,
            exhaust_temperature: 850.0,
        };
        let s = run_balance(&SolveSettings::default(), targets).unwrap();
        assert!((s.net_power_kw - 1600.0).abs() < 1e-3);
        assert!((s.stack_k - 850.0).abs() < 1e-4);
        assert!(s.turbine_inlet_k < 1200.0);
    }

    #[test]
    fn invalid_settings_stop_the_run() {
        let mut settings = SolveSettings::default();
        settings.cycle.turbine_efficiency = 1.5;
        assert!(run_recuperated(&settings).is_err());
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gt-cli", "balance", "--power-kw", "900", "--json"]).unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Balance { power_kw, .. } if power_kw == 900.0
        ));
    }
}
