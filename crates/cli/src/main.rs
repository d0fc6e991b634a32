//! CareRoute CLI - patient assignment and graph algorithm comparison
//!
//! Loads a JSON dataset of patients and hospitals, builds the configured graph and
//! drives the assignment orchestrator from the terminal.

mod commands;
mod config;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use careroute::{AssignmentOrchestrator, EngineConfig, InMemoryRecordStore, RecordFilter};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::output::OutputHandler;

/// CareRoute - patient to hospital assignment engine
#[derive(Parser)]
#[command(name = "careroute")]
#[command(author = "CareRoute Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Assign patients to hospitals and compare graph algorithms")]
#[command(long_about = r#"
CareRoute assigns patients to hospitals under capacity and specialty constraints and
compares classical algorithms side by side on the same dataset.

Examples:
  careroute -d data.json patients --region Lima
  careroute -d data.json graph --topology radius --radius 25
  careroute -d data.json compare P-0001
  careroute -d data.json assign P-0001 --road
  careroute config --init
"#)]
struct Cli {
    /// Dataset JSON file with "patients" and "hospitals"
    #[arg(short, long, env = "CAREROUTE_DATASET", global = true)]
    dataset: Option<PathBuf>,

    /// Configuration file (defaults to ~/.careroute/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Graph topology: knn, radius or bipartite_knn
    #[arg(short, long, global = true)]
    topology: Option<String>,

    /// Neighbor count for knn and bipartite_knn
    #[arg(short, long, global = true)]
    k: Option<usize>,

    /// Connection radius in km for radius graphs
    #[arg(short, long, global = true)]
    radius: Option<f64>,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the configured graph
    Graph {
        /// List every edge
        #[arg(long)]
        edges: bool,
    },

    /// Benchmark every topology over the dataset
    Topologies,

    /// Run every algorithm for one patient
    Compare {
        /// Patient code
        patient: String,
    },

    /// Pick the final hospital for one patient
    Assign {
        /// Patient code
        patient: String,

        /// Also resolve the road distance to the chosen hospital
        #[arg(long)]
        road: bool,

        /// OpenRouteService API key
        #[arg(long, env = "ORS_API_KEY", hide_env_values = true)]
        ors_key: Option<String>,
    },

    /// List the hospitals nearest to a patient
    Nearest {
        /// Patient code
        patient: String,

        /// Number of hospitals to show
        #[arg(short = 'n', long, default_value = "5")]
        top: usize,
    },

    /// List patients
    Patients {
        /// Filter by region
        #[arg(long)]
        region: Option<String>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List hospitals
    Hospitals {
        /// Filter by region
        #[arg(long)]
        region: Option<String>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Configuration management
    Config {
        /// Write a default config file
        #[arg(long)]
        init: bool,
    },
}

fn record_filter(region: Option<String>, limit: Option<usize>) -> RecordFilter {
    let filter = match region {
        Some(region) => RecordFilter::in_region(region),
        None => RecordFilter::all(),
    };
    match limit {
        Some(limit) => filter.with_limit(limit),
        None => filter,
    }
}

fn load_store(cli: &Cli) -> Result<InMemoryRecordStore> {
    let path = cli
        .dataset
        .as_deref()
        .context("No dataset given; pass --dataset or set CAREROUTE_DATASET")?;
    Ok(InMemoryRecordStore::load(path)?)
}

fn open_orchestrator(
    cli: &Cli,
    config: EngineConfig,
) -> Result<AssignmentOrchestrator<InMemoryRecordStore>> {
    let mut orchestrator = AssignmentOrchestrator::new(load_store(cli)?, config)?;
    orchestrator.configure_graph(cli.topology.as_deref(), cli.k, cli.radius)?;
    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("careroute={0},careroute_cli={0},warn", log_level).into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let output = OutputHandler::new(cli.json);

    match run(&cli, &output).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        // Already reported by the command
        Err(e) if commands::is_not_found(&e) => Ok(ExitCode::from(commands::EXIT_NOT_FOUND)),
        Err(e) => Err(e),
    }
}

async fn run(cli: &Cli, output: &OutputHandler) -> Result<()> {
    let engine_config = config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Graph { edges } => {
            let orchestrator = open_orchestrator(cli, engine_config)?;
            commands::show_graph(&orchestrator, *edges, output)?;
        }
        Commands::Topologies => {
            let store = load_store(cli)?;
            commands::compare_topologies(&store, &engine_config, cli.k, cli.radius, output)?;
        }
        Commands::Compare { patient } => {
            let orchestrator = open_orchestrator(cli, engine_config)?;
            commands::compare(&orchestrator, patient, output)?;
        }
        Commands::Assign {
            patient,
            road,
            ors_key,
        } => {
            let resolver = if *road {
                let resolver =
                    commands::road_resolver(&engine_config.routing, ors_key.clone()).await?;
                if resolver.is_none() {
                    let message =
                        "No ORS API key; skipping road distance (set ORS_API_KEY or --ors-key)";
                    // Keep stdout parseable in JSON mode
                    if output.json {
                        tracing::warn!("{}", message);
                    } else {
                        output.print_warning(message);
                    }
                }
                resolver
            } else {
                None
            };
            let orchestrator = open_orchestrator(cli, engine_config)?;
            commands::assign(&orchestrator, patient, resolver.as_ref(), output).await?;
        }
        Commands::Nearest { patient, top } => {
            let store = load_store(cli)?;
            commands::nearest(&store, patient, *top, output)?;
        }
        Commands::Patients { region, limit } => {
            let store = load_store(cli)?;
            commands::list_patients(&store, &record_filter(region.clone(), *limit), output)?;
        }
        Commands::Hospitals { region, limit } => {
            let store = load_store(cli)?;
            commands::list_hospitals(&store, &record_filter(region.clone(), *limit), output)?;
        }
        Commands::Config { init } => {
            if *init {
                let path = cli.config.clone().unwrap_or_else(config::config_path);
                commands::init_config(&path, output)?;
            } else {
                commands::show_config(&engine_config, output)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_graph_flags() {
        let cli = Cli::parse_from([
            "careroute", "compare", "P1", "--topology", "radius", "-r", "25", "--json",
        ]);
        assert_eq!(cli.topology.as_deref(), Some("radius"));
        assert_eq!(cli.radius, Some(25.0));
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Compare { ref patient } if patient == "P1"));
    }

    #[test]
    fn test_record_filter() {
        let filter = record_filter(Some("Lima".to_string()), Some(2));
        assert_eq!(filter.region.as_deref(), Some("Lima"));
        assert_eq!(filter.limit, Some(2));
        assert_eq!(record_filter(None, None).limit, None);
    }
}
