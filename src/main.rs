//! Binary entry point for clinigraph.
//!
//! Builds the graph from one input file and prints the run summary as JSON
//! on stdout. Logs go to stderr.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::Parser;
use clinigraph::config::ClinigraphConfig;
use clinigraph::observability::{self, LoggingConfig};
use clinigraph::services::GraphPipeline;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Clinigraph - builds a 3D knowledge graph from clinical records.
#[derive(Parser)]
#[command(name = "clinigraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Delimited input file with a header row.
    input: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Graph store path.
    #[arg(long, env = "CLINIGRAPH_STORE_PATH")]
    store: Option<PathBuf>,

    /// Scene output path.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum records read from the input.
    #[arg(long)]
    sample_size: Option<usize>,

    /// Maximum edges sampled for the scene.
    #[arg(long)]
    edge_limit: Option<usize>,

    /// Layout seed.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match ClinigraphConfig::load(cli.config.as_deref()) {
        Ok(config) => apply_overrides(config, &cli),
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) =
        LoggingConfig::from_settings(&config.logging, cli.verbose).and_then(observability::init)
    {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match execute(config, cli.input.as_deref()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Message printed when no input file is given.
const NO_INPUT_MESSAGE: &str = "No file path provided";

/// Runs the command and returns what goes to stdout.
///
/// A missing input is not an error: the message is returned for stdout and
/// the process exits successfully.
fn execute(
    config: ClinigraphConfig,
    input: Option<&Path>,
) -> Result<String, Box<dyn std::error::Error>> {
    let Some(input) = input else {
        return Ok(NO_INPUT_MESSAGE.to_string());
    };
    let summary = GraphPipeline::new(config).run(input)?;
    Ok(serde_json::to_string(&summary)?)
}

fn apply_overrides(mut config: ClinigraphConfig, cli: &Cli) -> ClinigraphConfig {
    if let Some(store) = &cli.store {
        config = config.with_store_path(store.clone());
    }
    if let Some(output) = &cli.output {
        config = config.with_output_path(output.clone());
    }
    if let Some(sample_size) = cli.sample_size {
        config = config.with_sample_size(sample_size);
    }
    if let Some(edge_limit) = cli.edge_limit {
        config = config.with_edge_limit(edge_limit);
    }
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }
    config
}
