//! Vector database benchmarking CLI.
//!
//! Drives a benchmark scenario end to end against a Qdrant-compatible
//! endpoint: provision a collection, seed the corpus, run a timed query
//! workload, and report recall/latency/throughput metrics.
//!
//! ## Commands
//!
//! ```bash
//! # Validate a scenario's experiment config against its dataset schema
//! vectorbench validate --scenario scenario.json
//!
//! # Execute a scenario and print the metric table
//! vectorbench run --scenario scenario.json
//!
//! # Propose follow-up configurations from past run results
//! vectorbench suggest --scenario scenario.json --strategy grid --count 5
//! vectorbench suggest --scenario scenario.json --strategy heuristic --runs runs.json
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "vectorbench")]
#[command(version, about = "Vector database benchmark harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a scenario's vector config against its dataset schema
    Validate(commands::ValidateArgs),

    /// Execute a scenario: provision, seed, query, evaluate
    Run(commands::RunArgs),

    /// Suggest the next experiment configuration(s)
    Suggest(commands::SuggestArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    vectorbench_core::telemetry::init_dev_subscriber_with_env_filter();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate(args) => commands::validate(args),
        Commands::Run(args) => commands::run(args).await,
        Commands::Suggest(args) => commands::suggest(args).await,
    }
}
