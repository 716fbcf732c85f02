//! CLI command implementations for the benchmark harness.
//!
//! Commands operate on a scenario file: one JSON document declaring the
//! target connection, the dataset, and the experiment configuration. `run`
//! wires the in-memory repositories and live HTTP adapters together, so a
//! single process executes the whole workflow without external state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;

use vectorbench_core::config::{OptimizerConfig, VectorConfig};
use vectorbench_core::entities::{Connection, Dataset, Experiment, Run, RunStatus};
use vectorbench_core::generate::{
    GridGenerator, HeuristicGenerator, LlmGenerator, ParameterGenerator,
};
use vectorbench_core::validate::validate_vector_config;
use vectorbench_core::Id;

use vectorbench_engine::advisor::OpenAiAdvisor;
use vectorbench_engine::embedding::{DeterministicEmbedder, HttpEmbedder};
use vectorbench_engine::ports::{
    ConnectionRepository, DatasetRepository, ExperimentRepository, RunRepository, TextEmbedder,
};
use vectorbench_engine::qdrant::QdrantConnector;
use vectorbench_engine::repository::{
    InMemoryConnectionRepository, InMemoryDatasetRepository, InMemoryExperimentRepository,
    InMemoryRunRepository,
};
use vectorbench_engine::stats::HttpTelemetry;
use vectorbench_engine::{RunExecutor, RunTrigger, SeedOptions};

// ============================================================================
// Scenario file
// ============================================================================

/// One self-contained benchmark declaration.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub connection: Connection,
    pub dataset: Dataset,
    pub experiment: ExperimentSpec,
}

/// Experiment portion of a scenario; entity ids are assigned at load time.
#[derive(Debug, Deserialize)]
pub struct ExperimentSpec {
    #[serde(default = "default_experiment_name")]
    pub name: String,
    #[serde(default)]
    pub optimizer_config: OptimizerConfig,
    #[serde(default)]
    pub vector_config: VectorConfig,
}

fn default_experiment_name() -> String {
    "experiment".to_string()
}

pub fn load_scenario(path: &PathBuf) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("malformed scenario file {:?}", path))
}

/// Wire the scenario into a consistent entity graph with fresh ids.
pub fn assemble(scenario: Scenario) -> (Connection, Dataset, Experiment) {
    let mut connection = scenario.connection;
    connection.id = Id::new();
    let mut dataset = scenario.dataset;
    dataset.id = Id::new();

    let experiment = Experiment {
        id: Id::new(),
        name: scenario.experiment.name,
        dataset_id: dataset.id,
        connection_id: connection.id,
        optimizer_config: scenario.experiment.optimizer_config,
        vector_config: scenario.experiment.vector_config,
    };

    (connection, dataset, experiment)
}

// ============================================================================
// Validate Command
// ============================================================================

#[derive(Parser)]
pub struct ValidateArgs {
    /// Scenario file (JSON)
    #[arg(long)]
    pub scenario: PathBuf,
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    validate_vector_config(
        &scenario.experiment.vector_config,
        &scenario.dataset.schema_config,
    )?;

    println!(
        "Scenario '{}' is valid for dataset '{}'",
        scenario.experiment.name, scenario.dataset.name
    );
    Ok(())
}

// ============================================================================
// Run Command
// ============================================================================

#[derive(Parser)]
pub struct RunArgs {
    /// Scenario file (JSON)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Embedder for text-only corpora: deterministic, openai
    #[arg(long, default_value = "deterministic")]
    pub embedder: String,

    /// Vector dimension for the deterministic embedder
    #[arg(long, default_value = "384")]
    pub embedding_dim: usize,

    /// Base URL for the openai embedder (OPENAI_API_KEY supplies the key)
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub embedding_url: String,

    /// Embedding model name passed to the provider
    #[arg(long, default_value = "text-embedding-3-small")]
    pub embedding_model: String,

    /// Collection status poll interval (milliseconds)
    #[arg(long, default_value = "500")]
    pub poll_ms: u64,

    /// Bound on the wait for a healthy index (seconds)
    #[arg(long, default_value = "60")]
    pub health_timeout_secs: u64,

    /// Bound on the whole run (seconds)
    #[arg(long, default_value = "600")]
    pub run_timeout_secs: u64,
}

fn build_embedder(args: &RunArgs) -> Result<Arc<dyn TextEmbedder>> {
    match args.embedder.as_str() {
        "deterministic" => Ok(Arc::new(DeterministicEmbedder {
            dim: args.embedding_dim,
        })),
        "openai" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set for --embedder openai")?;
            Ok(Arc::new(HttpEmbedder::new(args.embedding_url.as_str(), api_key)))
        }
        other => anyhow::bail!("Unknown embedder: {}. Expected deterministic or openai.", other),
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    validate_vector_config(
        &scenario.experiment.vector_config,
        &scenario.dataset.schema_config,
    )?;
    let (connection, dataset, experiment) = assemble(scenario);

    println!("=== Benchmark Run ===");
    println!("Endpoint:   {}", connection.url);
    println!("Dataset:    {} ({})", dataset.name, dataset.source_uri);
    println!("Experiment: {}", experiment.name);

    let runs = Arc::new(InMemoryRunRepository::default());
    let experiments = Arc::new(InMemoryExperimentRepository::default());
    let datasets = Arc::new(InMemoryDatasetRepository::default());
    let connections = Arc::new(InMemoryConnectionRepository::default());

    connections.save(connection).await?;
    datasets.save(dataset).await?;
    let experiment = experiments.save(experiment).await?;

    let embedder = build_embedder(&args)?;
    let seed_options = SeedOptions::default()
        .with_poll_interval(Duration::from_millis(args.poll_ms))
        .with_health_timeout(Duration::from_secs(args.health_timeout_secs))
        .with_embedding_model(args.embedding_model.as_str());

    let executor = Arc::new(
        RunExecutor::new(
            runs.clone(),
            experiments.clone(),
            datasets.clone(),
            connections.clone(),
            Arc::new(QdrantConnector),
            embedder,
            Arc::new(HttpTelemetry::new()),
        )
        .with_seed_options(seed_options),
    );

    let trigger = RunTrigger::new(runs.clone(), experiments.clone());
    let run = trigger.trigger(experiment.id).await?;
    info!(run_id = %run.id, "run triggered");

    // Execution happens in the background; the CLI polls for a terminal state.
    let run_id = run.id;
    let handle = tokio::spawn({
        let executor = executor.clone();
        async move { executor.execute(run_id).await }
    });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.run_timeout_secs);
    let run = loop {
        let run = runs
            .get(run_id)
            .await?
            .context("run disappeared while executing")?;
        if run.status.is_terminal() {
            break run;
        }
        if tokio::time::Instant::now() >= deadline {
            anyhow::bail!("run {} still {} after {}s", run_id, run.status, args.run_timeout_secs);
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    };
    handle.await.context("executor task panicked")??;

    println!("\n=== Result: {} ===", run.status);
    for (metric, value) in &run.metrics {
        println!("  {:<22} {:.6}", metric, value);
    }

    if run.status != RunStatus::Completed {
        anyhow::bail!("run {} finished {}", run.id, run.status);
    }
    Ok(())
}

// ============================================================================
// Suggest Command
// ============================================================================

#[derive(Parser)]
pub struct SuggestArgs {
    /// Scenario file (JSON)
    #[arg(long)]
    pub scenario: PathBuf,

    /// Strategy: grid, heuristic, llm
    #[arg(long, default_value = "grid")]
    pub strategy: String,

    /// Number of configurations to propose
    #[arg(long, default_value = "1")]
    pub count: usize,

    /// Past runs as a JSON array, consulted by heuristic and llm strategies
    #[arg(long)]
    pub runs: Option<PathBuf>,

    /// Base URL for the llm strategy (OPENAI_API_KEY supplies the key)
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub advisor_url: String,

    /// Model name for the llm strategy
    #[arg(long, default_value = "gpt-4o-mini")]
    pub advisor_model: String,
}

fn build_generator(args: &SuggestArgs) -> Result<Box<dyn ParameterGenerator>> {
    match args.strategy.as_str() {
        "grid" => Ok(Box::new(GridGenerator::default())),
        "heuristic" => Ok(Box::new(HeuristicGenerator)),
        "llm" => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY must be set for --strategy llm")?;
            Ok(Box::new(LlmGenerator::new(OpenAiAdvisor::new(
                args.advisor_url.as_str(),
                api_key,
                args.advisor_model.as_str(),
            ))))
        }
        other => anyhow::bail!("Unknown strategy: {}. Expected grid, heuristic, or llm.", other),
    }
}

fn load_runs(path: &Option<PathBuf>) -> Result<Vec<Run>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read runs file {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("malformed runs file {:?}", path))
}

pub async fn suggest(args: SuggestArgs) -> Result<()> {
    let scenario = load_scenario(&args.scenario)?;
    let (_, _, base) = assemble(scenario);
    let previous_runs = load_runs(&args.runs)?;

    let mut generator = build_generator(&args)?;

    // Each suggestion becomes the base for the next, so a sequence walks the
    // parameter space instead of repeating one step.
    let mut current = base;
    for i in 1..=args.count.max(1) {
        let next = generator.suggest_next(&previous_runs, &current).await?;

        println!("--- suggestion {} ---", i);
        println!(
            "hnsw: m={} ef_construct={}",
            next.vector_config.hnsw_m(),
            next.vector_config.hnsw_ef_construct()
        );
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "optimizer_config": next.optimizer_config,
                "vector_config": next.vector_config,
            }))?
        );
        current = next;
    }

    Ok(())
}
