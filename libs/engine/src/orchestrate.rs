//! End-to-end experiment workflow.
//!
//! Pure composition over resolved entities and a live database handle:
//! provision and seed the collection, run the timed workload, score it
//! against ground truth, merge in cluster telemetry, and return the final
//! metric map. Failures from any sub-step propagate unmodified — the run
//! executor is the single place that translates them into a terminal run
//! status.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use vectorbench_core::entities::{Connection, Dataset, Experiment};
use vectorbench_core::evaluate;

use crate::loader;
use crate::ports::{ClusterTelemetry, TextEmbedder, VectorDbClient};
use crate::provision::{self, SeedOptions};
use crate::workload::{self, WorkloadConfig};

/// Execute one experiment against a live database handle.
///
/// Returns the merged metric map: evaluation scores, telemetry fields,
/// indexing duration in milliseconds, and total workload duration.
pub async fn run_experiment(
    client: &dyn VectorDbClient,
    embedder: &dyn TextEmbedder,
    telemetry: &dyn ClusterTelemetry,
    experiment: &Experiment,
    dataset: &Dataset,
    connection: &Connection,
    seed_options: &SeedOptions,
) -> Result<BTreeMap<String, f64>> {
    let indexing = provision::provision_and_seed(
        client,
        embedder,
        experiment,
        dataset,
        seed_options,
    )
    .await?;

    let config = WorkloadConfig::from_optimizer(&experiment.optimizer_config);
    let result = workload::run_workload(client, dataset, &config).await?;

    let ground_truth = loader::load_ground_truth(dataset).await?;
    let predictions: Vec<Vec<u64>> = result
        .predictions
        .iter()
        .map(|hits| hits.iter().map(|hit| hit.id).collect())
        .collect();
    let evaluation = evaluate::evaluate(&predictions, &ground_truth, &result.latencies);

    // Best-effort: an unreachable telemetry endpoint contributes nothing.
    let cluster_stats = telemetry.cluster_stats(connection).await;

    let mut metrics = evaluation.scores;
    metrics.extend(cluster_stats);
    metrics.insert(
        "indexing_duration_ms".to_string(),
        indexing.as_millis() as f64,
    );
    metrics.insert("total_duration".to_string(), result.total_duration);

    info!(
        experiment = %experiment.name,
        recall = metrics.get("recall").copied().unwrap_or(0.0),
        qps = metrics.get("qps").copied().unwrap_or(0.0),
        "experiment workflow completed"
    );

    Ok(metrics)
}
