//! End-to-end workflow test: register entities, validate the experiment,
//! trigger a run, execute it against the fake database, and assert the final
//! metric map. Mirrors the documented operator workflow, minus live HTTP.

mod common;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{FakeConnector, FakeTelemetry, FakeVectorDb, RecordingRunRepository};

use std::collections::BTreeMap;

use vectorbench_core::config::{
    Distance, OptimizerConfig, SchemaConfig, SchemaVector, VectorConfig, VectorSpec,
};
use vectorbench_core::entities::{Connection, Dataset, Experiment, RunStatus};
use vectorbench_core::validate::validate_vector_config;
use vectorbench_core::{evaluate, Id};

use vectorbench_engine::embedding::{deterministic_vector, DeterministicEmbedder};
use vectorbench_engine::loader;
use vectorbench_engine::ports::{
    ConnectionRepository, DatasetRepository, ExperimentRepository, PointVectors, RunRepository,
};
use vectorbench_engine::provision::{self, SeedOptions};
use vectorbench_engine::workload::{self, WorkloadConfig};
use vectorbench_engine::repository::{
    InMemoryConnectionRepository, InMemoryDatasetRepository, InMemoryExperimentRepository,
};
use vectorbench_engine::{RunExecutor, RunTrigger};

const DIM: usize = 8;

/// Three text-only corpus docs, two queries whose vectors are the exact
/// embeddings of docs 0 and 1, and matching ground truth.
fn write_dataset_files(dir: &Path) -> String {
    let corpus_path = dir.join("docs.jsonl");

    let mut corpus = std::fs::File::create(&corpus_path).unwrap();
    for i in 0..3 {
        writeln!(corpus, "{{\"text\": \"doc-{}\"}}", i).unwrap();
    }

    let mut queries = std::fs::File::create(dir.join("docs.queries.jsonl")).unwrap();
    for i in 0..2 {
        let vector = deterministic_vector(&format!("doc-{}", i), DIM);
        writeln!(queries, "{}", serde_json::json!({ "vector": vector })).unwrap();
    }

    let mut truth = std::fs::File::create(dir.join("docs.ground_truth.jsonl")).unwrap();
    writeln!(truth, "{{\"query_id\": 0, \"relevant_ids\": [0]}}").unwrap();
    writeln!(truth, "{{\"query_id\": 1, \"relevant_ids\": [1]}}").unwrap();

    corpus_path.to_string_lossy().into_owned()
}

fn schema() -> SchemaConfig {
    SchemaConfig {
        vector: Some(SchemaVector {
            dim: Some(DIM as u64),
            distance: Some(Distance::Cosine),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn vector_config() -> VectorConfig {
    VectorConfig {
        size: Some(DIM as u64),
        distance: Some(Distance::Cosine),
        ..Default::default()
    }
}

fn fast_seed_options() -> SeedOptions {
    SeedOptions::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_health_timeout(Duration::from_secs(2))
}

#[tokio::test]
async fn test_full_workflow_produces_completed_run_with_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let source_uri = write_dataset_files(dir.path());

    let runs = Arc::new(RecordingRunRepository::default());
    let experiments = Arc::new(InMemoryExperimentRepository::default());
    let datasets = Arc::new(InMemoryDatasetRepository::default());
    let connections = Arc::new(InMemoryConnectionRepository::default());

    // Register the entity graph.
    let connection = connections
        .save(Connection {
            id: Id::new(),
            name: "local".to_string(),
            url: "http://localhost:6333".to_string(),
            api_key: String::new(),
        })
        .await
        .unwrap();
    let dataset = datasets
        .save(Dataset {
            id: Id::new(),
            name: "docs".to_string(),
            source_uri,
            schema_config: schema(),
        })
        .await
        .unwrap();

    // The creation-time gate the CLI applies before persisting an experiment.
    let vector_config = vector_config();
    validate_vector_config(&vector_config, &dataset.schema_config).unwrap();

    let experiment = experiments
        .save(Experiment {
            id: Id::new(),
            name: "baseline".to_string(),
            dataset_id: dataset.id,
            connection_id: connection.id,
            optimizer_config: OptimizerConfig {
                indexing_threshold: Some(0),
                k: Some(3),
                query_count: Some(2),
                ..Default::default()
            },
            vector_config,
        })
        .await
        .unwrap();

    let db = Arc::new(FakeVectorDb::default());
    let executor = RunExecutor::new(
        runs.clone(),
        experiments.clone(),
        datasets.clone(),
        connections.clone(),
        Arc::new(FakeConnector(db.clone())),
        Arc::new(DeterministicEmbedder { dim: DIM }),
        Arc::new(FakeTelemetry),
    )
    .with_seed_options(fast_seed_options());

    let trigger = RunTrigger::new(runs.clone(), experiments.clone());
    let run = trigger.trigger(experiment.id).await.unwrap();
    executor.execute(run.id).await.unwrap();

    let run = runs.get(run.id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert!(run.end_time.is_some());
    assert_eq!(
        runs.status_history(),
        vec![RunStatus::Created, RunStatus::Running, RunStatus::Completed]
    );

    // k=3 over a 3-doc corpus returns everything, so recall is exactly 1.
    assert!((run.metrics["recall"] - 1.0).abs() < 1e-9);
    assert!((run.metrics["precision"] - 1.0 / 3.0).abs() < 1e-9);
    assert!(run.metrics["qps"] > 0.0);
    assert!(run.metrics.contains_key("p50_latency"));
    assert!(run.metrics.contains_key("p95_latency"));
    assert!(run.metrics.contains_key("p99_latency"));
    assert!(run.metrics.contains_key("indexing_duration_ms"));
    assert!(run.metrics["total_duration"] > 0.0);
    // Cluster telemetry is merged in alongside evaluation scores.
    assert_eq!(run.metrics["ram_usage"], 1024.0);

    // The collection was seeded with the whole corpus under the dataset name.
    let collections = db.collections.lock().unwrap();
    let collection = &collections["docs"];
    assert_eq!(collection.points.len(), 3);
    assert_eq!(collection.indexing_threshold, Some(0));
}

#[tokio::test]
async fn test_run_completes_after_transient_yellow_status() {
    let dir = tempfile::tempdir().unwrap();
    let source_uri = write_dataset_files(dir.path());

    let dataset = Dataset {
        id: Id::new(),
        name: "docs".to_string(),
        source_uri,
        schema_config: schema(),
    };
    let experiment = Experiment {
        id: Id::new(),
        name: "baseline".to_string(),
        dataset_id: dataset.id,
        connection_id: Id::new(),
        optimizer_config: OptimizerConfig::default(),
        vector_config: vector_config(),
    };

    // Two Yellow polls before Green, well inside the timeout.
    let db = FakeVectorDb::with_unhealthy_polls(2);
    let embedder = DeterministicEmbedder { dim: DIM };

    let elapsed = provision::provision_and_seed(
        &db,
        &embedder,
        &experiment,
        &dataset,
        &fast_seed_options(),
    )
    .await
    .unwrap();

    assert!(elapsed >= Duration::from_millis(10));
    assert_eq!(db.collections.lock().unwrap()["docs"].points.len(), 3);
}

/// Multi-vector fixture with one-hot vectors, so every cosine score is
/// exactly 1.0 or 0.0. Each query's `image_vector` points at doc i while its
/// `text_vector` points at a different doc, which makes the queried vector
/// observable from the result ids.
fn write_multi_vector_dataset(dir: &Path) -> String {
    let one_hot = |i: usize| {
        let mut v = vec![0.0f32; 4];
        v[i] = 1.0;
        v
    };

    let corpus_path = dir.join("multi.jsonl");
    let mut corpus = std::fs::File::create(&corpus_path).unwrap();
    for i in 0..3 {
        let line = serde_json::json!({
            "image_vector": one_hot(i),
            "text_vector": one_hot((i + 1) % 3),
        });
        writeln!(corpus, "{}", line).unwrap();
    }

    let mut queries = std::fs::File::create(dir.join("multi.queries.jsonl")).unwrap();
    for i in 0..2 {
        let line = serde_json::json!({
            "image_vector": one_hot(i),
            "text_vector": one_hot((i + 2) % 3),
        });
        writeln!(queries, "{}", line).unwrap();
    }

    let mut truth = std::fs::File::create(dir.join("multi.ground_truth.jsonl")).unwrap();
    writeln!(truth, "{{\"query_id\": 0, \"relevant_ids\": [0]}}").unwrap();
    writeln!(truth, "{{\"query_id\": 1, \"relevant_ids\": [1]}}").unwrap();

    corpus_path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_multi_vector_workload_queries_primary_named_vector() {
    let dir = tempfile::tempdir().unwrap();
    let source_uri = write_multi_vector_dataset(dir.path());

    let named_schema = |dim: u64| SchemaVector {
        dim: Some(dim),
        distance: Some(Distance::Cosine),
        ..Default::default()
    };
    let named_spec = |size: u64| VectorSpec {
        size: Some(size),
        distance: Some(Distance::Cosine),
        ..Default::default()
    };

    // BTreeMap keeps "image" before "text", making image the primary vector.
    let dataset = Dataset {
        id: Id::new(),
        name: "multi".to_string(),
        source_uri,
        schema_config: SchemaConfig {
            vectors: Some(BTreeMap::from([
                ("image".to_string(), named_schema(4)),
                ("text".to_string(), named_schema(4)),
            ])),
            ..Default::default()
        },
    };
    let experiment = Experiment {
        id: Id::new(),
        name: "multi".to_string(),
        dataset_id: dataset.id,
        connection_id: Id::new(),
        optimizer_config: OptimizerConfig {
            k: Some(1),
            query_count: Some(2),
            ..Default::default()
        },
        vector_config: VectorConfig {
            vectors: Some(BTreeMap::from([
                ("image".to_string(), named_spec(4)),
                ("text".to_string(), named_spec(4)),
            ])),
            ..Default::default()
        },
    };
    validate_vector_config(&experiment.vector_config, &dataset.schema_config).unwrap();

    let db = FakeVectorDb::default();
    let embedder = DeterministicEmbedder { dim: 4 };
    provision::provision_and_seed(&db, &embedder, &experiment, &dataset, &fast_seed_options())
        .await
        .unwrap();

    // Every seeded point carries both named vectors.
    {
        let collections = db.collections.lock().unwrap();
        let points = &collections["multi"].points;
        assert_eq!(points.len(), 3);
        for point in points {
            match &point.vector {
                PointVectors::Named(named) => {
                    assert!(named.contains_key("image"));
                    assert!(named.contains_key("text"));
                }
                other => panic!("expected named vectors, got {:?}", other),
            }
        }
    }

    let config = WorkloadConfig::from_optimizer(&experiment.optimizer_config);
    let result = workload::run_workload(&db, &dataset, &config).await.unwrap();

    // The image vector is queried: result i is doc i. Had the text vector
    // been used, query 0 would have hit doc 1 instead.
    assert_eq!(result.latencies.len(), 2);
    assert_eq!(result.predictions[0].len(), 1);
    assert_eq!(result.predictions[0][0].id, 0);
    assert_eq!(result.predictions[1][0].id, 1);

    let ground_truth = loader::load_ground_truth(&dataset).await.unwrap();
    let predictions: Vec<Vec<u64>> = result
        .predictions
        .iter()
        .map(|hits| hits.iter().map(|hit| hit.id).collect())
        .collect();
    let evaluation = evaluate::evaluate(&predictions, &ground_truth, &result.latencies);
    assert!((evaluation.scores["recall"] - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_provisioning_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source_uri = write_dataset_files(dir.path());

    let dataset = Dataset {
        id: Id::new(),
        name: "docs".to_string(),
        source_uri,
        schema_config: schema(),
    };
    let experiment = Experiment {
        id: Id::new(),
        name: "baseline".to_string(),
        dataset_id: dataset.id,
        connection_id: Id::new(),
        optimizer_config: OptimizerConfig::default(),
        vector_config: vector_config().with_hnsw(32, 300),
    };

    let db = FakeVectorDb::default();
    let embedder = DeterministicEmbedder { dim: DIM };
    let options = fast_seed_options();

    provision::provision_and_seed(&db, &embedder, &experiment, &dataset, &options)
        .await
        .unwrap();
    provision::provision_and_seed(&db, &embedder, &experiment, &dataset, &options)
        .await
        .unwrap();

    let collections = db.collections.lock().unwrap();
    let collection = &collections["docs"];
    // Re-provisioning rebuilds instead of accumulating points.
    assert_eq!(collection.points.len(), 3);
    assert_eq!(collection.vectors.hnsw_m(), 32);
    assert_eq!(collection.vectors.hnsw_ef_construct(), 300);
}
