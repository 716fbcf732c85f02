//! Collaborator contracts for the execution engine.
//!
//! The engine drives everything through these traits so the workflow can be
//! exercised against fakes in tests and against live HTTP adapters in
//! production. All traits are object-safe; the executor holds `Arc<dyn _>`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use vectorbench_core::config::{OptimizerConfig, SearchParams, VectorConfig};
use vectorbench_core::entities::{Connection, Dataset, Experiment, Run, RunStatus};
use vectorbench_core::Id;

// ============================================================================
// Repositories
// ============================================================================

#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    async fn save(&self, connection: Connection) -> Result<Connection>;
    async fn get(&self, id: Id) -> Result<Option<Connection>>;
    async fn list(&self) -> Result<Vec<Connection>>;
}

#[async_trait]
pub trait DatasetRepository: Send + Sync {
    async fn save(&self, dataset: Dataset) -> Result<Dataset>;
    async fn get(&self, id: Id) -> Result<Option<Dataset>>;
    async fn list(&self) -> Result<Vec<Dataset>>;
}

#[async_trait]
pub trait ExperimentRepository: Send + Sync {
    async fn save(&self, experiment: Experiment) -> Result<Experiment>;
    async fn get(&self, id: Id) -> Result<Option<Experiment>>;
    async fn list(&self) -> Result<Vec<Experiment>>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn save(&self, run: Run) -> Result<Run>;
    async fn get(&self, id: Id) -> Result<Option<Run>>;
    /// List runs, optionally filtered by experiment and/or status.
    async fn list(&self, experiment_id: Option<Id>, status: Option<RunStatus>)
        -> Result<Vec<Run>>;
}

// ============================================================================
// Vector database client
// ============================================================================

/// Vector payload of one point: a single anonymous vector or named vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointVectors {
    Single(Vec<f32>),
    Named(HashMap<String, Vec<f32>>),
}

/// One record to upsert into a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub vector: PointVectors,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// One search hit, in result order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
}

/// Index health of a collection as reported by the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Green,
    Yellow,
    Grey,
    Red,
}

impl CollectionStatus {
    /// Whether the index is fully built and queryable.
    pub fn is_healthy(&self) -> bool {
        matches!(self, CollectionStatus::Green)
    }
}

/// One similarity query against a collection.
#[derive(Debug, Clone, Serialize)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    /// Named vector to query for multi-vector collections.
    pub using: Option<String>,
    pub limit: usize,
    pub score_threshold: Option<f32>,
    pub params: Option<SearchParams>,
}

/// Wire capability of the target vector database.
///
/// This mirrors the database's own protocol; the engine never reinterprets
/// it. `delete_collection` is idempotent: deleting an absent collection
/// succeeds.
#[async_trait]
pub trait VectorDbClient: Send + Sync {
    async fn create_collection(
        &self,
        name: &str,
        vectors: &VectorConfig,
        optimizers: &OptimizerConfig,
    ) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Rewrite the collection's optimizer indexing threshold in place.
    async fn set_indexing_threshold(&self, name: &str, threshold: u64) -> Result<()>;

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()>;

    async fn collection_status(&self, name: &str) -> Result<CollectionStatus>;

    /// Execute one query; results are ordered best-first.
    async fn search(&self, name: &str, query: &SearchQuery) -> Result<Vec<ScoredPoint>>;
}

/// Builds a database handle from a registered connection.
pub trait VectorDbConnector: Send + Sync {
    fn connect(&self, connection: &Connection) -> Result<Arc<dyn VectorDbClient>>;
}

// ============================================================================
// Embedding and telemetry
// ============================================================================

/// Maps text to vectors, one vector per input text, same order.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>>;
}

/// Resource-usage snapshot of the target cluster.
///
/// Infallible by contract: implementations degrade to an empty map on any
/// failure so telemetry can never abort an otherwise-successful run.
#[async_trait]
pub trait ClusterTelemetry: Send + Sync {
    async fn cluster_stats(&self, connection: &Connection) -> BTreeMap<String, f64>;
}
