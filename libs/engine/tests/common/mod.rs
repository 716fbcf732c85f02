//! Shared fakes for engine integration tests.
//!
//! `FakeVectorDb` is a small in-memory stand-in for the target database:
//! collections are maps of points and search is brute-force cosine, which is
//! exact for the tiny corpora used in tests.

// Not every test binary uses every fake.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use vectorbench_core::config::{OptimizerConfig, VectorConfig};
use vectorbench_core::entities::{Connection, Run, RunStatus};
use vectorbench_core::Id;

use vectorbench_engine::ports::{
    ClusterTelemetry, CollectionStatus, Point, PointVectors, RunRepository, ScoredPoint,
    SearchQuery, VectorDbClient, VectorDbConnector,
};
use vectorbench_engine::repository::InMemoryRunRepository;

#[derive(Debug, Clone)]
pub struct FakeCollection {
    pub vectors: VectorConfig,
    pub optimizers: OptimizerConfig,
    pub points: Vec<Point>,
    pub indexing_threshold: Option<u64>,
}

/// In-memory vector database with brute-force cosine search.
#[derive(Default)]
pub struct FakeVectorDb {
    pub collections: Mutex<HashMap<String, FakeCollection>>,
    /// Number of status polls that report Yellow before Green.
    pub unhealthy_polls: AtomicUsize,
    /// When set, every status poll reports Yellow (health never arrives).
    pub never_healthy: bool,
    /// When set, every search fails.
    pub fail_search: bool,
}

impl FakeVectorDb {
    pub fn with_unhealthy_polls(polls: usize) -> Self {
        let db = FakeVectorDb::default();
        db.unhealthy_polls.store(polls, Ordering::SeqCst);
        db
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn point_vector<'a>(point: &'a Point, using: &Option<String>) -> Option<&'a Vec<f32>> {
    match (&point.vector, using) {
        (PointVectors::Single(v), None) => Some(v),
        (PointVectors::Named(named), Some(name)) => named.get(name),
        (PointVectors::Named(named), None) => named.values().next(),
        (PointVectors::Single(v), Some(_)) => Some(v),
    }
}

#[async_trait]
impl VectorDbClient for FakeVectorDb {
    async fn create_collection(
        &self,
        name: &str,
        vectors: &VectorConfig,
        optimizers: &OptimizerConfig,
    ) -> Result<()> {
        self.collections.lock().unwrap().insert(
            name.to_string(),
            FakeCollection {
                vectors: vectors.clone(),
                optimizers: optimizers.clone(),
                points: Vec::new(),
                indexing_threshold: optimizers.indexing_threshold,
            },
        );
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        // Idempotent: deleting an absent collection succeeds.
        self.collections.lock().unwrap().remove(name);
        Ok(())
    }

    async fn set_indexing_threshold(&self, name: &str, threshold: u64) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("collection '{}' not found", name))?;
        collection.indexing_threshold = Some(threshold);
        Ok(())
    }

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()> {
        let mut collections = self.collections.lock().unwrap();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("collection '{}' not found", name))?;
        for point in points {
            collection.points.retain(|p| p.id != point.id);
            collection.points.push(point);
        }
        Ok(())
    }

    async fn collection_status(&self, _name: &str) -> Result<CollectionStatus> {
        if self.never_healthy {
            return Ok(CollectionStatus::Yellow);
        }
        let remaining = self.unhealthy_polls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.unhealthy_polls.store(remaining - 1, Ordering::SeqCst);
            return Ok(CollectionStatus::Yellow);
        }
        Ok(CollectionStatus::Green)
    }

    async fn search(&self, name: &str, query: &SearchQuery) -> Result<Vec<ScoredPoint>> {
        if self.fail_search {
            anyhow::bail!("search backend unavailable");
        }
        let collections = self.collections.lock().unwrap();
        let collection = collections
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("collection '{}' not found", name))?;

        let mut hits: Vec<ScoredPoint> = collection
            .points
            .iter()
            .filter_map(|point| {
                let vector = point_vector(point, &query.using)?;
                Some(ScoredPoint {
                    id: point.id,
                    score: cosine_similarity(vector, &query.vector),
                })
            })
            .filter(|hit| query.score_threshold.map_or(true, |t| hit.score >= t))
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        hits.truncate(query.limit);
        Ok(hits)
    }
}

/// Connector handing out a shared fake database.
pub struct FakeConnector(pub Arc<FakeVectorDb>);

impl VectorDbConnector for FakeConnector {
    fn connect(&self, _connection: &Connection) -> Result<Arc<dyn VectorDbClient>> {
        Ok(self.0.clone())
    }
}

/// Connector for an unreachable database.
pub struct UnreachableConnector;

impl VectorDbConnector for UnreachableConnector {
    fn connect(&self, connection: &Connection) -> Result<Arc<dyn VectorDbClient>> {
        anyhow::bail!("connection refused: {}", connection.url)
    }
}

/// Telemetry fake returning fixed stats.
pub struct FakeTelemetry;

#[async_trait]
impl ClusterTelemetry for FakeTelemetry {
    async fn cluster_stats(&self, _connection: &Connection) -> BTreeMap<String, f64> {
        let mut stats = BTreeMap::new();
        stats.insert("ram_usage".to_string(), 1024.0);
        stats.insert("cpu_usage".to_string(), 0.25);
        stats
    }
}

/// Run repository that records every persisted status, in order.
#[derive(Default)]
pub struct RecordingRunRepository {
    inner: InMemoryRunRepository,
    pub history: Mutex<Vec<RunStatus>>,
}

impl RecordingRunRepository {
    pub fn status_history(&self) -> Vec<RunStatus> {
        self.history.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunRepository for RecordingRunRepository {
    async fn save(&self, run: Run) -> Result<Run> {
        self.history.lock().unwrap().push(run.status);
        self.inner.save(run).await
    }

    async fn get(&self, id: Id) -> Result<Option<Run>> {
        self.inner.get(id).await
    }

    async fn list(
        &self,
        experiment_id: Option<Id>,
        status: Option<RunStatus>,
    ) -> Result<Vec<Run>> {
        self.inner.list(experiment_id, status).await
    }
}
