//! Collection provisioning and corpus seeding.
//!
//! Provisioning is delete-then-recreate: re-running an experiment always
//! rebuilds the collection from the experiment's current configuration
//! instead of layering points onto an old index. Seeding streams the corpus
//! in fixed-size batches (sequential, to bound memory) and each batch's
//! embedding call is internally batched by the embedder.
//!
//! The collection namespace is keyed by dataset name; concurrent runs over
//! experiments sharing a dataset will race on provisioning, which callers
//! are expected to avoid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info};

use vectorbench_core::entities::{Dataset, Experiment};

use crate::loader::{self, DataRecord};
use crate::ports::{Point, PointVectors, TextEmbedder, VectorDbClient};

/// Records per upsert batch.
pub const SEED_BATCH_SIZE: usize = 100;

/// Knobs for the seed-and-index phase.
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub batch_size: usize,
    /// Sleep between collection status polls.
    pub poll_interval: Duration,
    /// Bound on the wait for a healthy index; exceeding it fails the run.
    pub health_timeout: Duration,
    pub embedding_model: String,
}

impl Default for SeedOptions {
    fn default() -> Self {
        SeedOptions {
            batch_size: SEED_BATCH_SIZE,
            poll_interval: Duration::from_millis(500),
            health_timeout: Duration::from_secs(60),
            embedding_model: "default".to_string(),
        }
    }
}

impl SeedOptions {
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

/// (Re)create the experiment's collection, seed the corpus, and wait for a
/// healthy index. Returns elapsed wall time for the whole phase.
pub async fn provision_and_seed(
    client: &dyn VectorDbClient,
    embedder: &dyn TextEmbedder,
    experiment: &Experiment,
    dataset: &Dataset,
    options: &SeedOptions,
) -> Result<Duration> {
    let collection = dataset.name.as_str();
    let start = Instant::now();

    client.delete_collection(collection).await?;
    client
        .create_collection(
            collection,
            &experiment.vector_config,
            &experiment.optimizer_config,
        )
        .await?;

    let corpus = loader::load_corpus(dataset, None).await?;
    info!(
        collection,
        records = corpus.len(),
        "seeding corpus into collection"
    );

    let mut next_id: u64 = 0;
    for batch in corpus.chunks(options.batch_size.max(1)) {
        let points = build_points(embedder, experiment, batch, &mut next_id, options).await?;
        client.upsert_points(collection, points).await?;
        debug!(collection, upserted = next_id, "seeded batch");
    }

    // Force index construction regardless of the experiment's threshold,
    // then wait for the collection to report healthy.
    client.set_indexing_threshold(collection, 0).await?;
    wait_for_healthy(client, collection, options).await?;

    let elapsed = start.elapsed();
    info!(collection, elapsed_ms = elapsed.as_millis() as u64, "collection ready");
    Ok(elapsed)
}

/// Turn one corpus batch into points, embedding records that carry text but
/// no precomputed vector. Point ids default to corpus order.
async fn build_points(
    embedder: &dyn TextEmbedder,
    experiment: &Experiment,
    batch: &[DataRecord],
    next_id: &mut u64,
    options: &SeedOptions,
) -> Result<Vec<Point>> {
    let named_vectors: Vec<String> = experiment
        .vector_config
        .vectors
        .as_ref()
        .map(|v| v.keys().cloned().collect())
        .unwrap_or_default();

    // One embedding call per batch for all records that need it.
    let texts: Vec<String> = batch
        .iter()
        .filter(|rec| rec.vector.is_none() && named_vectors.is_empty())
        .filter_map(|rec| rec.text.clone())
        .collect();
    let embedded = if texts.is_empty() {
        Vec::new()
    } else {
        embedder
            .embed(&texts, &options.embedding_model)
            .await
            .context("corpus embedding failed")?
    };
    let mut embedded = embedded.into_iter();

    let mut points = Vec::with_capacity(batch.len());
    for record in batch {
        let id = record.id.unwrap_or(*next_id);
        *next_id = id + 1;

        let vector = if !named_vectors.is_empty() {
            let mut named = std::collections::HashMap::new();
            for name in &named_vectors {
                let vector = record.named_vector(name).with_context(|| {
                    format!("corpus record {} missing vector '{}'", id, name)
                })?;
                named.insert(name.clone(), vector);
            }
            PointVectors::Named(named)
        } else if let Some(vector) = &record.vector {
            PointVectors::Single(vector.clone())
        } else if record.text.is_some() {
            PointVectors::Single(
                embedded
                    .next()
                    .context("embedder returned fewer vectors than texts")?,
            )
        } else {
            anyhow::bail!("corpus record {} has neither vector nor text", id);
        };

        let mut payload = serde_json::Map::new();
        if let Some(text) = &record.text {
            payload.insert("text".to_string(), json!(text));
        }

        points.push(Point {
            id,
            vector,
            payload,
        });
    }

    Ok(points)
}

/// Poll collection status until healthy, bounded by the configured timeout.
async fn wait_for_healthy(
    client: &dyn VectorDbClient,
    collection: &str,
    options: &SeedOptions,
) -> Result<()> {
    let deadline = Instant::now() + options.health_timeout;

    loop {
        let status = client.collection_status(collection).await?;
        if status.is_healthy() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            anyhow::bail!(
                "collection '{}' did not reach a healthy state within {:?} (last status: {:?})",
                collection,
                options.health_timeout,
                status
            );
        }
        debug!(collection, ?status, "waiting for healthy index");
        tokio::time::sleep(options.poll_interval).await;
    }
}
