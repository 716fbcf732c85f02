//! Timed query workload execution.
//!
//! Issues a batch of similarity queries against a provisioned collection,
//! timing each query individually and the batch as a whole. Queries run
//! concurrently but results come back in input order, so prediction `i`
//! always pairs with ground-truth entry `i`. Any single query failure fails
//! the whole batch; the run executor decides what that means for the run.

use anyhow::{Context, Result};
use futures::future::FutureExt;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;
use tracing::info;

use vectorbench_core::config::OptimizerConfig;
use vectorbench_core::entities::Dataset;

use crate::loader;
use crate::ports::{ScoredPoint, SearchQuery, VectorDbClient};

/// Query-batch parameters, derived from an experiment's optimizer config.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub k: usize,
    pub query_count: usize,
    pub score_threshold: Option<f32>,
    pub search_params: Option<vectorbench_core::config::SearchParams>,
    /// Optional cap on in-flight queries; `None` fires the whole batch at once.
    pub max_concurrency: Option<usize>,
}

impl WorkloadConfig {
    pub fn from_optimizer(optimizer: &OptimizerConfig) -> Self {
        WorkloadConfig {
            k: optimizer.k(),
            query_count: optimizer.query_count(),
            score_threshold: optimizer.score_threshold,
            search_params: optimizer.search_params.clone(),
            max_concurrency: None,
        }
    }

    pub fn with_max_concurrency(mut self, cap: usize) -> Self {
        self.max_concurrency = Some(cap);
        self
    }
}

/// Outcome of one query batch: per-query result sets and latencies in query
/// order, plus total wall time. Transient; consumed by evaluation.
#[derive(Debug, Clone)]
pub struct WorkloadResult {
    pub predictions: Vec<Vec<ScoredPoint>>,
    pub latencies: Vec<f64>,
    pub total_duration: f64,
}

/// Load query vectors and execute the timed batch against the collection.
///
/// Multi-vector datasets query the primary (first declared) named vector.
pub async fn run_workload(
    client: &dyn VectorDbClient,
    dataset: &Dataset,
    config: &WorkloadConfig,
) -> Result<WorkloadResult> {
    let collection = dataset.name.as_str();
    let vector_names = dataset.schema_config.vector_names();
    let primary = vector_names.first().cloned();

    let records = loader::load_queries(dataset, Some(config.query_count)).await?;
    let vectors: Vec<Vec<f32>> = records
        .iter()
        .filter_map(|rec| match &primary {
            Some(name) => rec.named_vector(name),
            None => rec.vector.clone(),
        })
        .collect();

    anyhow::ensure!(
        !vectors.is_empty(),
        "no queries loaded from dataset {}",
        dataset.name
    );

    let queries: Vec<SearchQuery> = vectors
        .into_iter()
        .map(|vector| SearchQuery {
            vector,
            using: primary.clone(),
            limit: config.k,
            score_threshold: config.score_threshold,
            params: config.search_params.clone(),
        })
        .collect();

    info!(
        collection,
        queries = queries.len(),
        k = config.k,
        "executing query workload"
    );
    execute_search_batch(client, collection, &queries, config.max_concurrency).await
}

/// Fire the batch concurrently and collect order-preserving timings.
pub async fn execute_search_batch(
    client: &dyn VectorDbClient,
    collection: &str,
    queries: &[SearchQuery],
    max_concurrency: Option<usize>,
) -> Result<WorkloadResult> {
    let batch_start = Instant::now();

    // Futures are boxed and collected eagerly so neither the async block
    // type nor the mapping closure is held across an await; otherwise
    // rustc's auto-trait check rejects the surrounding future with a
    // spurious higher-ranked lifetime error (rust-lang/rust#102211).
    // Collecting is lazy in effect: no future runs until polled below.
    let searches: Vec<_> = queries.iter().map(|query| {
        FutureExt::boxed(async move {
            let start = Instant::now();
            let prediction = client
                .search(collection, query)
                .await
                .context("workload query failed")?;
            Ok::<_, anyhow::Error>((prediction, start.elapsed().as_secs_f64()))
        })
    })
    .collect();

    // Both paths preserve input order in the output.
    let results: Vec<(Vec<ScoredPoint>, f64)> = match max_concurrency {
        Some(cap) => {
            stream::iter(searches)
                .buffered(cap.max(1))
                .try_collect()
                .await?
        }
        None => futures::future::try_join_all(searches).await?,
    };

    let total_duration = batch_start.elapsed().as_secs_f64();
    let (predictions, latencies) = results.into_iter().unzip();

    Ok(WorkloadResult {
        predictions,
        latencies,
        total_duration,
    })
}
