//! Dataset loading: corpus, queries, and ground truth.
//!
//! Records are JSON Lines. The corpus locator comes from the dataset; query
//! and ground-truth locators are derived from it by fixed suffix
//! substitution, so the three files always travel together:
//!
//! ```text
//! corpus.jsonl
//! corpus.queries.jsonl
//! corpus.ground_truth.jsonl
//! ```
//!
//! HTTP(S) locators are fetched with reqwest; anything else is treated as a
//! local path. Parsing runs on a blocking task so a large corpus does not
//! stall concurrently executing runs.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vectorbench_core::entities::Dataset;
use vectorbench_core::evaluate::GroundTruth;

/// File-extension marker replaced when deriving sibling locators.
const CORPUS_MARKER: &str = ".jsonl";
const QUERY_MARKER: &str = ".queries.jsonl";
const GROUND_TRUTH_MARKER: &str = ".ground_truth.jsonl";

/// One corpus or query record.
///
/// Multi-vector datasets carry named vectors as `<name>_vector` fields,
/// which land in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl DataRecord {
    /// Named vector field `<name>_vector`, if present and well-formed.
    pub fn named_vector(&self, name: &str) -> Option<Vec<f32>> {
        let value = self.extra.get(&format!("{}_vector", name))?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Ground-truth judgment for one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthRecord {
    pub query_id: usize,
    pub relevant_ids: Vec<u64>,
}

/// Load the full corpus records for a dataset.
pub async fn load_corpus(dataset: &Dataset, limit: Option<usize>) -> Result<Vec<DataRecord>> {
    load_from_uri(&dataset.source_uri, limit).await
}

/// Load query records for a dataset.
pub async fn load_queries(dataset: &Dataset, limit: Option<usize>) -> Result<Vec<DataRecord>> {
    load_from_uri(&derive_query_uri(&dataset.source_uri), limit).await
}

/// Load ground-truth judgments for a dataset, keyed by query index.
pub async fn load_ground_truth(dataset: &Dataset) -> Result<GroundTruth> {
    let uri = derive_ground_truth_uri(&dataset.source_uri);
    let records: Vec<GroundTruthRecord> = load_from_uri(&uri, None).await?;

    let relevant = records
        .into_iter()
        .map(|rec| (rec.query_id, rec.relevant_ids.into_iter().collect()))
        .collect();

    Ok(GroundTruth::new(relevant))
}

/// Derive the query-file locator from the corpus locator.
pub fn derive_query_uri(source_uri: &str) -> String {
    source_uri.replace(CORPUS_MARKER, QUERY_MARKER)
}

/// Derive the ground-truth locator from the corpus locator.
pub fn derive_ground_truth_uri(source_uri: &str) -> String {
    source_uri.replace(CORPUS_MARKER, GROUND_TRUTH_MARKER)
}

/// Load records from an HTTP(S) or local-path locator.
pub async fn load_from_uri<T>(uri: &str, limit: Option<usize>) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let text = if uri.starts_with("http://") || uri.starts_with("https://") {
        fetch_http(uri).await?
    } else {
        read_local(uri).await?
    };

    // CPU-bound parse off the I/O task.
    let limit = limit;
    tokio::task::spawn_blocking(move || parse_jsonl(&text, limit))
        .await
        .context("record parsing task panicked")?
}

async fn fetch_http(uri: &str) -> Result<String> {
    let response = reqwest::get(uri)
        .await
        .with_context(|| format!("failed to fetch {}", uri))?
        .error_for_status()
        .with_context(|| format!("server rejected {}", uri))?;
    response.text().await.context("failed to read response body")
}

async fn read_local(path: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path))
}

/// Parse newline-delimited JSON records, honoring an optional head limit.
fn parse_jsonl<T: DeserializeOwned>(text: &str, limit: Option<usize>) -> Result<Vec<T>> {
    let mut records = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        if let Some(limit) = limit {
            if records.len() >= limit {
                break;
            }
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line)
            .with_context(|| format!("malformed record at line {}", lineno + 1))?;
        records.push(record);
    }
    Ok(records)
}
