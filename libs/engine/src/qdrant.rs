//! HTTP adapter for a Qdrant-compatible vector database.
//!
//! Thin mapping from the [`VectorDbClient`] capability onto the database's
//! REST protocol; no protocol semantics live here. Authentication uses the
//! connection's `api-key` header when a credential is present.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::debug;

use vectorbench_core::config::{Distance, OptimizerConfig, VectorConfig, VectorSpec};
use vectorbench_core::entities::Connection;

use crate::ports::{
    CollectionStatus, Point, PointVectors, ScoredPoint, SearchQuery, VectorDbClient,
    VectorDbConnector,
};

/// REST client for one database endpoint.
#[derive(Debug, Clone)]
pub struct QdrantHttpClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl QdrantHttpClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        QdrantHttpClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.header("api-key", &self.api_key)
        }
    }
}

/// Wire body for one vector space.
fn vector_params(size: Option<u64>, distance: Option<Distance>, hnsw: Option<&Value>) -> Value {
    let mut params = Map::new();
    if let Some(size) = size {
        params.insert("size".to_string(), json!(size));
    }
    params.insert(
        "distance".to_string(),
        serde_json::to_value(distance.unwrap_or_default()).unwrap_or(Value::Null),
    );
    if let Some(hnsw) = hnsw {
        params.insert("hnsw_config".to_string(), hnsw.clone());
    }
    Value::Object(params)
}

fn spec_params(spec: &VectorSpec) -> Value {
    let hnsw = spec
        .hnsw_config
        .as_ref()
        .and_then(|h| serde_json::to_value(h).ok());
    vector_params(spec.size, spec.distance, hnsw.as_ref())
}

/// Wire body for the collection's `vectors` field: anonymous or named map.
fn vectors_body(config: &VectorConfig) -> Value {
    if let Some(named) = &config.vectors {
        let map: Map<String, Value> = named
            .iter()
            .map(|(name, spec)| (name.clone(), spec_params(spec)))
            .collect();
        return Value::Object(map);
    }

    let hnsw = config
        .hnsw_config
        .as_ref()
        .and_then(|h| serde_json::to_value(h).ok());
    vector_params(config.size, config.distance, hnsw.as_ref())
}

#[async_trait]
impl VectorDbClient for QdrantHttpClient {
    async fn create_collection(
        &self,
        name: &str,
        vectors: &VectorConfig,
        optimizers: &OptimizerConfig,
    ) -> Result<()> {
        let mut body = Map::new();
        body.insert("vectors".to_string(), vectors_body(vectors));
        if let Some(threshold) = optimizers.indexing_threshold {
            body.insert(
                "optimizers_config".to_string(),
                json!({ "indexing_threshold": threshold }),
            );
        }

        debug!(collection = name, "creating collection");
        self.request(self.http.put(self.url(&format!("/collections/{}", name))))
            .json(&Value::Object(body))
            .send()
            .await
            .with_context(|| format!("create collection '{}' request failed", name))?
            .error_for_status()
            .with_context(|| format!("create collection '{}' rejected", name))?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let response = self
            .request(self.http.delete(self.url(&format!("/collections/{}", name))))
            .send()
            .await
            .with_context(|| format!("delete collection '{}' request failed", name))?;

        // Absence is success: provisioning always starts from a clean slate.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response
            .error_for_status()
            .with_context(|| format!("delete collection '{}' rejected", name))?;
        Ok(())
    }

    async fn set_indexing_threshold(&self, name: &str, threshold: u64) -> Result<()> {
        self.request(self.http.patch(self.url(&format!("/collections/{}", name))))
            .json(&json!({ "optimizers_config": { "indexing_threshold": threshold } }))
            .send()
            .await
            .context("indexing threshold update failed")?
            .error_for_status()
            .context("indexing threshold update rejected")?;
        Ok(())
    }

    async fn upsert_points(&self, name: &str, points: Vec<Point>) -> Result<()> {
        let wire_points: Vec<Value> = points
            .iter()
            .map(|p| {
                let vector = match &p.vector {
                    PointVectors::Single(v) => json!(v),
                    PointVectors::Named(named) => json!(named),
                };
                json!({ "id": p.id, "vector": vector, "payload": p.payload })
            })
            .collect();

        self.request(
            self.http
                .put(self.url(&format!("/collections/{}/points?wait=true", name))),
        )
        .json(&json!({ "points": wire_points }))
        .send()
        .await
        .with_context(|| format!("upsert into '{}' failed", name))?
        .error_for_status()
        .with_context(|| format!("upsert into '{}' rejected", name))?;
        Ok(())
    }

    async fn collection_status(&self, name: &str) -> Result<CollectionStatus> {
        let body: Value = self
            .request(self.http.get(self.url(&format!("/collections/{}", name))))
            .send()
            .await
            .with_context(|| format!("status fetch for '{}' failed", name))?
            .error_for_status()
            .with_context(|| format!("status fetch for '{}' rejected", name))?
            .json()
            .await
            .context("malformed collection info response")?;

        let status = body
            .pointer("/result/status")
            .cloned()
            .with_context(|| format!("collection info for '{}' missing status", name))?;
        serde_json::from_value(status).context("unrecognized collection status")
    }

    async fn search(&self, name: &str, query: &SearchQuery) -> Result<Vec<ScoredPoint>> {
        let mut body = Map::new();
        body.insert("query".to_string(), json!(query.vector));
        body.insert("limit".to_string(), json!(query.limit));
        body.insert("with_payload".to_string(), json!(false));
        if let Some(using) = &query.using {
            body.insert("using".to_string(), json!(using));
        }
        if let Some(threshold) = query.score_threshold {
            body.insert("score_threshold".to_string(), json!(threshold));
        }
        if let Some(params) = &query.params {
            body.insert("params".to_string(), serde_json::to_value(params)?);
        }

        let response: Value = self
            .request(
                self.http
                    .post(self.url(&format!("/collections/{}/points/query", name))),
            )
            .json(&Value::Object(body))
            .send()
            .await
            .with_context(|| format!("search against '{}' failed", name))?
            .error_for_status()
            .with_context(|| format!("search against '{}' rejected", name))?
            .json()
            .await
            .context("malformed search response")?;

        let points = response
            .pointer("/result/points")
            .and_then(Value::as_array)
            .context("search response missing result points")?;

        points
            .iter()
            .map(|p| {
                let id = p
                    .get("id")
                    .and_then(Value::as_u64)
                    .context("search hit missing numeric id")?;
                let score = p
                    .get("score")
                    .and_then(Value::as_f64)
                    .context("search hit missing score")?;
                Ok(ScoredPoint {
                    id,
                    score: score as f32,
                })
            })
            .collect()
    }
}

/// Connector that builds REST clients from registered connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct QdrantConnector;

impl VectorDbConnector for QdrantConnector {
    fn connect(&self, connection: &Connection) -> Result<Arc<dyn VectorDbClient>> {
        anyhow::ensure!(
            !connection.url.is_empty(),
            "connection '{}' has no endpoint url",
            connection.name
        );
        Ok(Arc::new(QdrantHttpClient::new(
            connection.url.clone(),
            connection.api_key.clone(),
        )))
    }
}
