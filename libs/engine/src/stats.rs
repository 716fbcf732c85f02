//! Cluster telemetry adapter.
//!
//! Fetches the database's `/telemetry` endpoint and flattens the fields the
//! report cares about. Telemetry is best-effort: every failure degrades to an
//! empty map so it can never fail a run that otherwise completed.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use vectorbench_core::entities::Connection;

use crate::ports::ClusterTelemetry;

/// Telemetry client for a Qdrant-compatible `/telemetry` endpoint.
#[derive(Debug, Clone)]
pub struct HttpTelemetry {
    http: reqwest::Client,
}

impl Default for HttpTelemetry {
    fn default() -> Self {
        HttpTelemetry {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }
}

impl HttpTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch(&self, connection: &Connection) -> anyhow::Result<BTreeMap<String, f64>> {
        let mut request = self.http.get(format!(
            "{}/telemetry",
            connection.url.trim_end_matches('/')
        ));
        if !connection.api_key.is_empty() {
            request = request.header("api-key", &connection.api_key);
        }

        let body: Value = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut stats = BTreeMap::new();
        if let Some(ram) = body.pointer("/result/app/memory_usage").and_then(Value::as_f64) {
            stats.insert("ram_usage".to_string(), ram);
        }
        if let Some(cpu) = body.pointer("/result/system/cpu_load").and_then(Value::as_f64) {
            stats.insert("cpu_usage".to_string(), cpu);
        }
        if let Some(collections) = body
            .pointer("/result/collections")
            .and_then(Value::as_array)
        {
            let points: f64 = collections
                .iter()
                .filter_map(|c| c.get("points_count").and_then(Value::as_f64))
                .sum();
            stats.insert("points_count".to_string(), points);
        }
        Ok(stats)
    }
}

#[async_trait]
impl ClusterTelemetry for HttpTelemetry {
    async fn cluster_stats(&self, connection: &Connection) -> BTreeMap<String, f64> {
        match self.fetch(connection).await {
            Ok(stats) => stats,
            Err(error) => {
                warn!(url = %connection.url, %error, "telemetry fetch failed, continuing without stats");
                BTreeMap::new()
            }
        }
    }
}
