//! Configuration structures for schemas, indexes, and workloads.
//!
//! These are schema-light by design: each struct has the recognized fields as
//! typed options plus a flattened `extra` map so unknown keys survive a
//! round-trip instead of being dropped. Structural correctness is enforced
//! once, at experiment creation, by [`crate::validate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Distance metric for a vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Distance {
    #[default]
    #[serde(alias = "COSINE", alias = "cosine")]
    Cosine,
    #[serde(alias = "EUCLID", alias = "EUCLIDEAN", alias = "Euclidean", alias = "l2")]
    Euclid,
    #[serde(alias = "DOT", alias = "dot")]
    Dot,
    #[serde(alias = "MANHATTAN", alias = "manhattan")]
    Manhattan,
}

/// HNSW index build parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HnswParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub m: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ef_construct: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Per-vector declaration in a dataset schema: what the data actually is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SchemaVector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Dataset schema: either one anonymous vector or multiple named vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SchemaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<SchemaVector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors: Option<BTreeMap<String, SchemaVector>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SchemaConfig {
    /// Declared vector names, in declaration order (empty for single-vector).
    pub fn vector_names(&self) -> Vec<String> {
        self.vectors
            .as_ref()
            .map(|v| v.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Per-vector parameters in an experiment's vector config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VectorSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hnsw_config: Option<HnswParams>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An experiment's vector configuration: how the collection will be built.
///
/// Single-vector experiments set `size`/`distance` at the top level;
/// multi-vector experiments populate `vectors` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VectorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<Distance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hnsw_config: Option<HnswParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vectors: Option<BTreeMap<String, VectorSpec>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl VectorConfig {
    /// Current HNSW `m`, with the engine default when unset.
    pub fn hnsw_m(&self) -> u32 {
        self.hnsw_config.as_ref().and_then(|h| h.m).unwrap_or(16)
    }

    /// Current HNSW `ef_construct`, with the engine default when unset.
    pub fn hnsw_ef_construct(&self) -> u32 {
        self.hnsw_config
            .as_ref()
            .and_then(|h| h.ef_construct)
            .unwrap_or(100)
    }

    /// Copy with the HNSW build parameters replaced, preserving other fields.
    pub fn with_hnsw(&self, m: u32, ef_construct: u32) -> VectorConfig {
        let mut out = self.clone();
        let mut hnsw = out.hnsw_config.take().unwrap_or_default();
        hnsw.m = Some(m);
        hnsw.ef_construct = Some(ef_construct);
        out.hnsw_config = Some(hnsw);
        out
    }
}

/// Tuning parameters applied at query time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hnsw_ef: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Index-build and workload parameters for an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OptimizerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_threshold: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_threshold: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_params: Option<SearchParams>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl OptimizerConfig {
    /// Result list depth per query, defaulted.
    pub fn k(&self) -> usize {
        self.k.unwrap_or(10)
    }

    /// Number of queries in the workload batch, defaulted.
    pub fn query_count(&self) -> usize {
        self.query_count.unwrap_or(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_accepts_uppercase_alias() {
        let d: Distance = serde_json::from_str("\"COSINE\"").unwrap();
        assert_eq!(d, Distance::Cosine);
        let d: Distance = serde_json::from_str("\"EUCLIDEAN\"").unwrap();
        assert_eq!(d, Distance::Euclid);
    }

    #[test]
    fn test_unknown_keys_survive_roundtrip() {
        let json = r#"{"size": 384, "distance": "COSINE", "on_disk": true}"#;
        let cfg: VectorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.size, Some(384));
        assert_eq!(cfg.extra.get("on_disk"), Some(&Value::Bool(true)));
        let back = serde_json::to_value(&cfg).unwrap();
        assert_eq!(back["on_disk"], Value::Bool(true));
    }

    #[test]
    fn test_hnsw_defaults() {
        let cfg = VectorConfig::default();
        assert_eq!(cfg.hnsw_m(), 16);
        assert_eq!(cfg.hnsw_ef_construct(), 100);
        let tuned = cfg.with_hnsw(32, 300);
        assert_eq!(tuned.hnsw_m(), 32);
        assert_eq!(tuned.hnsw_ef_construct(), 300);
        // Original is untouched.
        assert_eq!(cfg.hnsw_m(), 16);
    }

    #[test]
    fn test_optimizer_workload_defaults() {
        let opt = OptimizerConfig::default();
        assert_eq!(opt.k(), 10);
        assert_eq!(opt.query_count(), 100);
    }
}
