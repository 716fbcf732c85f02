//! Text embedding adapters.
//!
//! [`DeterministicEmbedder`] derives vectors from a stable text hash so the
//! harness can run hermetically (tests, local smoke runs) with reproducible
//! recall. [`HttpEmbedder`] talks to an OpenAI-compatible `/embeddings`
//! endpoint for live runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::ports::TextEmbedder;

// ============================================================================
// Deterministic embedder
// ============================================================================

/// Embedder whose output depends only on the input text.
///
/// The same text always maps to the same vector, so a corpus document and a
/// query generated from it are exact cosine neighbors.
#[derive(Debug, Clone, Copy)]
pub struct DeterministicEmbedder {
    pub dim: usize,
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        DeterministicEmbedder { dim: 384 }
    }
}

/// Stable 64-bit seed for a text (FNV-1a; endian- and platform-independent).
pub fn stable_text_seed(text: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in text.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic vector for a text at a given dimensionality.
pub fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    let seed = stable_text_seed(text) % 1000;
    (0..dim)
        .map(|i| ((seed + i as u64) % 100) as f32 / 100.0)
        .collect()
}

#[async_trait]
impl TextEmbedder for DeterministicEmbedder {
    async fn embed(&self, texts: &[String], _model: &str) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| deterministic_vector(text, self.dim))
            .collect())
    }
}

// ============================================================================
// HTTP embedder
// ============================================================================

/// Client for an OpenAI-compatible embeddings endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        HttpEmbedder {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl TextEmbedder for HttpEmbedder {
    async fn embed(&self, texts: &[String], model: &str) -> Result<Vec<Vec<f32>>> {
        debug!(model, batch_size = texts.len(), "embedding batch");

        let response = self
            .http
            .post(format!("{}/embeddings", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&json!({ "input": texts, "model": model }))
            .send()
            .await
            .context("embedding request failed")?
            .error_for_status()
            .context("embedding provider rejected request")?;

        let body: EmbeddingsResponse = response
            .json()
            .await
            .context("malformed embedding response")?;

        anyhow::ensure!(
            body.data.len() == texts.len(),
            "embedding provider returned {} vectors for {} texts",
            body.data.len(),
            texts.len()
        );

        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_vector_is_stable() {
        let a = deterministic_vector("doc-0", 8);
        let b = deterministic_vector("doc-0", 8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_texts_differ() {
        // Seeds are mod 1000, so distinct short texts almost always differ.
        let a = deterministic_vector("doc-0", 8);
        let b = deterministic_vector("doc-1", 8);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_embedder_preserves_order_and_dim() {
        let embedder = DeterministicEmbedder { dim: 16 };
        let texts = vec!["b".to_string(), "a".to_string()];

        let vectors = embedder.embed(&texts, "default").await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 16);
        assert_eq!(vectors[0], deterministic_vector("b", 16));
        assert_eq!(vectors[1], deterministic_vector("a", 16));
    }
}
