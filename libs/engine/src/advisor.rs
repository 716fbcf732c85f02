//! LLM configuration advisor.
//!
//! Implements the [`ConfigAdvisor`] contract over an OpenAI-compatible chat
//! completions endpoint. The advisor receives the base configuration and run
//! history as serialized context and must answer with a JSON object holding
//! `optimizer_config`, `vector_config`, and `reasoning`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use vectorbench_core::config::{OptimizerConfig, VectorConfig};
use vectorbench_core::entities::{Experiment, Run};
use vectorbench_core::generate::{Advice, ConfigAdvisor};

const SYSTEM_PROMPT: &str = "You are an expert vector-database administrator and \
performance tuning specialist. Suggest the next configuration for a vector search \
benchmark experiment from the base configuration and the history of previous runs. \
Tuning context: HNSW `m` (higher = better recall, more RAM/CPU; typical 16-64), \
HNSW `ef_construct` (higher = better index quality, slower indexing; typical 100-512), \
`indexing_threshold` controls when the index is built. Weigh recall against latency \
and RAM. Respond with a JSON object containing `optimizer_config`, `vector_config`, \
and `reasoning`.";

/// Advisor backed by an OpenAI-compatible chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiAdvisor {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Deserialize)]
struct Suggestion {
    optimizer_config: OptimizerConfig,
    vector_config: VectorConfig,
    #[serde(default)]
    reasoning: String,
}

impl OpenAiAdvisor {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        OpenAiAdvisor {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn build_prompt(previous_runs: &[Run], base: &Experiment) -> Result<String> {
        let history: Vec<_> = previous_runs
            .iter()
            .map(|run| {
                json!({
                    "run_id": run.id.to_string(),
                    "status": run.status,
                    "metrics": run.metrics,
                })
            })
            .collect();

        Ok(format!(
            "Base configuration:\nOptimizer config: {}\nVector config: {}\n\n\
             Run history:\n{}\n\n\
             Goal: maximize recall while keeping p95 latency under 50ms.",
            serde_json::to_string(&base.optimizer_config)?,
            serde_json::to_string(&base.vector_config)?,
            serde_json::to_string_pretty(&history)?,
        ))
    }
}

#[async_trait]
impl ConfigAdvisor for OpenAiAdvisor {
    async fn advise(&self, previous_runs: &[Run], base: &Experiment) -> Result<Advice> {
        let prompt = Self::build_prompt(previous_runs, base)?;

        let response: ChatResponse = self
            .http
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "response_format": { "type": "json_object" },
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": prompt },
                ],
            }))
            .send()
            .await
            .context("advisor request failed")?
            .error_for_status()
            .context("advisor rejected request")?
            .json()
            .await
            .context("malformed advisor response")?;

        let content = response
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .context("advisor returned no choices")?;

        let suggestion: Suggestion =
            serde_json::from_str(content).context("advisor suggestion is not valid JSON")?;

        Ok(Advice {
            optimizer_config: suggestion.optimizer_config,
            vector_config: suggestion.vector_config,
            reasoning: suggestion.reasoning,
        })
    }
}
