//! Parameter generation: proposing the next experiment configuration.
//!
//! Three strategies share one contract: given the run history for an
//! experiment and its base configuration, produce a new `Experiment` value
//! without mutating the original.
//!
//! - [`GridGenerator`] walks a fixed m × ef_construct cross product with an
//!   internal cursor (single-owner mutation, no ambient state).
//! - [`HeuristicGenerator`] applies fixed tuning rules to the most recent
//!   completed run's metrics.
//! - [`LlmGenerator`] delegates the choice to an external [`ConfigAdvisor`].

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::{OptimizerConfig, VectorConfig};
use crate::entities::{Experiment, Run, RunStatus};

/// Strategy contract for proposing the next configuration.
#[async_trait]
pub trait ParameterGenerator: Send {
    /// Propose the next experiment configuration.
    ///
    /// Never mutates `base`; the returned experiment is a new value (possibly
    /// an unchanged copy when the strategy has nothing to suggest).
    async fn suggest_next(&mut self, previous_runs: &[Run], base: &Experiment)
        -> Result<Experiment>;
}

// ============================================================================
// Grid search
// ============================================================================

/// Deterministic sweep over the HNSW build-parameter grid.
///
/// Iterates `m × ef_construct` in row-major order (all `ef_construct` values
/// for the first `m`, then the next `m`), wrapping to the start after
/// exhaustion. The cursor lives in the generator value and survives across
/// calls.
#[derive(Debug, Clone)]
pub struct GridGenerator {
    m_values: Vec<u32>,
    ef_values: Vec<u32>,
    cursor: usize,
}

impl Default for GridGenerator {
    fn default() -> Self {
        GridGenerator {
            m_values: vec![16, 24, 32, 48, 64],
            ef_values: vec![100, 200, 300, 400],
            cursor: 0,
        }
    }
}

impl GridGenerator {
    /// Grid over custom parameter lists; an empty list falls back to the
    /// default axis so the cursor arithmetic always has cells to walk.
    pub fn new(m_values: Vec<u32>, ef_values: Vec<u32>) -> Self {
        let defaults = GridGenerator::default();
        GridGenerator {
            m_values: if m_values.is_empty() {
                defaults.m_values
            } else {
                m_values
            },
            ef_values: if ef_values.is_empty() {
                defaults.ef_values
            } else {
                ef_values
            },
            cursor: 0,
        }
    }

    /// Number of grid points before the cursor wraps.
    pub fn combinations(&self) -> usize {
        self.m_values.len() * self.ef_values.len()
    }
}

#[async_trait]
impl ParameterGenerator for GridGenerator {
    async fn suggest_next(
        &mut self,
        _previous_runs: &[Run],
        base: &Experiment,
    ) -> Result<Experiment> {
        if self.cursor >= self.combinations() {
            self.cursor = 0;
        }

        let m = self.m_values[self.cursor / self.ef_values.len()];
        let ef = self.ef_values[self.cursor % self.ef_values.len()];
        self.cursor += 1;

        let vector_config = base.vector_config.with_hnsw(m, ef);
        Ok(base.with_configs(base.optimizer_config.clone(), vector_config))
    }
}

// ============================================================================
// Heuristic search
// ============================================================================

/// Rule-based tuning from the latest completed run.
///
/// Rules fire in priority order, at most one per call:
/// 1. recall < 0.85 and m < 64: raise m by 8
/// 2. recall < 0.85 and ef_construct < 400: raise ef_construct by 100
/// 3. p95 latency > 0.1s and m > 16: lower m by 8 (floor 16)
/// 4. p95 latency > 0.1s and ef_construct > 100: lower ef_construct by 50 (floor 100)
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicGenerator;

/// Recall floor below which build quality is raised.
const RECALL_TARGET: f64 = 0.85;
/// p95 latency ceiling (seconds) above which build cost is lowered.
const LATENCY_TARGET: f64 = 0.1;

#[async_trait]
impl ParameterGenerator for HeuristicGenerator {
    async fn suggest_next(
        &mut self,
        previous_runs: &[Run],
        base: &Experiment,
    ) -> Result<Experiment> {
        let Some(latest) = latest_completed_run(previous_runs) else {
            return Ok(base.clone());
        };

        let recall = latest.metrics.get("recall").copied().unwrap_or(0.0);
        let p95 = latest.metrics.get("p95_latency").copied().unwrap_or(0.0);

        let m = base.vector_config.hnsw_m();
        let ef = base.vector_config.hnsw_ef_construct();
        let (new_m, new_ef) = apply_tuning_rules(recall, p95, m, ef);

        if (new_m, new_ef) == (m, ef) {
            return Ok(base.clone());
        }

        let vector_config = base.vector_config.with_hnsw(new_m, new_ef);
        Ok(base.with_configs(base.optimizer_config.clone(), vector_config))
    }
}

/// Most recently started COMPLETED run, if any.
pub fn latest_completed_run(runs: &[Run]) -> Option<&Run> {
    runs.iter()
        .filter(|r| r.status == RunStatus::Completed)
        .max_by_key(|r| r.start_time)
}

/// One tuning rule per call; unchanged when no rule applies.
pub fn apply_tuning_rules(recall: f64, latency: f64, m: u32, ef: u32) -> (u32, u32) {
    if recall < RECALL_TARGET && m < 64 {
        return (m + 8, ef);
    }
    if recall < RECALL_TARGET && ef < 400 {
        return (m, ef + 100);
    }
    if latency > LATENCY_TARGET && m > 16 {
        return (m.saturating_sub(8).max(16), ef);
    }
    if latency > LATENCY_TARGET && ef > 100 {
        return (m, ef.saturating_sub(50).max(100));
    }
    (m, ef)
}

// ============================================================================
// LLM-advised search
// ============================================================================

/// Configuration proposed by an external advisor, with its rationale.
#[derive(Debug, Clone)]
pub struct Advice {
    pub optimizer_config: OptimizerConfig,
    pub vector_config: VectorConfig,
    pub reasoning: String,
}

/// External reasoning capability consulted by [`LlmGenerator`].
///
/// Implementations serialize the run history and base configuration as
/// context and must return a structurally valid configuration.
#[async_trait]
pub trait ConfigAdvisor: Send + Sync {
    async fn advise(&self, previous_runs: &[Run], base: &Experiment) -> Result<Advice>;
}

/// Generator that defers parameter choice to a [`ConfigAdvisor`].
pub struct LlmGenerator<A> {
    advisor: A,
}

impl<A: ConfigAdvisor> LlmGenerator<A> {
    pub fn new(advisor: A) -> Self {
        LlmGenerator { advisor }
    }
}

#[async_trait]
impl<A: ConfigAdvisor> ParameterGenerator for LlmGenerator<A> {
    async fn suggest_next(
        &mut self,
        previous_runs: &[Run],
        base: &Experiment,
    ) -> Result<Experiment> {
        let advice = self.advisor.advise(previous_runs, base).await?;
        info!(reasoning = %advice.reasoning, "advisor suggestion");
        Ok(base.with_configs(advice.optimizer_config, advice.vector_config))
    }
}
