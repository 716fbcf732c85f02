//! Benchmark entities: connections, datasets, experiments, and runs.
//!
//! Entities are plain values. Connections, datasets, and experiments are
//! immutable after creation; a `Run` is mutated exclusively by the run
//! executor, which owns its status transitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{OptimizerConfig, SchemaConfig, VectorConfig};
use crate::Id;

/// Lifecycle state of a benchmark run.
///
/// Transitions are monotonic: CREATED → RUNNING → {COMPLETED | FAILED}.
/// CANCELED is reserved for operator intervention before execution starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Created,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl RunStatus {
    /// Whether this status ends the run lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed | RunStatus::Canceled
        )
    }

    /// Whether a transition from `self` to `next` is allowed.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match self {
            RunStatus::Created => matches!(
                next,
                RunStatus::Running | RunStatus::Failed | RunStatus::Canceled
            ),
            RunStatus::Running => matches!(next, RunStatus::Completed | RunStatus::Failed),
            _ => false,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Created => "CREATED",
            RunStatus::Running => "RUNNING",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
            RunStatus::Canceled => "CANCELED",
        };
        write!(f, "{}", s)
    }
}

/// Invalid run-status transition, e.g. reviving a terminal run.
#[derive(Debug, thiserror::Error)]
#[error("invalid run status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: RunStatus,
    pub to: RunStatus,
}

/// A registered vector-database endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub id: Id,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub api_key: String,
}

/// A registered dataset: where the corpus lives and what its vectors look like.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub id: Id,
    pub name: String,
    pub source_uri: String,
    pub schema_config: SchemaConfig,
}

/// An index configuration to benchmark against a dataset.
///
/// The vector config must structurally match the dataset schema; this is
/// enforced once at creation time by [`crate::validate::validate_vector_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    #[serde(default)]
    pub id: Id,
    pub name: String,
    pub dataset_id: Id,
    pub connection_id: Id,
    #[serde(default)]
    pub optimizer_config: OptimizerConfig,
    #[serde(default)]
    pub vector_config: VectorConfig,
}

impl Experiment {
    /// Copy of this experiment with a fresh identity and replaced configs.
    ///
    /// Used by parameter generators, which never mutate the base experiment.
    pub fn with_configs(&self, optimizer: OptimizerConfig, vector: VectorConfig) -> Experiment {
        Experiment {
            id: Id::new(),
            name: self.name.clone(),
            dataset_id: self.dataset_id,
            connection_id: self.connection_id,
            optimizer_config: optimizer,
            vector_config: vector,
        }
    }
}

/// One execution of an experiment's workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    #[serde(default)]
    pub id: Id,
    pub experiment_id: Id,
    pub status: RunStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Run {
    /// New run in CREATED state for the given experiment.
    pub fn new(experiment_id: Id) -> Self {
        Run {
            id: Id::new(),
            experiment_id,
            status: RunStatus::Created,
            start_time: Utc::now(),
            end_time: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Move the run to a new status, enforcing monotonic transitions.
    ///
    /// Stamps `end_time` when the new status is terminal.
    pub fn transition(&mut self, next: RunStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.end_time = Some(Utc::now());
        }
        Ok(())
    }
}
