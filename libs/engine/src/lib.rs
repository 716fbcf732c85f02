//! Execution engine for vectorbench.
//!
//! Composes the pure domain layer (`vectorbench-core`) with live
//! collaborators into the end-to-end experiment workflow:
//!
//! ```text
//! RunExecutor (state machine, sole writer of Run status/metrics)
//!   └── orchestrate::run_experiment
//!         ├── provision::provision_and_seed   create + seed + wait healthy
//!         ├── workload::run_workload          timed concurrent query batch
//!         ├── loader::load_ground_truth
//!         ├── vectorbench_core::evaluate
//!         └── ClusterTelemetry::cluster_stats (non-fatal)
//! ```
//!
//! Collaborators (database client, embedder, telemetry, repositories) are
//! trait objects defined in [`ports`]; HTTP adapters for a Qdrant-compatible
//! database live in [`qdrant`], [`stats`], [`embedding`], and [`advisor`].

pub mod advisor;
pub mod embedding;
pub mod executor;
pub mod loader;
pub mod orchestrate;
pub mod ports;
pub mod provision;
pub mod qdrant;
pub mod repository;
pub mod stats;
pub mod workload;

pub use executor::{RunExecutor, RunTrigger};
pub use ports::{
    ClusterTelemetry, CollectionStatus, ConnectionRepository, DatasetRepository,
    ExperimentRepository, Point, PointVectors, RunRepository, ScoredPoint, SearchQuery,
    TextEmbedder, VectorDbClient, VectorDbConnector,
};
pub use provision::SeedOptions;
pub use workload::{WorkloadConfig, WorkloadResult};
