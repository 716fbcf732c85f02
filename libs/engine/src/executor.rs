//! Run execution state machine and trigger use case.
//!
//! [`RunExecutor`] is the sole writer of a run's status and metrics. It
//! drives CREATED → RUNNING → {COMPLETED, FAILED} and guarantees that every
//! path which reaches RUNNING persists a terminal status: the orchestrator's
//! errors are caught exactly once, here, and recorded as FAILED instead of
//! propagating.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use vectorbench_core::entities::{Run, RunStatus};
use vectorbench_core::Id;

use crate::orchestrate;
use crate::ports::{
    ClusterTelemetry, ConnectionRepository, DatasetRepository, ExperimentRepository,
    RunRepository, TextEmbedder, VectorDbConnector,
};
use crate::provision::SeedOptions;

/// Drives a single run from CREATED to a terminal status.
pub struct RunExecutor {
    run_repo: Arc<dyn RunRepository>,
    experiment_repo: Arc<dyn ExperimentRepository>,
    dataset_repo: Arc<dyn DatasetRepository>,
    connection_repo: Arc<dyn ConnectionRepository>,
    connector: Arc<dyn VectorDbConnector>,
    embedder: Arc<dyn TextEmbedder>,
    telemetry: Arc<dyn ClusterTelemetry>,
    seed_options: SeedOptions,
}

impl RunExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_repo: Arc<dyn RunRepository>,
        experiment_repo: Arc<dyn ExperimentRepository>,
        dataset_repo: Arc<dyn DatasetRepository>,
        connection_repo: Arc<dyn ConnectionRepository>,
        connector: Arc<dyn VectorDbConnector>,
        embedder: Arc<dyn TextEmbedder>,
        telemetry: Arc<dyn ClusterTelemetry>,
    ) -> Self {
        RunExecutor {
            run_repo,
            experiment_repo,
            dataset_repo,
            connection_repo,
            connector,
            embedder,
            telemetry,
            seed_options: SeedOptions::default(),
        }
    }

    pub fn with_seed_options(mut self, options: SeedOptions) -> Self {
        self.seed_options = options;
        self
    }

    /// Execute the run with the given id.
    ///
    /// Missing run: logged no-op (there is no record to update). Missing
    /// referenced entities: run is persisted FAILED without entering
    /// RUNNING. Execution errors after RUNNING: persisted FAILED with the
    /// cause logged; they do not propagate. The only errors returned are
    /// repository failures, where no state decision can be made at all.
    pub async fn execute(&self, run_id: Id) -> Result<()> {
        let Some(mut run) = self.run_repo.get(run_id).await? else {
            warn!(%run_id, "run not found, nothing to execute");
            return Ok(());
        };

        let Some(experiment) = self.experiment_repo.get(run.experiment_id).await? else {
            error!(%run_id, experiment_id = %run.experiment_id, "experiment not found");
            return self.fail(run).await;
        };

        let dataset = self.dataset_repo.get(experiment.dataset_id).await?;
        let connection = self.connection_repo.get(experiment.connection_id).await?;
        let (Some(dataset), Some(connection)) = (dataset, connection) else {
            error!(%run_id, "dataset or connection not found");
            return self.fail(run).await;
        };

        self.transition(&mut run, RunStatus::Running).await?;
        info!(%run_id, experiment = %experiment.name, "run started");

        let outcome = async {
            let client = self.connector.connect(&connection)?;
            orchestrate::run_experiment(
                client.as_ref(),
                self.embedder.as_ref(),
                self.telemetry.as_ref(),
                &experiment,
                &dataset,
                &connection,
                &self.seed_options,
            )
            .await
        }
        .await;

        match outcome {
            Ok(metrics) => {
                run.metrics = metrics;
                self.transition(&mut run, RunStatus::Completed).await?;
                info!(%run_id, "run completed");
            }
            Err(cause) => {
                error!(%run_id, cause = format!("{:#}", cause), "run failed");
                self.fail(run).await?;
            }
        }

        Ok(())
    }

    async fn fail(&self, run: Run) -> Result<()> {
        let mut run = run;
        self.transition(&mut run, RunStatus::Failed).await
    }

    async fn transition(&self, run: &mut Run, status: RunStatus) -> Result<()> {
        run.transition(status)
            .context("illegal run status transition")?;
        self.run_repo.save(run.clone()).await?;
        Ok(())
    }
}

/// Creates runs for an experiment.
///
/// Triggering only persists a CREATED run and returns; callers spawn
/// [`RunExecutor::execute`] as a background task so the trigger never blocks
/// on execution.
pub struct RunTrigger {
    run_repo: Arc<dyn RunRepository>,
    experiment_repo: Arc<dyn ExperimentRepository>,
}

impl RunTrigger {
    pub fn new(
        run_repo: Arc<dyn RunRepository>,
        experiment_repo: Arc<dyn ExperimentRepository>,
    ) -> Self {
        RunTrigger {
            run_repo,
            experiment_repo,
        }
    }

    pub async fn trigger(&self, experiment_id: Id) -> Result<Run> {
        self.experiment_repo
            .get(experiment_id)
            .await?
            .with_context(|| format!("experiment {} not found", experiment_id))?;

        let run = Run::new(experiment_id);
        info!(run_id = %run.id, %experiment_id, "run created");
        self.run_repo.save(run).await
    }
}
