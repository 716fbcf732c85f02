//! In-memory repositories.
//!
//! Default persistence for the CLI and tests; durable storage is outside the
//! engine and plugs in through the same traits. Each repository is a
//! `RwLock`-guarded map, so a run's status transitions are single atomic
//! read-modify-writes of one record.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use vectorbench_core::entities::{Connection, Dataset, Experiment, Run, RunStatus};
use vectorbench_core::Id;

use crate::ports::{
    ConnectionRepository, DatasetRepository, ExperimentRepository, RunRepository,
};

#[derive(Default)]
pub struct InMemoryConnectionRepository {
    items: RwLock<HashMap<Id, Connection>>,
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn save(&self, connection: Connection) -> Result<Connection> {
        self.items
            .write()
            .await
            .insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn get(&self, id: Id) -> Result<Option<Connection>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Connection>> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryDatasetRepository {
    items: RwLock<HashMap<Id, Dataset>>,
}

#[async_trait]
impl DatasetRepository for InMemoryDatasetRepository {
    async fn save(&self, dataset: Dataset) -> Result<Dataset> {
        self.items.write().await.insert(dataset.id, dataset.clone());
        Ok(dataset)
    }

    async fn get(&self, id: Id) -> Result<Option<Dataset>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Dataset>> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryExperimentRepository {
    items: RwLock<HashMap<Id, Experiment>>,
}

#[async_trait]
impl ExperimentRepository for InMemoryExperimentRepository {
    async fn save(&self, experiment: Experiment) -> Result<Experiment> {
        self.items
            .write()
            .await
            .insert(experiment.id, experiment.clone());
        Ok(experiment)
    }

    async fn get(&self, id: Id) -> Result<Option<Experiment>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Experiment>> {
        Ok(self.items.read().await.values().cloned().collect())
    }
}

#[derive(Default)]
pub struct InMemoryRunRepository {
    items: RwLock<HashMap<Id, Run>>,
}

#[async_trait]
impl RunRepository for InMemoryRunRepository {
    async fn save(&self, run: Run) -> Result<Run> {
        self.items.write().await.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get(&self, id: Id) -> Result<Option<Run>> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        experiment_id: Option<Id>,
        status: Option<RunStatus>,
    ) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = self
            .items
            .read()
            .await
            .values()
            .filter(|r| experiment_id.map_or(true, |id| r.experiment_id == id))
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        runs.sort_by_key(|r| r.start_time);
        Ok(runs)
    }
}
