// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The facade the API layer drives: job CRUD plus dispatching execution
//! onto a background task, composed over a [`Repository`] and an [`Engine`].

use std::sync::Arc;

use dray_core::{Clock, Job, JobConfig, JobId};
use dray_executor::ContainerExecutor;
use dray_storage::{Repository, RepositoryError};

use crate::pipeline::Engine;

/// Owns a job's lifecycle from submission through execution.
///
/// `JobManager` is cheap to clone (every field is an `Arc`), so the API
/// layer can hand one instance to every request handler and to the
/// background task each submission spawns.
#[derive(Clone)]
pub struct JobManager {
    repository: Arc<dyn Repository>,
    engine: Arc<Engine>,
    clock: Arc<dyn Clock>,
}

impl JobManager {
    pub fn new(
        repository: Arc<dyn Repository>,
        executor: Arc<dyn ContainerExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = Arc::new(Engine::new(repository.clone(), executor, clock.clone()));
        Self {
            repository,
            engine,
            clock,
        }
    }

    pub async fn list_all(&self) -> Result<Vec<Job>, RepositoryError> {
        self.repository.all().await
    }

    pub async fn get_by_id(&self, id: &JobId) -> Result<Job, RepositoryError> {
        self.repository.get(id).await
    }

    pub async fn get_log(&self, id: &JobId, index: i64) -> Result<Vec<String>, RepositoryError> {
        self.repository.get_job_log(id, index).await
    }

    pub async fn delete(&self, id: &JobId) -> Result<(), RepositoryError> {
        self.repository.delete(id).await
    }

    /// Persist a new job and hand it to the engine on a detached background
    /// task, returning as soon as the record exists. Callers observe
    /// progress through `get_by_id`/`get_log`, not through this call's
    /// return value.
    pub async fn submit(&self, config: JobConfig) -> Result<Job, RepositoryError> {
        let job = Job::new(config, &*self.clock);
        let created = self.repository.create(job).await?;

        let engine = self.engine.clone();
        let to_run = created.clone();
        tokio::spawn(async move {
            if let Err(error) = engine.execute(to_run).await {
                tracing::warn!(%error, "job execution failed");
            }
        });

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dray_core::{FakeClock, JobConfig, JobStatus, JobStep};
    use dray_executor::FakeContainerExecutor;
    use dray_storage::InMemoryRepository;
    use tokio::time::{sleep, Duration};

    use super::*;

    #[tokio::test]
    async fn submit_persists_immediately_and_runs_in_the_background() {
        let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let manager = JobManager::new(repository.clone(), executor.clone(), clock);

        let config = JobConfig {
            name: "demo".into(),
            steps: vec![JobStep {
                source: "img".into(),
                ..Default::default()
            }],
            environment: vec![],
        };

        let created = manager.submit(config).await.expect("submit");
        assert_eq!(created.status, JobStatus::Pending);

        for _ in 0..50 {
            if manager
                .get_by_id(&created.id)
                .await
                .expect("get")
                .is_terminal()
            {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        let fetched = manager.get_by_id(&created.id).await.expect("get");
        assert_eq!(fetched.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let repository: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let manager = JobManager::new(repository, executor, clock);

        let created = manager
            .submit(JobConfig {
                name: "to-delete".into(),
                steps: vec![],
                environment: vec![],
            })
            .await
            .expect("submit");

        manager.delete(&created.id).await.expect("delete");
        assert!(manager.get_by_id(&created.id).await.is_err());
    }
}
