// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed [`Repository`], the production storage implementation.
//!
//! Keys are laid out exactly as the original Go implementation's
//! `job/repository.go`: `jobs` is a list of IDs; `jobs:<id>` is a hash
//! carrying `totalSteps`, `completedSteps`, `status`, `createdAt`,
//! `finishedIn`; `jobs:<id>:log` is a list of log lines.
//!
//! One field is added beyond the original layout: `jobs:<id>` also carries a
//! `doc` entry holding the job's immutable definition (name, steps,
//! environment) as JSON. The original only ever persisted the five status
//! fields because its in-process `Job` struct already held the full
//! definition in memory for the life of one `Execute` call; this repository
//! has no such in-process cache, and `Repository::get`/`all` must return a
//! job's full record independent of whether the process
//! that created it is still running. `doc` is written once at `create` and
//! never touched by `update`, so the original's five-field update contract
//! is unchanged.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use dray_core::{EnvVar, Job, JobId, JobStatus, JobStep};

use crate::error::RepositoryError;
use crate::repository::{Repository, UpdateField};

const JOBS_KEY: &str = "jobs";

fn job_key(id: &str) -> String {
    format!("{JOBS_KEY}:{id}")
}

fn job_log_key(id: &str) -> String {
    format!("{JOBS_KEY}:{id}:log")
}

/// The immutable portion of a job, persisted once under the `doc` field.
#[derive(serde::Serialize, serde::Deserialize)]
struct JobDoc {
    name: String,
    steps: Vec<JobStep>,
    environment: Vec<EnvVar>,
}

fn unavailable(e: redis::RedisError) -> RepositoryError {
    RepositoryError::Unavailable(e.to_string())
}

/// A [`Repository`] backed by a real Redis instance via an async connection
/// manager (auto-reconnecting, safe to clone and share across tasks).
pub struct RedisRepository {
    manager: ConnectionManager,
}

impl RedisRepository {
    /// Connect to the Redis instance named by `url` (e.g.
    /// `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(unavailable)?;
        Ok(Self { manager })
    }

    fn conn(&self) -> ConnectionManager {
        self.manager.clone()
    }

    async fn job_exists(&self, id: &str) -> Result<bool, RepositoryError> {
        let mut conn = self.conn();
        let exists: bool = conn.exists(job_key(id)).await.map_err(unavailable)?;
        Ok(exists)
    }
}

#[async_trait]
impl Repository for RedisRepository {
    async fn all(&self) -> Result<Vec<Job>, RepositoryError> {
        let mut conn = self.conn();
        let ids: Vec<String> = conn.lrange(JOBS_KEY, 0, -1).await.map_err(unavailable)?;
        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(job) = self.get(&JobId::new(id)).await {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn get(&self, id: &JobId) -> Result<Job, RepositoryError> {
        let mut conn = self.conn();
        let fields: std::collections::HashMap<String, String> = conn
            .hgetall(job_key(id.as_str()))
            .await
            .map_err(unavailable)?;
        if fields.is_empty() {
            return Err(RepositoryError::NotFound(id.to_string()));
        }

        let doc: JobDoc = fields
            .get("doc")
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or(JobDoc {
                name: String::new(),
                steps: Vec::new(),
                environment: Vec::new(),
            });

        let status = match fields.get("status").map(String::as_str) {
            Some("running") => JobStatus::Running,
            Some("complete") => JobStatus::Complete,
            Some("error") => JobStatus::Error,
            _ => JobStatus::Pending,
        };

        Ok(Job {
            id: id.clone(),
            name: doc.name,
            steps: doc.steps,
            environment: doc.environment,
            steps_completed: fields
                .get("completedSteps")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            status,
            created_at: fields.get("createdAt").cloned().filter(|s| !s.is_empty()),
            finished_in: fields.get("finishedIn").and_then(|s| s.parse().ok()),
        })
    }

    async fn create(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut conn = self.conn();
        let doc = JobDoc {
            name: job.name.clone(),
            steps: job.steps.clone(),
            environment: job.environment.clone(),
        };
        let doc_json = serde_json::to_string(&doc)
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        let _: () = conn
            .rpush(JOBS_KEY, job.id.as_str())
            .await
            .map_err(unavailable)?;
        let _: () = conn
            .hset_multiple(
                job_key(job.id.as_str()),
                &[
                    ("doc", doc_json),
                    ("totalSteps", job.steps.len().to_string()),
                    ("completedSteps", "0".to_string()),
                    ("status", String::new()),
                ],
            )
            .await
            .map_err(unavailable)?;
        Ok(job)
    }

    async fn delete(&self, id: &JobId) -> Result<(), RepositoryError> {
        let mut conn = self.conn();
        let _: () = conn
            .lrem(JOBS_KEY, 0, id.as_str())
            .await
            .map_err(unavailable)?;
        let _: () = conn.del(job_key(id.as_str())).await.map_err(unavailable)?;
        let _: () = conn
            .del(job_log_key(id.as_str()))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn update(&self, id: &JobId, field: UpdateField) -> Result<(), RepositoryError> {
        if !self.job_exists(id.as_str()).await? {
            return Ok(());
        }
        let mut conn = self.conn();
        let (name, value) = match field {
            UpdateField::Status(status) => ("status", status.as_str().to_string()),
            UpdateField::CompletedSteps(n) => ("completedSteps", n.to_string()),
            UpdateField::CreatedAt(ts) => ("createdAt", ts),
            UpdateField::FinishedIn(secs) => ("finishedIn", secs.to_string()),
        };
        let _: () = conn
            .hset(job_key(id.as_str()), name, value)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn get_job_log(&self, id: &JobId, index: i64) -> Result<Vec<String>, RepositoryError> {
        if !self.job_exists(id.as_str()).await? {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        let mut conn = self.conn();
        // Redis LRANGE natively implements the tail-relative negative-index
        // semantics `tail_from` mirrors for the in-memory implementation.
        let lines: Vec<String> = conn
            .lrange(job_log_key(id.as_str()), index as isize, -1)
            .await
            .map_err(unavailable)?;
        Ok(lines)
    }

    async fn append_log_line(&self, id: &JobId, line: String) -> Result<(), RepositoryError> {
        if !self.job_exists(id.as_str()).await? {
            return Ok(());
        }
        let mut conn = self.conn();
        let _: () = conn
            .rpush(job_log_key(id.as_str()), line)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}
