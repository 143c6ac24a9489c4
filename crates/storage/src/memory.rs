// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-process [`Repository`] backed by a mutex-guarded map.
//!
//! This is the primary vehicle for pipeline engine tests, and is usable
//! standalone for local/dev runs that don't need a real Redis instance.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use dray_core::{Job, JobId};

use crate::error::RepositoryError;
use crate::repository::{tail_from, Repository, UpdateField};

#[derive(Default)]
struct State {
    jobs: HashMap<String, Job>,
    /// Insertion order, so `all()` has a stable order across calls.
    order: Vec<String>,
    logs: HashMap<String, Vec<String>>,
}

/// In-memory [`Repository`] implementation.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<State>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn all(&self) -> Result<Vec<Job>, RepositoryError> {
        let state = self.state.lock();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.jobs.get(id).cloned())
            .collect())
    }

    async fn get(&self, id: &JobId) -> Result<Job, RepositoryError> {
        let state = self.state.lock();
        state
            .jobs
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn create(&self, job: Job) -> Result<Job, RepositoryError> {
        let mut state = self.state.lock();
        let key = job.id.as_str().to_string();
        if !state.jobs.contains_key(&key) {
            state.order.push(key.clone());
        }
        state.logs.entry(key.clone()).or_default();
        state.jobs.insert(key, job.clone());
        Ok(job)
    }

    async fn delete(&self, id: &JobId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        let key = id.as_str();
        state.jobs.remove(key);
        state.logs.remove(key);
        state.order.retain(|k| k != key);
        Ok(())
    }

    async fn update(&self, id: &JobId, field: UpdateField) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        if let Some(job) = state.jobs.get_mut(id.as_str()) {
            match field {
                UpdateField::Status(status) => job.status = status,
                UpdateField::CompletedSteps(n) => job.steps_completed = n,
                UpdateField::CreatedAt(ts) => job.created_at = Some(ts),
                UpdateField::FinishedIn(secs) => job.finished_in = Some(secs),
            }
        }
        // Unknown id: silent no-op, per the repository contract.
        Ok(())
    }

    async fn get_job_log(&self, id: &JobId, index: i64) -> Result<Vec<String>, RepositoryError> {
        let state = self.state.lock();
        if !state.jobs.contains_key(id.as_str()) {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        let lines = state.logs.get(id.as_str()).cloned().unwrap_or_default();
        Ok(tail_from(&lines, index))
    }

    async fn append_log_line(&self, id: &JobId, line: String) -> Result<(), RepositoryError> {
        let mut state = self.state.lock();
        if let Some(log) = state.logs.get_mut(id.as_str()) {
            log.push(line);
        }
        // Unknown id: silent no-op, matching `update`.
        Ok(())
    }
}
