// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The abstract storage contract the pipeline engine consumes.

use async_trait::async_trait;

use dray_core::{Job, JobId, JobStatus};

use crate::error::RepositoryError;

/// The single-field mutations the engine performs as a job's status changes.
///
/// Modelled as a closed enum (rather than a free-form `field, value` pair)
/// so both implementations dispatch on the same four mutable fields.
#[derive(Debug, Clone)]
pub enum UpdateField {
    Status(JobStatus),
    CompletedSteps(usize),
    CreatedAt(String),
    FinishedIn(f64),
}

/// Durable storage for job records and their append-only log streams.
///
/// Connection/protocol errors on the backend are reported as
/// [`RepositoryError::Unavailable`]. [`RepositoryError::NotFound`] is
/// reserved for `get` and `get_job_log` against an unknown job id; `update`
/// and `append_log_line` against an unknown id are a silent no-op, since a
/// job deleted mid-execution must not cause the engine's writes to fault
/// (see the pipeline engine's cancellation notes).
#[async_trait]
pub trait Repository: Send + Sync {
    /// Every job's identity and top-level fields, in a stable order across
    /// calls.
    async fn all(&self) -> Result<Vec<Job>, RepositoryError>;

    /// The full record for one job. Fails with `NotFound` when `id` is
    /// unknown.
    async fn get(&self, id: &JobId) -> Result<Job, RepositoryError>;

    /// Persist a freshly created job. Atomic: once this returns, `get(id)`
    /// succeeds.
    async fn create(&self, job: Job) -> Result<Job, RepositoryError>;

    /// Remove a job record and its log stream. Idempotent: deleting an
    /// unknown id is not an error.
    async fn delete(&self, id: &JobId) -> Result<(), RepositoryError>;

    /// Atomically mutate one field of a job record. A no-op, not an error,
    /// if `id` is unknown.
    async fn update(&self, id: &JobId, field: UpdateField) -> Result<(), RepositoryError>;

    /// Log lines from `index` (inclusive) to the tail. `index == 0` returns
    /// every line; negative indices are tail-relative (`-1` is the last
    /// line), mirroring Redis `LRANGE` semantics. Fails with `NotFound` when
    /// `id` is unknown.
    async fn get_job_log(&self, id: &JobId, index: i64) -> Result<Vec<String>, RepositoryError>;

    /// Append one line to a job's log stream, preserving call order. A
    /// no-op, not an error, if `id` is unknown.
    async fn append_log_line(&self, id: &JobId, line: String) -> Result<(), RepositoryError>;
}

/// Slice `lines` the way Redis's `LRANGE key index -1` would: `index == 0`
/// returns everything, a positive index returns from that offset, and a
/// negative index counts back from the tail (`-1` is the last element, out
/// of range clamps to the full slice).
pub(crate) fn tail_from(lines: &[String], index: i64) -> Vec<String> {
    if lines.is_empty() {
        return Vec::new();
    }
    let len = lines.len() as i64;
    let start = if index >= 0 {
        index.min(len)
    } else {
        (len + index).max(0)
    };
    lines[start as usize..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_index_returns_everything() {
        let lines = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(tail_from(&lines, 0), lines);
    }

    #[test]
    fn positive_index_returns_from_offset() {
        let lines = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(tail_from(&lines, 1), vec!["b", "c"]);
    }

    #[test]
    fn negative_index_counts_from_tail() {
        let lines = vec!["a".into(), "b".into(), "c".into()];
        assert_eq!(tail_from(&lines, -1), vec!["c"]);
        assert_eq!(tail_from(&lines, -2), vec!["b", "c"]);
    }

    #[test]
    fn out_of_range_clamps() {
        let lines = vec!["a".into(), "b".into()];
        assert_eq!(tail_from(&lines, 50), Vec::<String>::new());
        assert_eq!(tail_from(&lines, -50), lines);
    }
}
