// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds for the repository contract.

use thiserror::Error;

/// Errors a [`crate::Repository`] implementation can return.
///
/// Connection and protocol faults on the backend are collapsed into
/// [`RepositoryError::Unavailable`]; a job id that is simply unknown is the
/// distinct [`RepositoryError::NotFound`] kind. `NotFound` is reserved for
/// read operations (`get`, `get_job_log`) — writes against an absent job id
/// are a silent no-op, never an error, since Dray does not abort execution
/// when a job is deleted mid-run.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
