// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the pipeline engine.

use thiserror::Error;

use dray_executor::ExecutorError;
use dray_storage::RepositoryError;

/// Errors the pipeline engine can surface from one `Execute` call.
///
/// Every variant aborts the step that raised it; `Engine::execute` records
/// status `"error"` and skips remaining steps, but still returns the error
/// to its caller (the background task that dispatched `Execute`, which only
/// logs it — see the API layer).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Executor(#[from] ExecutorError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("job {0} has no current step")]
    NoCurrentStep(String),
}
