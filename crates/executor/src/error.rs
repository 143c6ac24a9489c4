// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds surfaced by a [`crate::ContainerExecutor`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Container exited with a non-zero status.
    #[error("Container exit code: {0}")]
    ExitCode(i64),
    /// Any other container-runtime failure: connecting to the daemon,
    /// pulling an image, creating or starting a container, or querying one
    /// that can't be found.
    #[error("container driver error: {0}")]
    Driver(String),
}
