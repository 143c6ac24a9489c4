// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The abstract container-runtime contract.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use dray_core::Job;

use crate::error::ExecutorError;

/// The previous step's captured output, handed to the executor as the new
/// container's stdin. A trait object because the pipeline engine's seed
/// input (an empty reader, for the first step) and a populated
/// `tokio::io::duplex` read half are different concrete types.
pub type StdinSource = Box<dyn AsyncRead + Send + Unpin>;

/// One half of the pipe the executor writes a container's stdout or stderr
/// into. The engine owns the read half and drains it on a capture task.
pub type StdoutSink = Box<dyn AsyncWrite + Send + Unpin>;

/// Drives one container's lifecycle for the job's current step
/// (`job.current_step()`).
///
/// The executor is the only component aware of the container runtime; it
/// may log progress but must never touch the repository.
#[async_trait]
pub trait ContainerExecutor: Send + Sync {
    /// Ensure the current step's image is present (pulling it, and — when
    /// `Refresh` is set — pulling fresh and removing the previously cached
    /// image if its digest changed), create and start a container for it,
    /// and begin forwarding `stdin` into the container and the container's
    /// stdout/stderr into `stdout`/`stderr`.
    ///
    /// Returns once the container has started; the forwarding runs
    /// concurrently and closes both `stdout` and `stderr` when the
    /// container exits. On success, the current step's transient `id`
    /// field is set to the runtime container identifier. On failure, no
    /// container is left behind.
    async fn start(
        &self,
        job: &mut Job,
        stdin: StdinSource,
        stdout: StdoutSink,
        stderr: StdoutSink,
    ) -> Result<(), ExecutorError>;

    /// Block until the current step's container has a final state, then
    /// report it: `Ok(())` on a zero exit, `Err(ExecutorError::ExitCode)`
    /// on a non-zero one, `Err(ExecutorError::Driver)` if the container
    /// can't be queried.
    async fn inspect(&self, job: &Job) -> Result<(), ExecutorError>;

    /// Remove the current step's container. Tolerates repeated calls and a
    /// missing container; callers on the critical path should not
    /// propagate its error.
    async fn clean_up(&self, job: &Job) -> Result<(), ExecutorError>;
}
