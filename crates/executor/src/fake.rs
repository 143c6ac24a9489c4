// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scripted [`ContainerExecutor`] test double.
//!
//! Grounded on this workspace's call-recording fake adapter style: a
//! mutex-guarded inner state records every `start`/`inspect`/`clean_up`
//! call so engine-level tests can assert that exactly one `clean_up` follows
//! every successful `start`, and each step can be scripted with fixed output
//! lines or a dynamic handler that reacts to the stdin it receives.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use dray_core::Job;

use crate::error::ExecutorError;
use crate::executor::{ContainerExecutor, StdinSource, StdoutSink};

/// One step's scripted behavior.
#[derive(Clone, Default)]
pub struct StepScript {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub exit_code: i64,
    /// When set, written to the step's `FilePipePath` as if a container had
    /// written it there through the bind mount (file-pipe mode).
    pub file_contents: Option<Vec<u8>>,
    /// When `start` should fail outright (no container created).
    pub start_error: Option<String>,
}

impl StepScript {
    pub fn stdout_lines(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            stdout: lines.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

type DynamicScript = Arc<dyn Fn(Vec<u8>) -> StepScript + Send + Sync>;

enum Scripted {
    Static(StepScript),
    Dynamic(DynamicScript),
}

/// A call recorded by [`FakeContainerExecutor`], for asserting invariants
/// like "every successful `start` has exactly one matching `clean_up`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorCall {
    Start { job_id: String, step_index: usize },
    Inspect { job_id: String, step_index: usize },
    CleanUp { job_id: String, step_index: usize },
}

#[derive(Default)]
struct Inner {
    scripts: HashMap<(String, usize), Scripted>,
    exit_codes: HashMap<(String, usize), i64>,
    calls: Vec<ExecutorCall>,
}

/// Scriptable [`ContainerExecutor`] for deterministic pipeline engine tests.
#[derive(Clone, Default)]
pub struct FakeContainerExecutor {
    inner: Arc<Mutex<Inner>>,
}

impl FakeContainerExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a fixed response for `job_id`'s step at `step_index`.
    pub fn script(&self, job_id: &str, step_index: usize, script: StepScript) {
        self.inner
            .lock()
            .scripts
            .insert((job_id.to_string(), step_index), Scripted::Static(script));
    }

    /// Script a response computed from the stdin bytes the step receives —
    /// used to simulate a step whose output depends on the prior step's
    /// piped data (e.g. "echo the concatenation of my stdin").
    pub fn script_dynamic(
        &self,
        job_id: &str,
        step_index: usize,
        handler: impl Fn(Vec<u8>) -> StepScript + Send + Sync + 'static,
    ) {
        self.inner.lock().scripts.insert(
            (job_id.to_string(), step_index),
            Scripted::Dynamic(Arc::new(handler)),
        );
    }

    pub fn calls(&self) -> Vec<ExecutorCall> {
        self.inner.lock().calls.clone()
    }

    pub fn start_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ExecutorCall::Start { .. }))
            .count()
    }

    pub fn clean_up_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ExecutorCall::CleanUp { .. }))
            .count()
    }
}

#[async_trait]
impl ContainerExecutor for FakeContainerExecutor {
    async fn start(
        &self,
        job: &mut Job,
        mut stdin: StdinSource,
        mut stdout: StdoutSink,
        mut stderr: StdoutSink,
    ) -> Result<(), ExecutorError> {
        let step_index = job.steps_completed;
        let job_id = job.id.as_str().to_string();
        let key = (job_id.clone(), step_index);

        self.inner.lock().calls.push(ExecutorCall::Start {
            job_id: job_id.clone(),
            step_index,
        });

        let mut stdin_bytes = Vec::new();
        stdin
            .read_to_end(&mut stdin_bytes)
            .await
            .map_err(|e| ExecutorError::Driver(e.to_string()))?;

        let scripted = self.inner.lock().scripts.remove(&key);
        let script = match scripted {
            Some(Scripted::Static(s)) => s,
            Some(Scripted::Dynamic(f)) => f(stdin_bytes),
            None => StepScript::default(),
        };

        if let Some(err) = script.start_error {
            return Err(ExecutorError::Driver(err));
        }

        self.inner
            .lock()
            .exit_codes
            .insert(key.clone(), script.exit_code);

        if let Some(current) = job.current_step_mut() {
            current.id = Some(format!("fake-{}-{}", key.0, key.1));
            if let Some(contents) = script.file_contents {
                if current.uses_file_pipe() {
                    let _ = tokio::fs::write(current.file_pipe_path(), contents).await;
                }
            }
        }

        for line in script.stdout {
            let _ = stdout.write_all(line.as_bytes()).await;
            let _ = stdout.write_all(b"\n").await;
        }
        for line in script.stderr {
            let _ = stderr.write_all(line.as_bytes()).await;
            let _ = stderr.write_all(b"\n").await;
        }
        let _ = stdout.shutdown().await;
        let _ = stderr.shutdown().await;

        Ok(())
    }

    async fn inspect(&self, job: &Job) -> Result<(), ExecutorError> {
        let step_index = job.steps_completed;
        let job_id = job.id.as_str().to_string();
        self.inner.lock().calls.push(ExecutorCall::Inspect {
            job_id: job_id.clone(),
            step_index,
        });
        let code = self
            .inner
            .lock()
            .exit_codes
            .get(&(job_id, step_index))
            .copied()
            .unwrap_or(0);
        if code != 0 {
            return Err(ExecutorError::ExitCode(code));
        }
        Ok(())
    }

    async fn clean_up(&self, job: &Job) -> Result<(), ExecutorError> {
        self.inner.lock().calls.push(ExecutorCall::CleanUp {
            job_id: job.id.as_str().to_string(),
            step_index: job.steps_completed,
        });
        Ok(())
    }
}
