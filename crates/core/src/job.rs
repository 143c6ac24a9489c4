// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job data model: jobs, steps, environment variables, and the derived
//! values the pipeline engine needs at each step boundary.

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::id::JobId;

/// One `VARIABLE=value` pair injected into a step's container environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub variable: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
        }
    }
}

/// Render a list of pairs as `"VAR=VALUE"` strings, preserving order.
pub fn stringify_environment(env: &[EnvVar]) -> Vec<String> {
    env.iter()
        .map(|v| format!("{}={}", v.variable, v.value))
        .collect()
}

/// Overall job status, persisted as a plain string by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Created but not yet handed to the engine. Serializes as `""`.
    #[serde(rename = "")]
    Pending,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "error")]
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        JobStatus::Pending
    }
}

/// Which conduit a step's output is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeMode {
    Stdout,
    Stderr,
    File,
}

/// A single stage of a job's pipeline.
///
/// `id` is the runtime container identifier the executor assigns once the
/// step starts; it is transient and never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStep {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub environment: Vec<EnvVar>,
    /// Pipe-mode selector: "" / "stdout" → stdout, "stderr" → stderr, a
    /// leading "/" path → file-pipe mode at that in-container path.
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub begin_delimiter: String,
    #[serde(default)]
    pub end_delimiter: String,
    #[serde(default)]
    pub refresh: bool,
    #[serde(skip)]
    pub id: Option<String>,
}

impl JobStep {
    pub fn pipe_mode(&self) -> PipeMode {
        if self.output.starts_with('/') {
            PipeMode::File
        } else if self.output == "stderr" {
            PipeMode::Stderr
        } else {
            PipeMode::Stdout
        }
    }

    pub fn uses_stdout(&self) -> bool {
        matches!(self.pipe_mode(), PipeMode::Stdout)
    }

    pub fn uses_stderr(&self) -> bool {
        matches!(self.pipe_mode(), PipeMode::Stderr)
    }

    pub fn uses_file_pipe(&self) -> bool {
        matches!(self.pipe_mode(), PipeMode::File)
    }

    /// Delimited capture is active only when both delimiters are set.
    pub fn uses_delimited_output(&self) -> bool {
        !self.begin_delimiter.is_empty() && !self.end_delimiter.is_empty()
    }

    /// Deterministic host path for file-pipe mode: `/tmp/<lowercase hex md5(source)>`.
    pub fn file_pipe_path(&self) -> String {
        format!("/tmp/{:x}", md5::compute(self.source.as_bytes()))
    }
}

/// Input to [`Job::new`].
#[derive(Debug, Clone, Default)]
pub struct JobConfig {
    pub name: String,
    pub steps: Vec<JobStep>,
    pub environment: Vec<EnvVar>,
}

/// A submitted pipeline: an ordered list of steps plus run-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub id: JobId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub steps: Vec<JobStep>,
    #[serde(default)]
    pub environment: Vec<EnvVar>,
    #[serde(default)]
    pub steps_completed: usize,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_in: Option<f64>,
}

impl Job {
    /// Construct a job with a freshly generated ID and no recorded progress.
    pub fn new(config: JobConfig, _clock: &impl Clock) -> Self {
        Self {
            id: JobId::generate(),
            name: config.name,
            steps: config.steps,
            environment: config.environment,
            steps_completed: 0,
            status: JobStatus::Pending,
            created_at: None,
            finished_in: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Complete | JobStatus::Error)
    }

    /// The step about to run or currently running.
    ///
    /// `None` once every step has completed.
    pub fn current_step(&self) -> Option<&JobStep> {
        self.steps.get(self.steps_completed)
    }

    pub fn current_step_mut(&mut self) -> Option<&mut JobStep> {
        self.steps.get_mut(self.steps_completed)
    }

    /// Job-level pairs, the current step's local pairs, then the four
    /// `DRAY_*` pairs the engine injects for every container it starts.
    pub fn current_step_environment(&self) -> Vec<EnvVar> {
        let mut env = self.environment.clone();
        let step_index = self.steps_completed;
        if let Some(step) = self.current_step() {
            env.extend(step.environment.iter().cloned());
            env.push(EnvVar::new("DRAY_JOB_ID", self.id.as_str()));
            env.push(EnvVar::new("DRAY_JOB_NAME", &self.name));
            env.push(EnvVar::new(
                "DRAY_CURRENT_STEP_INDEX",
                step_index.to_string(),
            ));
            env.push(EnvVar::new("DRAY_CURRENT_STEP_NAME", &step.name));
        }
        env
    }
}
