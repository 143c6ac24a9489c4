// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline engine: drives one job's steps end to end.
//!
//! Grounded on `job/manager.go`'s `Execute`/`executeStep`: each step opens a
//! container through the [`ContainerExecutor`], concurrently drains its
//! stdout and stderr into the job log via [`capture::run_capture`], waits
//! for the container to exit, and — regardless of how the step ended —
//! cleans the container up before moving on. The step's carried output
//! becomes the next step's stdin.

use std::io::Cursor;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Instrument;

use dray_core::{Clock, Job, JobStatus, JobStep, PipeMode};
use dray_executor::{ContainerExecutor, StdinSource};
use dray_storage::{Repository, UpdateField};

use crate::capture::{self, LineFilter};
use crate::error::EngineError;

/// Capacity of the in-process pipes connecting the executor's writer halves
/// to the engine's capture tasks. A step's output is buffered in full
/// regardless (see `dray-storage`'s unbounded `stepOutput`), so this only
/// bounds how far the executor can get ahead of a slow capture task.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Runs one job's steps against a [`ContainerExecutor`], persisting
/// progress through a [`Repository`] as it goes.
pub struct Engine {
    repository: Arc<dyn Repository>,
    executor: Arc<dyn ContainerExecutor>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(
        repository: Arc<dyn Repository>,
        executor: Arc<dyn ContainerExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            executor,
            clock,
        }
    }

    /// Execute every step of `job` in order, persisting `running` then a
    /// terminal status (`complete` or `error`) and the elapsed wall-clock
    /// time. Repository write failures along the way are logged, not
    /// fatal — a dropped status update must not abort an otherwise healthy
    /// pipeline. A zero-step job transitions straight from `running` to
    /// `complete` without ever calling the executor.
    pub async fn execute(&self, mut job: Job) -> Result<(), EngineError> {
        let job_id = job.id.clone();

        self.persist(
            self.repository
                .update(&job_id, UpdateField::Status(JobStatus::Running))
                .await,
            "running status",
        );
        let started_ms = self.clock.epoch_ms();
        self.persist(
            self.repository
                .update(&job_id, UpdateField::CreatedAt(started_ms.to_string()))
                .await,
            "createdAt",
        );

        let mut stdin: StdinSource = Box::new(tokio::io::empty());
        let mut outcome: Result<(), EngineError> = Ok(());

        for step_index in 0..job.steps.len() {
            let span = tracing::info_span!("step", job_id = %job_id, step = step_index);
            match self
                .execute_step(&mut job, stdin)
                .instrument(span)
                .await
            {
                Ok(next_stdin) => {
                    job.steps_completed = step_index + 1;
                    self.persist(
                        self.repository
                            .update(&job_id, UpdateField::CompletedSteps(job.steps_completed))
                            .await,
                        "completedSteps",
                    );
                    stdin = next_stdin;
                }
                Err(error) => {
                    tracing::warn!(%job_id, step = step_index, %error, "step failed");
                    outcome = Err(error);
                    break;
                }
            }
        }

        let status = if outcome.is_ok() {
            JobStatus::Complete
        } else {
            JobStatus::Error
        };
        self.persist(
            self.repository.update(&job_id, UpdateField::Status(status)).await,
            "terminal status",
        );
        let finished_in = (self.clock.epoch_ms() - started_ms) as f64 / 1000.0;
        self.persist(
            self.repository
                .update(&job_id, UpdateField::FinishedIn(finished_in))
                .await,
            "finishedIn",
        );

        outcome
    }

    fn persist(&self, result: Result<(), dray_storage::RepositoryError>, what: &str) {
        if let Err(error) = result {
            tracing::warn!(%error, "failed to persist {what}");
        }
    }

    /// Run the job's current step to completion and return the stdin the
    /// next step should receive. The container is always cleaned up before
    /// returning, on every path including a failed `start`.
    async fn execute_step(
        &self,
        job: &mut Job,
        stdin: StdinSource,
    ) -> Result<StdinSource, EngineError> {
        let step = job
            .current_step()
            .cloned()
            .ok_or_else(|| EngineError::NoCurrentStep(job.id.to_string()))?;

        if step.uses_file_pipe() {
            tokio::fs::File::create(step.file_pipe_path())
                .await
                .map_err(EngineError::Io)?;
        }

        let (stdout_writer, stdout_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_writer, stderr_reader) = tokio::io::duplex(PIPE_CAPACITY);

        if let Err(error) = self
            .executor
            .start(job, stdin, Box::new(stdout_writer), Box::new(stderr_writer))
            .await
        {
            if step.uses_file_pipe() {
                let _ = tokio::fs::remove_file(step.file_pipe_path()).await;
            }
            return Err(EngineError::Executor(error));
        }

        let body = self
            .run_step_body(job, &step, stdout_reader, stderr_reader)
            .await;

        if let Err(error) = self.executor.clean_up(job).await {
            tracing::warn!(job_id = %job.id, %error, "container clean up failed");
        }

        if step.uses_file_pipe() {
            let _ = tokio::fs::remove_file(step.file_pipe_path()).await;
        }

        body
    }

    /// Drain stdout/stderr concurrently, wait for the container to exit,
    /// and produce the carried stdin for the next step.
    async fn run_step_body(
        &self,
        job: &Job,
        step: &JobStep,
        stdout_reader: impl tokio::io::AsyncRead + Send + Unpin + 'static,
        stderr_reader: impl tokio::io::AsyncRead + Send + Unpin + 'static,
    ) -> Result<StdinSource, EngineError> {
        let job_id = job.id.clone();
        let step_output = Arc::new(Mutex::new(Vec::<u8>::new()));

        let stdout_sink = matches!(step.pipe_mode(), PipeMode::Stdout)
            .then(|| (step_output.clone(), LineFilter::new(step)));
        let stderr_sink = matches!(step.pipe_mode(), PipeMode::Stderr)
            .then(|| (step_output.clone(), LineFilter::new(step)));

        let stdout_repo = self.repository.clone();
        let stdout_job_id = job_id.clone();
        let stdout_task = tokio::spawn(async move {
            capture::run_capture(stdout_reader, stdout_repo, stdout_job_id, stdout_sink).await;
        });

        let stderr_repo = self.repository.clone();
        let stderr_job_id = job_id.clone();
        let stderr_task = tokio::spawn(async move {
            capture::run_capture(stderr_reader, stderr_repo, stderr_job_id, stderr_sink).await;
        });

        let (stdout_joined, stderr_joined) = tokio::join!(stdout_task, stderr_task);
        if stdout_joined.is_err() || stderr_joined.is_err() {
            tracing::warn!(%job_id, "a capture task panicked");
        }

        self.executor.inspect(job).await.map_err(EngineError::Executor)?;

        if step.uses_file_pipe() {
            let contents = tokio::fs::read(step.file_pipe_path())
                .await
                .map_err(EngineError::Io)?;
            return Ok(Box::new(Cursor::new(contents)));
        }

        let bytes = Arc::try_unwrap(step_output)
            .map(Mutex::into_inner)
            .unwrap_or_else(|shared| shared.lock().clone());
        Ok(Box::new(Cursor::new(bytes)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dray_core::{EnvVar, FakeClock, JobConfig, JobStep};
    use dray_executor::{ExecutorError, FakeContainerExecutor, StepScript};
    use dray_storage::InMemoryRepository;

    use super::*;

    fn engine(
        repository: Arc<dyn Repository>,
        executor: Arc<FakeContainerExecutor>,
        clock: Arc<FakeClock>,
    ) -> Engine {
        Engine::new(repository, executor, clock)
    }

    fn step(name: &str, output: &str) -> JobStep {
        JobStep {
            name: name.to_string(),
            source: "img".to_string(),
            output: output.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn zero_step_job_completes_without_touching_the_executor() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let job = Job::new(
            JobConfig {
                name: "empty".into(),
                steps: vec![],
                environment: vec![],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");

        engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await
            .expect("execute");

        assert_eq!(executor.start_count(), 0);
        let fetched = repo.get(&id).await.expect("get");
        assert_eq!(fetched.status, JobStatus::Complete);
    }

    #[tokio::test]
    async fn single_step_stdout_is_captured_and_job_completes() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let job = Job::new(
            JobConfig {
                name: "one-step".into(),
                steps: vec![step("build", "")],
                environment: vec![],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");
        executor.script(id.as_str(), 0, StepScript::stdout_lines(["hello", "world"]));

        engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await
            .expect("execute");

        let fetched = repo.get(&id).await.expect("get");
        assert_eq!(fetched.status, JobStatus::Complete);
        assert_eq!(fetched.steps_completed, 1);
        assert_eq!(executor.clean_up_count(), 1);
        let log = repo.get_job_log(&id, 0).await.expect("log");
        assert_eq!(log, vec!["hello", "world"]);
    }

    #[tokio::test]
    async fn two_step_pipe_feeds_first_steps_stdout_into_second_steps_stdin() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let job = Job::new(
            JobConfig {
                name: "pipe".into(),
                steps: vec![step("producer", ""), step("consumer", "")],
                environment: vec![],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");
        executor.script(id.as_str(), 0, StepScript::stdout_lines(["xy"]));
        executor.script_dynamic(id.as_str(), 1, |stdin| {
            let received = String::from_utf8_lossy(&stdin).trim().to_string();
            StepScript::stdout_lines([format!("got:{received}")])
        });

        engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await
            .expect("execute");

        let log = repo.get_job_log(&id, 0).await.expect("log");
        assert!(log.contains(&"got:xy".to_string()));
    }

    #[tokio::test]
    async fn delimited_capture_only_keeps_lines_between_markers() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let mut producer = step("producer", "");
        producer.begin_delimiter = "BEGIN".into();
        producer.end_delimiter = "END".into();
        let job = Job::new(
            JobConfig {
                name: "delimited".into(),
                steps: vec![producer, step("consumer", "")],
                environment: vec![],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");
        executor.script(
            id.as_str(),
            0,
            StepScript::stdout_lines(["noise", "BEGIN", "payload", "END", "more noise"]),
        );
        executor.script_dynamic(id.as_str(), 1, |stdin| {
            StepScript::stdout_lines([String::from_utf8_lossy(&stdin).trim().to_string()])
        });

        engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await
            .expect("execute");

        let log = repo.get_job_log(&id, 0).await.expect("log");
        assert!(log.contains(&"payload".to_string()));
        assert!(log.contains(&"noise".to_string()));
        assert!(log.contains(&"more noise".to_string()));
    }

    #[tokio::test]
    async fn file_pipe_mode_carries_the_written_file_as_stdin() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let mut producer = step("producer", "/out/data");
        producer.source = "file-pipe-carries-stdin".into();
        let job = Job::new(
            JobConfig {
                name: "file-pipe".into(),
                steps: vec![producer, step("consumer", "")],
                environment: vec![],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");
        executor.script(
            id.as_str(),
            0,
            StepScript {
                file_contents: Some(b"payload-bytes".to_vec()),
                ..Default::default()
            },
        );
        executor.script_dynamic(id.as_str(), 1, |stdin| {
            StepScript::stdout_lines([String::from_utf8_lossy(&stdin).to_string()])
        });

        engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await
            .expect("execute");

        let log = repo.get_job_log(&id, 0).await.expect("log");
        assert!(log.contains(&"payload-bytes".to_string()));
    }

    #[tokio::test]
    async fn step_failure_still_cleans_up_and_marks_the_job_errored() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let job = Job::new(
            JobConfig {
                name: "fails".into(),
                steps: vec![step("build", ""), step("never-runs", "")],
                environment: vec![],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");
        executor.script(
            id.as_str(),
            0,
            StepScript {
                exit_code: 1,
                ..Default::default()
            },
        );

        let result = engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await;

        assert!(matches!(
            result,
            Err(EngineError::Executor(ExecutorError::ExitCode(1)))
        ));
        assert_eq!(executor.start_count(), 1);
        assert_eq!(executor.clean_up_count(), 1);
        let fetched = repo.get(&id).await.expect("get");
        assert_eq!(fetched.status, JobStatus::Error);
        assert_eq!(fetched.steps_completed, 0);
    }

    #[tokio::test]
    async fn start_failure_cleans_up_the_file_pipe_and_does_not_call_clean_up() {
        let repo: Arc<dyn Repository> = Arc::new(InMemoryRepository::new());
        let executor = Arc::new(FakeContainerExecutor::new());
        let clock = Arc::new(FakeClock::default());
        let mut producer = step("producer", "/out/data");
        producer.source = "start-failure-cleans-up-file-pipe".into();
        let job = Job::new(
            JobConfig {
                name: "start-fails".into(),
                steps: vec![producer],
                environment: vec![EnvVar::new("K", "V")],
            },
            &*clock,
        );
        let id = job.id.clone();
        repo.create(job.clone()).await.expect("create");
        executor.script(
            id.as_str(),
            0,
            StepScript {
                start_error: Some("no image".into()),
                ..Default::default()
            },
        );

        let result = engine(repo.clone(), executor.clone(), clock)
            .execute(job)
            .await;

        assert!(result.is_err());
        assert_eq!(executor.clean_up_count(), 0);
    }
}
