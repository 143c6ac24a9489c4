// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker-backed [`ContainerExecutor`], built on `bollard`.

use async_trait::async_trait;
use bollard::container::{
    AttachContainerOptions, Config, CreateContainerOptions, LogOutput, RemoveContainerOptions,
    WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::Docker;
use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use dray_core::{stringify_environment, Job};

use crate::error::ExecutorError;
use crate::executor::{ContainerExecutor, StdinSource, StdoutSink};

fn driver(e: impl std::fmt::Display) -> ExecutorError {
    ExecutorError::Driver(e.to_string())
}

/// Production [`ContainerExecutor`] driving a local or remote Docker daemon.
pub struct DockerExecutor {
    docker: Docker,
}

impl DockerExecutor {
    /// Connect using `DOCKER_HOST`, falling back to the local Unix socket.
    pub fn connect(docker_host: &str) -> Result<Self, ExecutorError> {
        let docker = Docker::connect_with_unix(docker_host, 120, bollard::API_DEFAULT_VERSION)
            .map_err(driver)?;
        Ok(Self { docker })
    }

    fn container_name(job: &Job) -> String {
        format!("dray-{}-{}", job.id.as_str(), job.steps_completed)
    }

    async fn ensure_image(&self, source: &str, refresh: bool) -> Result<(), ExecutorError> {
        let previous_digest = self.docker.inspect_image(source).await.ok().and_then(|i| i.id);

        if previous_digest.is_none() || refresh {
            let mut pull = self.docker.create_image(
                Some(CreateImageOptions {
                    from_image: source,
                    ..Default::default()
                }),
                None,
                None,
            );
            while let Some(progress) = pull.next().await {
                progress.map_err(driver)?;
            }
        }

        if refresh {
            if let (Some(old_id), Ok(new_info)) = (
                previous_digest,
                self.docker.inspect_image(source).await,
            ) {
                if new_info.id.as_deref() != Some(old_id.as_str()) {
                    let _ = self.docker.remove_image(&old_id, None, None).await;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ContainerExecutor for DockerExecutor {
    async fn start(
        &self,
        job: &mut Job,
        mut stdin: StdinSource,
        mut stdout: StdoutSink,
        mut stderr: StdoutSink,
    ) -> Result<(), ExecutorError> {
        let step = job
            .current_step()
            .ok_or_else(|| ExecutorError::Driver("no current step".into()))?
            .clone();

        self.ensure_image(&step.source, step.refresh).await?;

        let env = stringify_environment(&job.current_step_environment());
        let binds = if step.uses_file_pipe() {
            Some(vec![format!(
                "{}:{}",
                step.file_pipe_path(),
                step.output
            )])
        } else {
            None
        };

        let name = Self::container_name(job);
        let config = Config {
            image: Some(step.source.clone()),
            env: Some(env),
            open_stdin: Some(true),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            stdin_once: Some(true),
            tty: Some(false),
            host_config: binds.map(|binds| HostConfig {
                binds: Some(binds),
                ..Default::default()
            }),
            ..Default::default()
        };

        let container = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.clone(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(driver)?;

        let mut attach = self
            .docker
            .attach_container(
                &name,
                Some(AttachContainerOptions::<String> {
                    stdin: Some(true),
                    stdout: Some(true),
                    stderr: Some(true),
                    stream: Some(true),
                    logs: Some(false),
                    ..Default::default()
                }),
            )
            .await
            .map_err(driver)?;

        self.docker
            .start_container::<String>(&name, None)
            .await
            .map_err(driver)?;

        // Forward the previous step's captured output into the container's
        // stdin, then demultiplex the container's combined stdout/stderr
        // stream into the two writer halves the engine gave us. Both
        // writers are shut down when the attach stream ends, which is how
        // the engine's capture tasks learn the step is done.
        tokio::spawn(async move {
            let mut input = attach.input;
            let mut buf = [0u8; 8192];
            loop {
                match stdin.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if input.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
            let _ = input.shutdown().await;
            drop(input);

            while let Some(chunk) = attach.output.next().await {
                match chunk {
                    Ok(LogOutput::StdOut { message }) => {
                        let _ = stdout.write_all(&message).await;
                    }
                    Ok(LogOutput::StdErr { message }) => {
                        let _ = stderr.write_all(&message).await;
                    }
                    Ok(LogOutput::Console { message }) => {
                        let _ = stdout.write_all(&message).await;
                    }
                    Ok(LogOutput::StdIn { .. }) | Err(_) => {}
                }
            }
            let _ = stdout.shutdown().await;
            let _ = stderr.shutdown().await;
        });

        if let Some(current) = job.current_step_mut() {
            current.id = Some(container.id);
        }
        Ok(())
    }

    async fn inspect(&self, job: &Job) -> Result<(), ExecutorError> {
        let name = Self::container_name(job);
        let mut wait = self.docker.wait_container(
            &name,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        while let Some(result) = wait.next().await {
            if let Err(e) = result {
                // bollard surfaces a "container already stopped" response as
                // an error on some daemon versions; fall through to inspect.
                tracing::debug!(error = %e, "wait_container returned before inspect");
            }
        }

        let inspect = self
            .docker
            .inspect_container(&name, None)
            .await
            .map_err(driver)?;
        let exit_code = inspect
            .state
            .and_then(|s| s.exit_code)
            .ok_or_else(|| ExecutorError::Driver("container has no exit state".into()))?;

        if exit_code != 0 {
            return Err(ExecutorError::ExitCode(exit_code));
        }
        Ok(())
    }

    async fn clean_up(&self, job: &Job) -> Result<(), ExecutorError> {
        let name = Self::container_name(job);
        match self
            .docker
            .remove_container(
                &name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(e) => Err(driver(e)),
        }
    }
}
