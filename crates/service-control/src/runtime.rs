//! Service runtime abstraction for testability.
//!
//! The [`ServiceRuntime`] trait abstracts the container engine, allowing
//! production code to use [`DockerRuntime`] while tests use `MockRuntime`.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐   ┌─────────────────┐
//! │ ServiceController │   │ ReadinessProber │
//! └─────────┬─────────┘   └────────┬────────┘
//!           └───────────┬──────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │ServiceRuntime│ (trait)
//!               └──────────────┘
//!                  │        │
//!                  ▼        ▼
//!            ┌────────┐ ┌──────┐
//!            │ Docker │ │ Mock │
//!            └───┬────┘ └──────┘
//!                │
//!                ▼
//!     Docker daemon + `docker compose`
//! ```
//!
//! # Service Name Validation
//!
//! All methods that accept service names validate them before touching the
//! engine or spawning a process:
//! - Must be 1-64 characters
//! - Must contain only ASCII alphanumerics, `-`, `_` or `.`
//! - Must not start with `-` (would be parsed as a CLI flag)

use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use ingest_chaos_core::types::LifecycleState;
use tracing::debug;

use crate::config::ControllerConfig;
use crate::error::ControlError;

/// HTTP 304 Not Modified: the container is already in the requested state.
const STATUS_NOT_MODIFIED: u16 = 304;
const STATUS_NOT_FOUND: u16 = 404;

/// Validates a service name to prevent flag and path injection.
pub fn validate_service_name(name: &str) -> Result<(), ControlError> {
    if name.is_empty() || name.len() > 64 {
        return Err(ControlError::InvalidName {
            name: name.to_owned(),
            reason: format!("length {} (must be 1-64)", name.len()),
        });
    }
    if name.starts_with('-') {
        return Err(ControlError::InvalidName {
            name: name.to_owned(),
            reason: "must not start with '-'".to_owned(),
        });
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(ControlError::InvalidName {
            name: name.to_owned(),
            reason: "contains characters other than [A-Za-z0-9._-]".to_owned(),
        });
    }
    Ok(())
}

/// Output of a command executed inside a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// Process exit code (`-1` when the engine did not report one).
    pub exit_code: i64,
    /// Combined stdout and stderr.
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Trait abstracting service lifecycle operations.
///
/// Services are addressed by their logical name (the compose service name),
/// never by engine-specific IDs.
///
/// # Idempotency
///
/// `stop` on a stopped service and `start_existing` on a running one must
/// succeed without side effects.
///
/// # Implementations
///
/// - [`DockerRuntime`]: bollard for container operations, the compose CLI for
///   creating missing containers
/// - `MockRuntime`: configurable in-memory runtime (tests only)
pub trait ServiceRuntime: Send + Sync + 'static {
    /// Checks engine connectivity.
    fn ping(&self) -> impl Future<Output = Result<(), ControlError>> + Send;

    /// Reports the current lifecycle state of a service.
    fn state(
        &self,
        service: &str,
    ) -> impl Future<Output = Result<LifecycleState, ControlError>> + Send;

    /// Halts a service. Returns once the engine has acknowledged the request.
    fn stop(&self, service: &str) -> impl Future<Output = Result<(), ControlError>> + Send;

    /// Resumes an existing, stopped service (the cheap path).
    fn start_existing(&self, service: &str)
    -> impl Future<Output = Result<(), ControlError>> + Send;

    /// Creates the service from its definition and starts it.
    fn create_and_start(
        &self,
        service: &str,
    ) -> impl Future<Output = Result<(), ControlError>> + Send;

    /// Returns the last `tail` lines of combined stdout/stderr.
    fn logs(
        &self,
        service: &str,
        tail: usize,
    ) -> impl Future<Output = Result<String, ControlError>> + Send;

    /// Runs a command inside a running service.
    fn exec(
        &self,
        service: &str,
        cmd: &[String],
    ) -> impl Future<Output = Result<ExecOutput, ControlError>> + Send;
}

/// Production runtime backed by the Docker engine.
///
/// Containers follow the compose naming convention `{project}-{service}-1`.
/// Missing containers are created with `docker compose -p <project> -f ... up -d <service>`.
pub struct DockerRuntime {
    docker: Arc<bollard::Docker>,
    config: ControllerConfig,
}

impl DockerRuntime {
    /// Connects to Docker using the configured socket, or the platform default
    /// when the socket path is empty.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::DockerConnection` if the client cannot be created.
    pub fn connect(config: ControllerConfig) -> Result<Self, ControlError> {
        let docker = if config.docker_socket.is_empty() {
            bollard::Docker::connect_with_local_defaults().map_err(|e| {
                ControlError::DockerConnection(format!("failed to connect to docker: {e}"))
            })?
        } else {
            bollard::Docker::connect_with_socket(
                &config.docker_socket,
                120,
                bollard::API_DEFAULT_VERSION,
            )
            .map_err(|e| {
                ControlError::DockerConnection(format!(
                    "failed to connect to docker at {}: {e}",
                    config.docker_socket
                ))
            })?
        };
        Ok(Self {
            docker: Arc::new(docker),
            config,
        })
    }

    fn container(&self, service: &str) -> Result<String, ControlError> {
        validate_service_name(service)?;
        Ok(self.config.container_name(service))
    }

    fn map_error(service: &str, operation: &str, err: bollard::errors::Error) -> ControlError {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: STATUS_NOT_FOUND,
                ..
            } => ControlError::NotFound(service.to_owned()),
            other => ControlError::operation(service, operation, other.to_string()),
        }
    }

    fn is_not_modified(err: &bollard::errors::Error) -> bool {
        matches!(
            err,
            bollard::errors::Error::DockerResponseServerError {
                status_code: STATUS_NOT_MODIFIED,
                ..
            }
        )
    }
}

impl ServiceRuntime for DockerRuntime {
    async fn ping(&self) -> Result<(), ControlError> {
        self.docker
            .ping()
            .await
            .map_err(|e| ControlError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }

    async fn state(&self, service: &str) -> Result<LifecycleState, ControlError> {
        use bollard::container::InspectContainerOptions;

        let container = self.container(service)?;
        let details = match self
            .docker
            .inspect_container(&container, None::<InspectContainerOptions>)
            .await
        {
            Ok(details) => details,
            Err(e) => {
                return match Self::map_error(service, "inspect", e) {
                    // 컨테이너가 아직 없으면 정지 상태로 취급
                    ControlError::NotFound(_) => Ok(LifecycleState::Stopped),
                    other => Err(other),
                };
            }
        };

        let running = details.state.and_then(|s| s.running);
        Ok(match running {
            Some(true) => LifecycleState::Running,
            Some(false) => LifecycleState::Stopped,
            None => LifecycleState::Unknown,
        })
    }

    async fn stop(&self, service: &str) -> Result<(), ControlError> {
        use bollard::container::StopContainerOptions;

        let container = self.container(service)?;
        let grace = i64::try_from(self.config.stop_grace_secs).unwrap_or(10);
        match self
            .docker
            .stop_container(&container, Some(StopContainerOptions { t: grace }))
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if Self::is_not_modified(&e) => {
                debug!(service, "already stopped");
                Ok(())
            }
            Err(e) => match Self::map_error(service, "stop", e) {
                ControlError::NotFound(_) => {
                    debug!(service, "no container to stop");
                    Ok(())
                }
                other => Err(other),
            },
        }
    }

    async fn start_existing(&self, service: &str) -> Result<(), ControlError> {
        use bollard::container::StartContainerOptions;

        let container = self.container(service)?;
        match self
            .docker
            .start_container(&container, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if Self::is_not_modified(&e) => {
                debug!(service, "already running");
                Ok(())
            }
            Err(e) => Err(Self::map_error(service, "start", e)),
        }
    }

    async fn create_and_start(&self, service: &str) -> Result<(), ControlError> {
        validate_service_name(service)?;

        let mut command = tokio::process::Command::new(&self.config.compose_program);
        command
            .arg("compose")
            .arg("-p")
            .arg(&self.config.compose_project);
        for file in &self.config.compose_files {
            command.arg("-f").arg(file);
        }
        command.arg("up").arg("-d").arg(service);
        command.kill_on_drop(true);

        let output = command.output().await.map_err(|e| ControlError::Command {
            program: self.config.compose_program.clone(),
            reason: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ControlError::operation(
                service,
                "create",
                format!("compose up exited with {}: {}", output.status, stderr.trim()),
            ));
        }
        Ok(())
    }

    async fn logs(&self, service: &str, tail: usize) -> Result<String, ControlError> {
        use bollard::container::LogsOptions;

        let container = self.container(service)?;
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            ..Default::default()
        };

        let mut stream = std::pin::pin!(self.docker.logs(&container, Some(options)));
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Self::map_error(service, "logs", e))?;
            text.push_str(&chunk.to_string());
        }
        Ok(text)
    }

    async fn exec(&self, service: &str, cmd: &[String]) -> Result<ExecOutput, ControlError> {
        use bollard::exec::{CreateExecOptions, StartExecResults};

        let container = self.container(service)?;
        let exec = self
            .docker
            .create_exec(
                &container,
                CreateExecOptions::<String> {
                    cmd: Some(cmd.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| Self::map_error(service, "exec", e))?;

        let mut text = String::new();
        match self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| Self::map_error(service, "exec", e))?
        {
            StartExecResults::Attached { mut output, .. } => {
                while let Some(chunk) = output.next().await {
                    let chunk = chunk.map_err(|e| Self::map_error(service, "exec", e))?;
                    text.push_str(&chunk.to_string());
                }
            }
            StartExecResults::Detached => {}
        }

        let inspect = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| Self::map_error(service, "exec", e))?;

        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(-1),
            output: text,
        })
    }
}

/// 테스트용 Mock 런타임
///
/// 서비스 상태를 메모리에 유지하고, 호출 기록과 실패 주입을 지원합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockRuntime {
    /// 서비스별 상태
    pub states: tokio::sync::Mutex<std::collections::HashMap<String, LifecycleState>>,
    /// `svc:op` 형식의 호출 기록
    pub calls: tokio::sync::Mutex<Vec<String>>,
    /// 서비스별 로그 응답 (마지막 항목은 계속 반복)
    pub log_script: tokio::sync::Mutex<
        std::collections::HashMap<String, std::collections::VecDeque<Result<String, String>>>,
    >,
    pub fail_stop: bool,
    pub fail_start_existing: bool,
    pub fail_create: bool,
    pub exec_exit_code: i64,
    /// 각 조작을 지연시킬 시간
    pub delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, name: &str, state: LifecycleState) -> Self {
        self.states.get_mut().insert(name.to_owned(), state);
        self
    }

    /// 로그 응답 순서를 지정합니다. `Err`는 샘플 실패를 뜻합니다.
    pub fn with_logs(mut self, name: &str, script: Vec<Result<&str, &str>>) -> Self {
        let script = script
            .into_iter()
            .map(|r| r.map(str::to_owned).map_err(str::to_owned))
            .collect();
        self.log_script.get_mut().insert(name.to_owned(), script);
        self
    }

    pub fn with_failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn with_failing_start_existing(mut self) -> Self {
        self.fail_start_existing = true;
        self
    }

    pub fn with_failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn with_exec_exit_code(mut self, code: i64) -> Self {
        self.exec_exit_code = code;
        self
    }

    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, service: &str, op: &str) {
        self.calls.lock().await.push(format!("{service}:{op}"));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
impl ServiceRuntime for MockRuntime {
    async fn ping(&self) -> Result<(), ControlError> {
        Ok(())
    }

    async fn state(&self, service: &str) -> Result<LifecycleState, ControlError> {
        Ok(self
            .states
            .lock()
            .await
            .get(service)
            .copied()
            .unwrap_or(LifecycleState::Unknown))
    }

    async fn stop(&self, service: &str) -> Result<(), ControlError> {
        validate_service_name(service)?;
        self.record(service, "stop").await;
        if self.fail_stop {
            return Err(ControlError::operation(service, "stop", "mock failure"));
        }
        self.states
            .lock()
            .await
            .insert(service.to_owned(), LifecycleState::Stopped);
        Ok(())
    }

    async fn start_existing(&self, service: &str) -> Result<(), ControlError> {
        validate_service_name(service)?;
        self.record(service, "start_existing").await;
        if self.fail_start_existing {
            return Err(ControlError::NotFound(service.to_owned()));
        }
        self.states
            .lock()
            .await
            .insert(service.to_owned(), LifecycleState::Running);
        Ok(())
    }

    async fn create_and_start(&self, service: &str) -> Result<(), ControlError> {
        validate_service_name(service)?;
        self.record(service, "create_and_start").await;
        if self.fail_create {
            return Err(ControlError::operation(service, "create", "mock failure"));
        }
        self.states
            .lock()
            .await
            .insert(service.to_owned(), LifecycleState::Running);
        Ok(())
    }

    async fn logs(&self, service: &str, _tail: usize) -> Result<String, ControlError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut scripts = self.log_script.lock().await;
        let Some(script) = scripts.get_mut(service) else {
            return Ok(String::new());
        };
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(ControlError::operation(service, "logs", reason)),
            None => Ok(String::new()),
        }
    }

    async fn exec(&self, service: &str, cmd: &[String]) -> Result<ExecOutput, ControlError> {
        validate_service_name(service)?;
        self.record(service, &format!("exec {}", cmd.join(" "))).await;
        Ok(ExecOutput {
            exit_code: self.exec_exit_code,
            output: String::new(),
        })
    }
}
