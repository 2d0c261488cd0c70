//! 서비스 컨트롤러 -- 이름으로 식별되는 외부 서비스의 생명주기 제어
//!
//! [`ServiceController`]는 [`ServiceRuntime`] 위에서 멱등 `stop` / `start` / `restart`를
//! 제공하고, 서비스별 [`ServiceHandle`] 상태를 추적합니다.
//!
//! 조작은 엔진이 요청을 처리하면 반환됩니다. 서비스가 실제로 준비되었는지는
//! [`ReadinessProber`](crate::readiness::ReadinessProber)가 확인합니다.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ingest_chaos_core::metrics as m;
use ingest_chaos_core::types::{LifecycleState, ServiceHandle};
use metrics::counter;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::ControllerConfig;
use crate::error::ControlError;
use crate::runtime::{ExecOutput, ServiceRuntime};

/// 서비스 컨트롤러
pub struct ServiceController<R: ServiceRuntime> {
    runtime: Arc<R>,
    action_timeout: Duration,
    handles: Mutex<HashMap<String, ServiceHandle>>,
}

impl<R: ServiceRuntime> ServiceController<R> {
    /// 새 서비스 컨트롤러를 생성합니다.
    pub fn new(runtime: Arc<R>, config: &ControllerConfig) -> Self {
        Self {
            runtime,
            action_timeout: config.action_timeout(),
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// 내부 런타임을 반환합니다.
    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    /// 서비스를 정지합니다. 이미 정지된 서비스에 대해서는 아무 일도 하지 않고 성공합니다.
    pub async fn stop(&self, name: &str) -> Result<(), ControlError> {
        info!(service = name, "stopping service");
        let result = self.timed(name, "stop", self.runtime.stop(name)).await;
        self.settle(name, "stop", &result, LifecycleState::Stopped)
            .await;
        result
    }

    /// 서비스를 시작합니다.
    ///
    /// 기존 컨테이너 재개를 먼저 시도하고, 실패하면 생성 후 시작으로 넘어갑니다.
    /// 두 경로가 모두 실패해야 에러를 반환합니다.
    pub async fn start(&self, name: &str) -> Result<(), ControlError> {
        info!(service = name, "starting service");
        let resumed = self
            .timed(name, "start", self.runtime.start_existing(name))
            .await;

        let result = match resumed {
            Ok(()) => Ok(()),
            Err(ControlError::InvalidName { .. }) => resumed,
            Err(e) => {
                warn!(
                    service = name,
                    error = %e,
                    "resume failed, falling back to create-and-start"
                );
                self.timed(name, "create", self.runtime.create_and_start(name))
                    .await
                    .map_err(|fallback| {
                        ControlError::operation(
                            name,
                            "start",
                            format!("resume failed ({e}); create-and-start failed ({fallback})"),
                        )
                    })
            }
        };

        self.settle(name, "start", &result, LifecycleState::Running)
            .await;
        result
    }

    /// 서비스를 재시작합니다 (stop 후 start).
    pub async fn restart(&self, name: &str) -> Result<(), ControlError> {
        info!(service = name, "restarting service");
        self.stop(name)
            .await
            .map_err(|e| ControlError::operation(name, "restart", e.to_string()))?;
        self.start(name)
            .await
            .map_err(|e| ControlError::operation(name, "restart", e.to_string()))
    }

    /// 서비스 로그의 마지막 `tail` 줄을 가져옵니다.
    pub async fn logs(&self, name: &str, tail: usize) -> Result<String, ControlError> {
        self.timed(name, "logs", self.runtime.logs(name, tail)).await
    }

    /// 서비스 안에서 명령을 실행합니다. 0이 아닌 종료 코드는 에러입니다.
    pub async fn exec(&self, name: &str, cmd: &[String]) -> Result<ExecOutput, ControlError> {
        info!(service = name, command = cmd.join(" "), "executing in service");
        let result = self
            .timed(name, "exec", self.runtime.exec(name, cmd))
            .await
            .and_then(|output| {
                if output.success() {
                    Ok(output)
                } else {
                    Err(ControlError::operation(
                        name,
                        "exec",
                        format!("exit code {}: {}", output.exit_code, output.output.trim()),
                    ))
                }
            });
        record_action(name, "exec", result.is_ok());
        result
    }

    /// 서비스 핸들을 반환합니다. 처음 참조되면 `Unknown` 상태로 생성됩니다.
    pub async fn handle(&self, name: &str) -> ServiceHandle {
        self.handles
            .lock()
            .await
            .entry(name.to_owned())
            .or_insert_with(|| ServiceHandle::new(name))
            .clone()
    }

    /// 지금까지 참조된 모든 서비스 핸들을 이름순으로 반환합니다.
    pub async fn handles(&self) -> Vec<ServiceHandle> {
        let mut handles: Vec<_> = self.handles.lock().await.values().cloned().collect();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    /// 런타임에 실제 상태를 물어 핸들을 갱신합니다. 조회에 실패하면 `Unknown`입니다.
    ///
    /// 하네스 밖에서 서비스가 멈추거나 실패한 조작이 실제로는 반영된 경우를
    /// 바로잡습니다.
    pub async fn refresh(&self, name: &str) -> ServiceHandle {
        let state = match self.timed(name, "state", self.runtime.state(name)).await {
            Ok(state) => state,
            Err(e) => {
                warn!(service = name, error = %e, "service state query failed");
                LifecycleState::Unknown
            }
        };
        let mut handles = self.handles.lock().await;
        let handle = handles
            .entry(name.to_owned())
            .or_insert_with(|| ServiceHandle::new(name));
        handle.state = state;
        handle.clone()
    }

    /// 지금까지 참조된 모든 서비스를 [`refresh`](Self::refresh)하고 이름순으로 반환합니다.
    pub async fn refresh_all(&self) -> Vec<ServiceHandle> {
        let names: Vec<String> = self.handles.lock().await.keys().cloned().collect();
        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            handles.push(self.refresh(&name).await);
        }
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        handles
    }

    /// 런타임 조작을 타임아웃으로 감쌉니다.
    async fn timed<T>(
        &self,
        name: &str,
        operation: &str,
        fut: impl Future<Output = Result<T, ControlError>>,
    ) -> Result<T, ControlError> {
        match tokio::time::timeout(self.action_timeout, fut).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ControlError::Timeout {
                service: name.to_owned(),
                operation: operation.to_owned(),
                after: self.action_timeout,
            }),
        }
    }

    /// 조작 결과를 핸들 상태와 메트릭에 반영합니다.
    async fn settle(
        &self,
        name: &str,
        action: &str,
        result: &Result<(), ControlError>,
        on_success: LifecycleState,
    ) {
        let state = if result.is_ok() {
            on_success
        } else {
            LifecycleState::Unknown
        };
        self.handles
            .lock()
            .await
            .entry(name.to_owned())
            .or_insert_with(|| ServiceHandle::new(name))
            .state = state;

        record_action(name, action, result.is_ok());
        match result {
            Ok(()) => info!(service = name, action, state = %state, "service action completed"),
            Err(e) => warn!(service = name, action, error = %e, "service action failed"),
        }
    }
}

fn record_action(service: &str, action: &str, success: bool) {
    counter!(
        m::SERVICE_ACTIONS_TOTAL,
        m::LABEL_SERVICE => service.to_owned(),
        m::LABEL_ACTION => action.to_owned(),
        m::LABEL_RESULT => if success { "success" } else { "failure" },
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    fn controller(runtime: MockRuntime) -> ServiceController<MockRuntime> {
        ServiceController::new(Arc::new(runtime), &ControllerConfig::default())
    }

    #[tokio::test]
    async fn stop_marks_handle_stopped() {
        let ctl = controller(MockRuntime::new().with_service("redis", LifecycleState::Running));
        ctl.stop("redis").await.unwrap();
        assert_eq!(ctl.handle("redis").await.state, LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let ctl = controller(MockRuntime::new());
        ctl.stop("redis").await.unwrap();
        ctl.stop("redis").await.unwrap();
        assert_eq!(ctl.handle("redis").await.state, LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn start_uses_cheap_path_first() {
        let ctl = controller(MockRuntime::new());
        ctl.start("anvil").await.unwrap();
        assert_eq!(ctl.runtime().calls().await, vec!["anvil:start_existing"]);
        assert_eq!(ctl.handle("anvil").await.state, LifecycleState::Running);
    }

    #[tokio::test]
    async fn start_falls_back_to_create() {
        let ctl = controller(MockRuntime::new().with_failing_start_existing());
        ctl.start("anvil").await.unwrap();
        assert_eq!(
            ctl.runtime().calls().await,
            vec!["anvil:start_existing", "anvil:create_and_start"]
        );
        assert_eq!(ctl.handle("anvil").await.state, LifecycleState::Running);
    }

    #[tokio::test]
    async fn start_fails_only_after_both_paths() {
        let ctl = controller(
            MockRuntime::new()
                .with_failing_start_existing()
                .with_failing_create(),
        );
        let err = ctl.start("anvil").await.unwrap_err();
        assert_eq!(ctl.runtime().calls().await.len(), 2);
        let msg = err.to_string();
        assert!(msg.contains("anvil"));
        assert!(msg.contains("create-and-start failed"));
        assert_eq!(ctl.handle("anvil").await.state, LifecycleState::Unknown);
    }

    #[tokio::test]
    async fn start_does_not_fall_back_on_invalid_name() {
        let ctl = controller(MockRuntime::new());
        assert!(matches!(
            ctl.start("-x").await,
            Err(ControlError::InvalidName { .. })
        ));
        assert!(ctl.runtime().calls().await.is_empty());
    }

    #[tokio::test]
    async fn restart_is_stop_then_start() {
        let ctl = controller(MockRuntime::new().with_service("api", LifecycleState::Running));
        ctl.restart("api").await.unwrap();
        assert_eq!(
            ctl.runtime().calls().await,
            vec!["api:stop", "api:start_existing"]
        );
        assert_eq!(ctl.handle("api").await.state, LifecycleState::Running);
    }

    #[tokio::test]
    async fn restart_reports_stop_failure() {
        let ctl = controller(MockRuntime::new().with_failing_stop());
        let err = ctl.restart("api").await.unwrap_err();
        assert!(matches!(err, ControlError::Operation { ref operation, .. } if operation == "restart"));
        assert_eq!(ctl.runtime().calls().await, vec!["api:stop"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_action_times_out() {
        let config = crate::config::ControllerConfigBuilder::new()
            .action_timeout_secs(1)
            .build()
            .unwrap();
        let runtime = MockRuntime::new().with_delay(Duration::from_secs(5));
        let ctl = ServiceController::new(Arc::new(runtime), &config);

        let err = ctl.stop("redis").await.unwrap_err();
        assert!(matches!(err, ControlError::Timeout { .. }));
        assert_eq!(ctl.handle("redis").await.state, LifecycleState::Unknown);
    }

    #[tokio::test]
    async fn exec_non_zero_exit_is_error() {
        let ctl = controller(MockRuntime::new().with_exec_exit_code(1));
        let cmd = vec!["psql".to_owned(), "-c".to_owned(), "SELECT 1".to_owned()];
        let err = ctl.exec("postgres", &cmd).await.unwrap_err();
        assert!(err.to_string().contains("exit code 1"));
    }

    #[tokio::test]
    async fn refresh_reads_engine_state() {
        let ctl = controller(MockRuntime::new().with_service("redis", LifecycleState::Running));
        assert_eq!(ctl.handle("redis").await.state, LifecycleState::Unknown);

        let handle = ctl.refresh("redis").await;
        assert_eq!(handle.state, LifecycleState::Running);
        assert_eq!(ctl.handle("redis").await.state, LifecycleState::Running);
    }

    #[tokio::test]
    async fn refresh_all_sees_out_of_band_stop() {
        let ctl = controller(MockRuntime::new());
        ctl.start("api").await.unwrap();
        ctl.start("anvil").await.unwrap();
        // 컨트롤러를 거치지 않은 정지
        ctl.runtime().stop("api").await.unwrap();
        assert_eq!(ctl.handle("api").await.state, LifecycleState::Running);

        let handles = ctl.refresh_all().await;
        let states: Vec<_> = handles.iter().map(|h| (h.name.as_str(), h.state)).collect();
        assert_eq!(
            states,
            vec![
                ("anvil", LifecycleState::Running),
                ("api", LifecycleState::Stopped),
            ]
        );
    }

    #[tokio::test]
    async fn refresh_recovers_unknown_after_failed_action() {
        let ctl = controller(MockRuntime::new().with_failing_stop());
        ctl.start("redis").await.unwrap();
        assert!(ctl.stop("redis").await.is_err());
        assert_eq!(ctl.handle("redis").await.state, LifecycleState::Unknown);

        assert_eq!(ctl.refresh("redis").await.state, LifecycleState::Running);
    }

    #[tokio::test]
    async fn handle_created_on_first_reference() {
        let ctl = controller(MockRuntime::new());
        let handle = ctl.handle("rust").await;
        assert_eq!(handle.state, LifecycleState::Unknown);
        assert_eq!(ctl.handles().await.len(), 1);
    }
}
