//! 세션 픽스처
//!
//! 모든 시나리오 전에 한 번: 이벤트 저장소를 비우고 폴러와 API를 재시작해
//! 빈 상태에서 시작하게 합니다. 실패는 경고로만 남기며 실행을 막지 않습니다.
//! 모든 시나리오 후에 한 번: 서비스 상태만 기록합니다 (환경 종료는 외부 도구 담당).

use std::time::Duration;

use ingest_chaos_core::config::HarnessConfig;
use ingest_chaos_service_control::{ServiceController, ServiceRuntime};
use tracing::{info, warn};

/// 세션 준비 결과
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FixtureOutcome {
    /// 저장소 비우기 성공 여부
    pub truncated: bool,
    /// 재시작에 성공한 서비스
    pub restarted: Vec<String>,
    /// 치명적이지 않은 문제
    pub warnings: Vec<String>,
}

pub struct SessionFixture<'a, R: ServiceRuntime> {
    controller: &'a ServiceController<R>,
    config: &'a HarnessConfig,
}

impl<'a, R: ServiceRuntime> SessionFixture<'a, R> {
    pub fn new(controller: &'a ServiceController<R>, config: &'a HarnessConfig) -> Self {
        Self { controller, config }
    }

    /// 세션 시작 정리. 에러를 반환하지 않습니다.
    pub async fn setup(&self) -> FixtureOutcome {
        let mut outcome = FixtureOutcome::default();
        let store = &self.config.services.store;

        match self
            .controller
            .exec(store, &self.config.store.truncate_command())
            .await
        {
            Ok(_) => {
                info!(service = %store, table = %self.config.store.table, "event store truncated");
                outcome.truncated = true;
            }
            Err(e) => {
                warn!(service = %store, error = %e, "failed to truncate event store");
                outcome.warnings.push(format!("truncate {store}: {e}"));
            }
        }

        for service in [&self.config.services.poller, &self.config.services.api] {
            match self.controller.restart(service).await {
                Ok(()) => outcome.restarted.push(service.clone()),
                Err(e) => {
                    warn!(service = %service, error = %e, "failed to restart service");
                    outcome.warnings.push(format!("restart {service}: {e}"));
                }
            }
        }

        let settle = Duration::from_secs(self.config.scenarios.session_settle_secs);
        if !outcome.restarted.is_empty() && !settle.is_zero() {
            info!(settle_secs = settle.as_secs(), "waiting for restarted services");
            tokio::time::sleep(settle).await;
        }
        outcome
    }

    /// 세션 종료. 의무 동작은 없고 엔진에서 조회한 마지막 서비스 상태를 기록합니다.
    pub async fn teardown(&self) {
        for handle in self.controller.refresh_all().await {
            info!(service = %handle.name, state = %handle.state, "service state at teardown");
        }
    }
}
