//! 시나리오가 공유하는 구성요소 묶음
//!
//! [`Harness`]는 서비스 컨트롤러, 준비 상태 확인기, 체인 드라이버, 이벤트 오라클을
//! 하나로 묶고 시나리오 단계에서 반복되는 조합(준비 확인, 전송, 가시성 단언)을 제공합니다.
//! 각 외부 협력자는 트레이트 뒤에 있으므로 테스트에서는 가짜 구현으로 바꿔 끼웁니다.

use std::sync::Arc;
use std::time::Duration;

use ingest_chaos_chain_driver::ChainDriver;
use ingest_chaos_core::config::{HarnessConfig, RecipientMode};
use ingest_chaos_core::error::{ConnectivityError, HarnessError, InvariantViolation};
use ingest_chaos_core::types::{ExpectationSet, TransactionRecord};
use ingest_chaos_event_oracle::{EventOracle, EventSource};
use ingest_chaos_service_control::{
    ControllerConfig, ProbeOutcome, ProberConfig, ReadinessCheck, ReadinessProber,
    ServiceController, ServiceRuntime,
};
use tokio::time::Instant;
use tracing::warn;

use crate::assertions;

/// 시나리오 실행에 필요한 구성요소
pub struct Harness<R: ServiceRuntime, D, S> {
    config: HarnessConfig,
    controller: ServiceController<R>,
    prober: ReadinessProber<R>,
    driver: D,
    oracle: EventOracle<S>,
}

impl<R, D, S> Harness<R, D, S>
where
    R: ServiceRuntime,
    D: ChainDriver,
    S: EventSource,
{
    pub fn new(
        config: HarnessConfig,
        runtime: Arc<R>,
        driver: D,
        source: Arc<S>,
    ) -> Result<Self, HarnessError> {
        let controller = ServiceController::new(
            Arc::clone(&runtime),
            &ControllerConfig::from_core(&config.services),
        );
        let prober = ReadinessProber::new(
            runtime,
            ProberConfig::from_core(&config.readiness, &config.endpoints),
        )?;
        let oracle = EventOracle::new(source, &config.oracle);
        Ok(Self {
            config,
            controller,
            prober,
            driver,
            oracle,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn controller(&self) -> &ServiceController<R> {
        &self.controller
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn oracle(&self) -> &EventOracle<S> {
        &self.oracle
    }

    /// 수신자가 매번 새 주소인지 (다른 실행의 이벤트와 섞이지 않는지)
    pub fn fresh_recipients(&self) -> bool {
        self.config.chain.recipients == RecipientMode::Fresh
    }

    /// 폴러가 활동 중임을 확인합니다. 기한 초과는 `NotObserved`입니다.
    pub async fn await_poller_active(&self) -> Result<Duration, HarnessError> {
        let check =
            ReadinessCheck::poller_activity(&self.config.readiness, &self.config.services.poller);
        self.await_ready(&check, self.config.readiness.poller_timeout(), "poller activity")
            .await
    }

    /// 질의 API 헬스 체크가 200을 반환할 때까지 기다립니다.
    pub async fn await_api_healthy(&self) -> Result<Duration, HarnessError> {
        let check = ReadinessCheck::api_health(&self.config.endpoints.api_url);
        self.await_ready(&check, self.config.readiness.api_health_timeout(), "api health")
            .await
    }

    async fn await_ready(
        &self,
        check: &ReadinessCheck,
        timeout: Duration,
        what: &str,
    ) -> Result<Duration, HarnessError> {
        match self.prober.wait_until(check, timeout).await {
            ProbeOutcome::Ready { elapsed, .. } => Ok(elapsed),
            ProbeOutcome::TimedOut {
                elapsed,
                last_error,
                ..
            } => {
                let what = match last_error {
                    Some(e) => format!("{what} ({check}; last error: {e})"),
                    None => format!("{what} ({check})"),
                };
                Err(InvariantViolation::NotObserved { what, elapsed }.into())
            }
        }
    }

    /// 실행 시작 전 필수 의존성을 확인합니다. 실패는 모두 연결 에러입니다.
    pub async fn check_dependencies(&self) -> Result<(), HarnessError> {
        self.controller.runtime().ping().await?;
        self.connect_chain().await?;
        self.await_api_healthy().await.map_err(|e| {
            HarnessError::Connectivity(ConnectivityError {
                dependency: "pipeline api".to_owned(),
                endpoint: self.config.endpoints.api_url.clone(),
                reason: e.to_string(),
            })
        })?;
        Ok(())
    }

    /// 체인 노드 연결을 확인하고 송신 계정을 준비합니다 (체인 재시작 후에도 호출).
    pub async fn connect_chain(&self) -> Result<(), HarnessError> {
        self.driver
            .connect(self.config.chain.connect_timeout())
            .await
            .map_err(Into::into)
    }

    /// 서로 다른 수신자에게 `count`건을 전송하고 확정 기록을 반환합니다.
    pub async fn submit(&self, count: usize) -> Result<Vec<TransactionRecord>, HarnessError> {
        self.driver.batch_transfer(count).await.map_err(Into::into)
    }

    /// `count`건을 전송하고 모두 보일 때까지 기다립니다.
    ///
    /// 일괄 전송이 중간에 실패하면 이미 확정된 전송의 가시성을 먼저 확인한 뒤
    /// 전송 에러를 반환합니다.
    pub async fn submit_visible(
        &self,
        count: usize,
        max_wait: Duration,
        check_duplicates: bool,
    ) -> Result<Vec<TransactionRecord>, HarnessError> {
        match self.driver.batch_transfer(count).await {
            Ok(records) => {
                self.await_visible(&records, max_wait, check_duplicates)
                    .await?;
                Ok(records)
            }
            Err(err) => {
                if !err.completed.is_empty() {
                    warn!(
                        completed = err.completed.len(),
                        requested = err.requested,
                        "checking partial batch before reporting transfer failure"
                    );
                    self.await_visible(&err.completed, max_wait, check_duplicates)
                        .await?;
                }
                Err(err.into())
            }
        }
    }

    /// 기록된 전송이 모두 보일 때까지 기다리고 무손실을 단언합니다.
    ///
    /// 수신자별 기대 집합을 같은 기한 안에서 차례로 확인합니다. `check_duplicates`가
    /// 참이면 마지막 스냅샷에서 중복도 확인합니다.
    pub async fn await_visible(
        &self,
        records: &[TransactionRecord],
        max_wait: Duration,
        check_duplicates: bool,
    ) -> Result<(), HarnessError> {
        let deadline = Instant::now() + max_wait;
        for expected in ExpectationSet::by_recipient(records) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = self.oracle.await_expected(&expected, remaining).await;
            assertions::assert_all_visible(&expected, &outcome)?;
            if check_duplicates {
                assertions::assert_no_duplicates(&expected, &outcome)?;
            }
        }
        Ok(())
    }
}

/// `since`부터 `window`가 지날 때까지 기다립니다. 이미 지났으면 바로 반환합니다.
///
/// 준비 상태 확인 뒤에 남은 안전 여유만큼만 기다리는 데 씁니다.
pub async fn settle(since: Instant, window: Duration) {
    tokio::time::sleep_until(since + window).await;
}
