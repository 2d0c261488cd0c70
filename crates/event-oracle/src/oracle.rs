//! 이벤트 오라클 -- 기대 집합이 파이프라인에 보일 때까지 폴링
//!
//! # 폴링 규칙
//!
//! - 각 샘플은 남은 시간 안에서만 기다립니다. 기한이 지나면 반드시 반환합니다.
//! - 실패한 샘플은 "새 정보 없음"입니다. `warn`으로 기록하고 다음 간격에 다시 시도합니다.
//! - 대상 체인이 아닌 이벤트는 무시합니다 (같은 지갑이 다른 체인에 있을 수 있음).
//!
//! ```text
//! sample ──(성공)──> seen ∪= hashes ──(expected ⊆ seen)──> 반환
//!   │                      │
//!   └──(실패: warn)────────┴──(시간 남음)──> sleep(min(interval, remaining)) ──> sample
//!                          └──(기한 도달 또는 샘플 시간 부족)──> 반환 (deadline_reached)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ingest_chaos_core::config::OracleConfig;
use ingest_chaos_core::metrics as m;
use ingest_chaos_core::types::{
    Chain, ExpectationSet, NormalizedHash, ObservedEvent, PollOutcome,
};
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::SampleError;
use crate::source::EventSource;

/// 샘플 하나에 줄 최소 시간
const MIN_SAMPLE_BUDGET: Duration = Duration::from_millis(10);

/// 파이프라인 전달 상태를 판정하는 오라클
pub struct EventOracle<S> {
    source: Arc<S>,
    poll_interval: Duration,
    page_limit: usize,
}

impl<S: EventSource> EventOracle<S> {
    pub fn new(source: Arc<S>, config: &OracleConfig) -> Self {
        Self {
            source,
            poll_interval: config.poll_interval(),
            page_limit: config.page_limit,
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// 기대 집합이 모두 관측되거나 `max_wait`가 지날 때까지 폴링합니다.
    ///
    /// 어느 경우든 누적 관측 결과를 반환합니다. 빠진 식별자는
    /// [`PollOutcome::missing`]으로 호출자가 계산합니다.
    pub async fn await_expected(&self, expected: &ExpectationSet, max_wait: Duration) -> PollOutcome {
        let started = Instant::now();
        let deadline = started + max_wait;
        let wallet = expected.wallet();
        let chain = expected.chain();
        let mut outcome = PollOutcome {
            wallet: wallet.to_owned(),
            ..PollOutcome::default()
        };

        debug!(
            wallet,
            chain = %chain,
            expected = expected.len(),
            max_wait_ms = max_wait.as_millis() as u64,
            "awaiting expected transactions"
        );

        loop {
            let sample = self
                .sample(deadline, || self.source.wallet_events(wallet, self.page_limit))
                .await;
            outcome.samples += 1;

            match sample {
                Ok(events) => {
                    let events: Vec<ObservedEvent> =
                        events.into_iter().filter(|e| e.is_on(chain)).collect();
                    outcome.seen.extend(events.iter().map(ObservedEvent::normalized_hash));
                    outcome.latest = events;
                    debug!(
                        wallet,
                        attempt = outcome.samples,
                        seen = outcome.seen.len(),
                        missing = outcome.missing(expected).len(),
                        "oracle sample"
                    );
                }
                Err(e) => {
                    outcome.failed_samples += 1;
                    warn!(wallet, attempt = outcome.samples, error = %e, "oracle sample failed");
                }
            }

            if outcome.is_satisfied(expected) {
                outcome.elapsed = started.elapsed();
                info!(
                    wallet,
                    expected = expected.len(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    samples = outcome.samples,
                    "expected transactions visible"
                );
                return outcome;
            }

            if !self.pause(deadline).await {
                outcome.elapsed = started.elapsed();
                outcome.deadline_reached = true;
                warn!(
                    wallet,
                    missing = outcome.missing(expected).len(),
                    elapsed_ms = outcome.elapsed.as_millis() as u64,
                    samples = outcome.samples,
                    failed_samples = outcome.failed_samples,
                    "oracle deadline reached"
                );
                return outcome;
            }
        }
    }

    /// 지갑에서 `hash`로 보고된 이벤트 수를 셉니다.
    ///
    /// 첫 번째 성공 샘플의 개수를 반환합니다. 기한까지 성공한 샘플이 없으면 `None`입니다.
    pub async fn count_matches(
        &self,
        wallet: &str,
        chain: Chain,
        hash: &NormalizedHash,
        max_wait: Duration,
    ) -> Option<usize> {
        let deadline = Instant::now() + max_wait;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self
                .sample(deadline, || self.source.wallet_events(wallet, self.page_limit))
                .await
            {
                Ok(events) => {
                    let count = events
                        .iter()
                        .filter(|e| e.is_on(chain) && &e.normalized_hash() == hash)
                        .count();
                    debug!(wallet, tx_hash = %hash, count, "counted matches");
                    return Some(count);
                }
                Err(e) => {
                    warn!(wallet, attempt, error = %e, "oracle sample failed");
                }
            }

            if !self.pause(deadline).await {
                warn!(wallet, tx_hash = %hash, attempt, "no successful sample before deadline");
                return None;
            }
        }
    }

    /// 최근 수신 이벤트 목록에 `hash`가 나타날 때까지 기다립니다.
    pub async fn await_last_received(
        &self,
        hash: &NormalizedHash,
        max_wait: Duration,
    ) -> Option<ObservedEvent> {
        let started = Instant::now();
        let deadline = started + max_wait;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.sample(deadline, || self.source.last_received()).await {
                Ok(events) => {
                    if let Some(event) = events.into_iter().find(|e| &e.normalized_hash() == hash) {
                        info!(
                            tx_hash = %hash,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "event received by pipeline"
                        );
                        return Some(event);
                    }
                    debug!(tx_hash = %hash, attempt, "event not received yet");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "last-received sample failed");
                }
            }

            if !self.pause(deadline).await {
                warn!(tx_hash = %hash, attempt, "event not received before deadline");
                return None;
            }
        }
    }

    /// 다음 샘플까지 기다립니다. 그 뒤 기한까지 샘플 하나를 할 시간이 없으면 `false`입니다.
    async fn pause(&self, deadline: Instant) -> bool {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining < MIN_SAMPLE_BUDGET {
            return false;
        }
        tokio::time::sleep(self.poll_interval.min(remaining)).await;
        deadline.saturating_duration_since(Instant::now()) >= MIN_SAMPLE_BUDGET
    }

    /// 남은 시간 안에서 샘플 하나를 가져옵니다.
    async fn sample<F, Fut>(&self, deadline: Instant, fetch: F) -> Result<Vec<ObservedEvent>, SampleError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<ObservedEvent>, SampleError>>,
    {
        let budget = deadline.saturating_duration_since(Instant::now());
        let result = match tokio::time::timeout(budget, fetch()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(SampleError::Timeout(budget)),
        };
        record_sample(if result.is_ok() { "ok" } else { "error" });
        result
    }
}

fn record_sample(result: &'static str) {
    counter!(m::ORACLE_SAMPLES_TOTAL, m::LABEL_RESULT => result).increment(1);
}
