//! 수집 중 질의 서비스 재시작
//!
//! 전송 A가 보인 뒤 질의 서비스를 재시작하고 전송 B를 확인합니다. 그 다음 A가
//! 여전히 있고 정확히 한 번만 보고되는지 확인합니다. 재수집이 A를 다시 재생해도
//! 저장 계층의 멱등성이 지켜져야 합니다.

use std::time::Duration;

use ingest_chaos_chain_driver::ChainDriver;
use ingest_chaos_core::error::{HarnessError, InvariantViolation};
use ingest_chaos_core::types::{ExpectationSet, TransactionRecord};
use ingest_chaos_event_oracle::EventSource;
use ingest_chaos_service_control::ServiceRuntime;
use tokio::time::Instant;

use super::tx_ids;
use crate::assertions;
use crate::harness::{Harness, settle};
use crate::report::StepLog;

pub(super) async fn run<R, D, S>(
    harness: &Harness<R, D, S>,
    steps: &mut StepLog,
) -> Result<(), HarnessError>
where
    R: ServiceRuntime,
    D: ChainDriver,
    S: EventSource,
{
    let config = harness.config();
    let api = &config.services.api;
    let visibility = config.oracle.visibility_timeout();
    let check_duplicates = harness.fresh_recipients();

    let first = harness
        .submit_visible(1, visibility, check_duplicates)
        .await?;
    steps.record(format!("transfer A visible: {}", tx_ids(&first)));

    harness.controller().restart(api).await?;
    let restarted = Instant::now();
    steps.record(format!("restarted {api}"));

    let healthy = harness.await_api_healthy().await?;
    steps.record(format!("{api} healthy after {healthy:?}"));
    settle(
        restarted,
        Duration::from_secs(config.scenarios.api_restart_settle_secs),
    )
    .await;

    let second = harness
        .submit_visible(1, visibility, check_duplicates)
        .await?;
    steps.record(format!("transfer B visible: {}", tx_ids(&second)));

    for record in &first {
        recheck_exactly_once(harness, record).await?;
    }
    steps.record(format!("transfer A still present exactly once: {}", tx_ids(&first)));
    Ok(())
}

/// 재시작 전 전송을 다시 조회해 존재와 중복 없음(개수 1)을 확인합니다.
async fn recheck_exactly_once<R, D, S>(
    harness: &Harness<R, D, S>,
    record: &TransactionRecord,
) -> Result<(), HarnessError>
where
    R: ServiceRuntime,
    D: ChainDriver,
    S: EventSource,
{
    let recheck = harness.config().oracle.recheck_timeout();
    let expected = ExpectationSet::new(record.to.clone(), record.chain, [record]);
    let outcome = harness.oracle().await_expected(&expected, recheck).await;
    assertions::assert_all_visible(&expected, &outcome)?;

    let hash = record.normalized_hash();
    let started = Instant::now();
    let count = harness
        .oracle()
        .count_matches(&record.to, record.chain, &hash, recheck)
        .await
        .ok_or_else(|| InvariantViolation::NotObserved {
            what: format!("wallet {} listing for recount of {hash}", record.to),
            elapsed: started.elapsed(),
        })?;
    assertions::assert_exactly_once(&record.to, &hash, count)?;
    Ok(())
}
