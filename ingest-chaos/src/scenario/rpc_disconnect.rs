//! 체인 노드 끊김과 재개
//!
//! 체인 노드를 재시작하면 이력이 없는 새 체인이 됩니다. 재시작 전 전송은
//! 재시작 전에 보였는지만 확인하고, 재시작 후에는 새 체인에서 전진하는지 확인합니다.
//! 재시작 경계를 넘는 전역 중복 검사는 하지 않습니다.

use std::time::Duration;

use ingest_chaos_chain_driver::ChainDriver;
use ingest_chaos_core::error::HarnessError;
use ingest_chaos_event_oracle::EventSource;
use ingest_chaos_service_control::ServiceRuntime;
use tokio::time::Instant;

use super::tx_ids;
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
    let scenarios = &config.scenarios;
    let chain_service = config.chain_service();
    let visibility = config.oracle.visibility_timeout();
    let check_duplicates = harness.fresh_recipients();

    let active = harness.await_poller_active().await?;
    steps.record(format!("poller active after {active:?}"));
    settle(Instant::now(), Duration::from_secs(scenarios.baseline_settle_secs)).await;

    let before = harness
        .submit_visible(scenarios.pre_restart_transfers, visibility, check_duplicates)
        .await?;
    steps.record(format!(
        "{} transfer(s) before restart visible: {}",
        before.len(),
        tx_ids(&before)
    ));

    harness.controller().stop(chain_service).await?;
    steps.record(format!("stopped {chain_service}"));
    tokio::time::sleep(Duration::from_secs(scenarios.chain_down_secs)).await;

    harness.controller().start(chain_service).await?;
    let restarted = Instant::now();
    steps.record(format!("started {chain_service} (fresh chain state)"));

    harness.connect_chain().await?;
    steps.record("chain reachable, sender re-funded");
    settle(restarted, Duration::from_secs(scenarios.reconnect_settle_secs)).await;

    let after = harness
        .submit_visible(scenarios.post_restart_transfers, visibility, check_duplicates)
        .await?;
    steps.record(format!(
        "{} transfer(s) after restart visible: {}",
        after.len(),
        tx_ids(&after)
    ));
    Ok(())
}
