//! 메시지 버스 중단
//!
//! 버스가 내려가 있는 동안 전송을 제출하고, 버스를 되살린 뒤 재전송 없이
//! 그 전송이 보이는지 확인합니다. 대기 한도는 업스트림 재시도 상한을 덮습니다.

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
    let bus = &config.services.bus;

    harness.controller().stop(bus).await?;
    let stopped = Instant::now();
    steps.record(format!("stopped {bus}"));
    settle(stopped, Duration::from_secs(scenarios.bus_down_before_submit_secs)).await;

    let records = harness.submit(1).await?;
    steps.record(format!("submitted while bus down: {}", tx_ids(&records)));
    tokio::time::sleep(Duration::from_secs(scenarios.bus_down_after_submit_secs)).await;

    harness.controller().start(bus).await?;
    steps.record(format!("started {bus}"));

    let max_wait = config.bus_poll_timeout();
    harness
        .await_visible(&records, max_wait, harness.fresh_recipients())
        .await?;
    steps.record(format!(
        "transfer visible after bus recovery (limit {max_wait:?})"
    ));
    Ok(())
}
