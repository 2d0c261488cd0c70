//! 전달 스모크 테스트
//!
//! 감시 주소로 전송 한 건을 보내고 `/internal/last-received`에 나타난 이벤트를
//! 전송 기록과 구조적으로 비교합니다. 설정된 보조 프로세스는 이 시나리오 동안만
//! 실행되며 어떤 경로로 끝나든 종료됩니다.

use std::collections::BTreeMap;

use ingest_chaos_chain_driver::ChainDriver;
use ingest_chaos_core::config::HarnessConfig;
use ingest_chaos_core::error::{HarnessError, InvariantViolation, TransferError};
use ingest_chaos_core::types::Chain;
use ingest_chaos_event_oracle::{EventSource, StructuralCheck};
use ingest_chaos_service_control::ServiceRuntime;
use tokio::time::Instant;

use crate::harness::Harness;
use crate::process::ProcessGuard;
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
    let watched = match &harness.config().scenarios.smoke_watched_address {
        Some(address) => address.clone(),
        None => harness
            .driver()
            .new_recipients(1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransferError {
                chain: harness.driver().chain().to_string(),
                reason: "driver returned no recipient".to_owned(),
            })?,
    };

    let mut guard = ProcessGuard::new();
    let result = deliver(harness, steps, &mut guard, &watched).await;
    guard.terminate_all().await;
    result
}

async fn deliver<R, D, S>(
    harness: &Harness<R, D, S>,
    steps: &mut StepLog,
    guard: &mut ProcessGuard,
    watched: &str,
) -> Result<(), HarnessError>
where
    R: ServiceRuntime,
    D: ChainDriver,
    S: EventSource,
{
    let config = harness.config();
    if !config.aux_processes.is_empty() {
        let env = pipeline_env(config, watched);
        for process in &config.aux_processes {
            let pid = guard.spawn(process, &env)?;
            steps.record(format!("spawned {} (pid {pid})", process.name));
        }
    }

    let healthy = harness.await_api_healthy().await?;
    steps.record(format!("api healthy after {healthy:?}"));

    let driver = harness.driver();
    let sender = driver.sender().await?;
    let record = driver
        .transfer(&sender, watched, driver.transfer_amount())
        .await?;
    steps.record(format!("transfer to watched {watched}: {}", record.tx_id));

    let hash = record.normalized_hash();
    let started = Instant::now();
    let event = harness
        .oracle()
        .await_last_received(&hash, config.oracle.visibility_timeout())
        .await
        .ok_or_else(|| InvariantViolation::NotObserved {
            what: format!("{hash} in last-received events"),
            elapsed: started.elapsed(),
        })?;
    steps.record(format!("event received: {} {}", event.chain, event.event_type));

    StructuralCheck::new(&record).verify(&event)?;
    steps.record("event fields match transfer");
    Ok(())
}

/// 보조 파이프라인 프로세스의 기본 환경변수
fn pipeline_env(config: &HarnessConfig, watched: &str) -> BTreeMap<String, String> {
    let watched_key = match config.chain.backend {
        Chain::Ethereum => "WATCHED_ADDRESSES_ETH",
        Chain::Solana => "WATCHED_ADDRESSES_SOL",
    };
    BTreeMap::from([
        ("TEST_MODE".to_owned(), "true".to_owned()),
        ("REDIS_URL".to_owned(), config.endpoints.bus_url.clone()),
        ("ETH_RPC_URL".to_owned(), config.endpoints.eth_rpc_url.clone()),
        ("SOL_RPC_URL".to_owned(), config.endpoints.sol_rpc_url.clone()),
        (watched_key.to_owned(), watched.to_owned()),
    ])
}
