//! 카오스 시나리오
//!
//! 각 시나리오는 고정된 단계 순서와 그 뒤의 단언으로 이루어집니다. 단계는
//! [`StepLog`]에 기록되고, 첫 번째 에러가 시나리오를 끝냅니다.
//!
//! | 시나리오 | 주입하는 장애 | 확인하는 불변식 |
//! |---|---|---|
//! | `rpc-disconnect` | 체인 노드 재시작 (이력 초기화) | 재시작 전후 각 기대 집합의 무손실 |
//! | `bus-downtime` | 제출 시점의 버스 중단 | 재전송 없이 결국 전달 |
//! | `api-restart` | 질의 서비스 재시작 | 재시작 전 이벤트의 보존과 정확히 한 번 |
//! | `delivery-smoke` | 없음 | 최근 수신 이벤트의 구조 일치 |

mod api_restart;
mod bus_downtime;
mod rpc_disconnect;
mod smoke;

use ingest_chaos_chain_driver::ChainDriver;
use ingest_chaos_core::config::ScenarioKind;
use ingest_chaos_core::error::HarnessError;
use ingest_chaos_core::types::TransactionRecord;
use ingest_chaos_event_oracle::EventSource;
use ingest_chaos_service_control::ServiceRuntime;

use crate::harness::Harness;
use crate::report::StepLog;

/// 시나리오 하나를 실행합니다.
pub async fn run<R, D, S>(
    kind: ScenarioKind,
    harness: &Harness<R, D, S>,
    steps: &mut StepLog,
) -> Result<(), HarnessError>
where
    R: ServiceRuntime,
    D: ChainDriver,
    S: EventSource,
{
    match kind {
        ScenarioKind::RpcDisconnect => rpc_disconnect::run(harness, steps).await,
        ScenarioKind::BusDowntime => bus_downtime::run(harness, steps).await,
        ScenarioKind::ApiRestart => api_restart::run(harness, steps).await,
        ScenarioKind::DeliverySmoke => smoke::run(harness, steps).await,
    }
}

/// 단계 기록용 식별자 목록
fn tx_ids(records: &[TransactionRecord]) -> String {
    records
        .iter()
        .map(|r| r.tx_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
