//! 메트릭 상수 및 설명 등록
//!
//! 하네스가 기록하는 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 익스포터는 설치하지 않으며, 필요한 호출자가 직접 recorder를 설치합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ingest_chaos_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(
//!     ingest_chaos_core::metrics::SERVICE_ACTIONS_TOTAL,
//!     ingest_chaos_core::metrics::LABEL_SERVICE => "redis",
//! )
//! .increment(1);
//! ```

use metrics::describe_counter;

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 서비스 이름 레이블 키
pub const LABEL_SERVICE: &str = "service";

/// 생명주기 조작 레이블 키 (stop, start, restart, logs, exec)
pub const LABEL_ACTION: &str = "action";

/// 결과 레이블 키 (success, failure, ready, timeout)
pub const LABEL_RESULT: &str = "result";

/// 체인 레이블 키 (ethereum, solana)
pub const LABEL_CHAIN: &str = "chain";

/// 시나리오 레이블 키
pub const LABEL_SCENARIO: &str = "scenario";

// ─── 메트릭 이름 ───────────────────────────────────────────────────

/// 서비스 생명주기 조작 수 (counter, labels: service, action, result)
pub const SERVICE_ACTIONS_TOTAL: &str = "ingest_chaos_service_actions_total";

/// 준비 상태 샘플 수 (counter, label: result)
pub const PROBE_SAMPLES_TOTAL: &str = "ingest_chaos_probe_samples_total";

/// 오라클 샘플 수 (counter, label: result)
pub const ORACLE_SAMPLES_TOTAL: &str = "ingest_chaos_oracle_samples_total";

/// 체인 전송 수 (counter, labels: chain, result)
pub const TRANSFERS_TOTAL: &str = "ingest_chaos_transfers_total";

/// 시나리오 실행 수 (counter, labels: scenario, result)
pub const SCENARIOS_TOTAL: &str = "ingest_chaos_scenarios_total";

/// 모든 메트릭 설명을 등록합니다.
///
/// recorder가 설치되지 않았으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    describe_counter!(
        SERVICE_ACTIONS_TOTAL,
        "Total number of service lifecycle operations issued by the harness"
    );
    describe_counter!(
        PROBE_SAMPLES_TOTAL,
        "Total number of readiness samples taken"
    );
    describe_counter!(
        ORACLE_SAMPLES_TOTAL,
        "Total number of pipeline query samples taken by the event oracle"
    );
    describe_counter!(
        TRANSFERS_TOTAL,
        "Total number of chain transfers submitted"
    );
    describe_counter!(SCENARIOS_TOTAL, "Total number of chaos scenarios run");
}
