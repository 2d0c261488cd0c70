//! 에러 타입 — 하네스 전역 에러 분류
//!
//! 실패의 종류에 따라 전파 정책이 다릅니다.
//!
//! - [`ConnectivityError`]: 필수 의존성에 연결할 수 없음 — 실행 전체 중단
//! - [`ServiceControlError`]: 모든 대체 경로를 시도한 뒤에도 생명주기 조작 실패 — 시나리오 실패
//! - [`TransferError`]: 체인 트랜잭션 제출/확정 실패 — 시나리오 실패
//! - [`InvariantViolation`]: 누락/중복/구조 불일치 — 시나리오 실패
//!
//! 폴링 중 일시적인 샘플 실패는 이 타입으로 올라오지 않습니다.
//! 폴링 루프 내부에서 기록되고 데드라인까지 재시도됩니다.

use std::time::Duration;

/// ingest-chaos 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 의존성 연결 실패
    #[error("connectivity error: {0}")]
    Connectivity(#[from] ConnectivityError),

    /// 서비스 생명주기 조작 실패
    #[error("service control error: {0}")]
    ServiceControl(#[from] ServiceControlError),

    /// 트랜잭션 제출/확정 실패
    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// 전달 불변식 위반
    #[error("invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// 실행 전체를 중단해야 하는 설정 단계 에러인지 확인합니다.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connectivity(_))
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 필수 의존성(체인 RPC, API, 버스, Docker)에 연결할 수 없음
#[derive(Debug, thiserror::Error)]
#[error("{dependency} unreachable at {endpoint}: {reason}")]
pub struct ConnectivityError {
    /// 의존성 이름 (예: "ethereum rpc", "docker")
    pub dependency: String,
    /// 접속 대상
    pub endpoint: String,
    /// 실패 사유
    pub reason: String,
}

/// 서비스 생명주기 조작 실패
///
/// 서비스 이름과 시도한 조작을 함께 담아 진단이 가능하도록 합니다.
#[derive(Debug, thiserror::Error)]
#[error("{operation} '{service}' failed: {reason}")]
pub struct ServiceControlError {
    /// 대상 서비스 이름
    pub service: String,
    /// 시도한 조작 (stop, start, restart, logs, exec)
    pub operation: String,
    /// 실패 사유
    pub reason: String,
}

/// 체인 트랜잭션 실패
#[derive(Debug, thiserror::Error)]
#[error("{chain} transfer failed: {reason}")]
pub struct TransferError {
    /// 체인 이름
    pub chain: String,
    /// 실패 사유
    pub reason: String,
}

/// 전달 불변식 위반 (assertion failure)
///
/// 어떤 식별자가, 어떤 지갑에서, 얼마나 기다린 뒤 실패했는지 모두 포함합니다.
#[derive(Debug, thiserror::Error)]
pub enum InvariantViolation {
    /// 기대한 트랜잭션이 데드라인까지 보이지 않음
    #[error(
        "wallet {wallet}: {} expected transaction(s) not visible after {elapsed:?}: [{}]",
        identifiers.len(),
        identifiers.join(", ")
    )]
    Missing {
        wallet: String,
        identifiers: Vec<String>,
        elapsed: Duration,
    },

    /// 같은 트랜잭션이 두 번 이상 보고됨
    #[error("wallet {wallet}: transaction {identifier} reported {count} times (expected exactly 1)")]
    Duplicated {
        wallet: String,
        identifier: String,
        count: usize,
    },

    /// 관측된 이벤트의 구조 필드가 없거나 기대와 다름
    #[error("event {identifier}: structural mismatch in [{}]", fields.join(", "))]
    Structural {
        identifier: String,
        fields: Vec<String>,
    },

    /// 정확성에 필수적인 조건이 데드라인까지 충족되지 않음
    #[error("{what} not observed after {elapsed:?}")]
    NotObserved { what: String, elapsed: Duration },
}
