//! 서비스 제어 에러 타입
//!
//! [`ControlError`]는 서비스 제어 계층에서 발생하는 모든 에러를 표현합니다.
//! `From<ControlError> for HarnessError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! [`ProbeSampleError`]는 준비 상태 샘플 하나의 실패이며 폴링 루프 밖으로 나가지 않습니다.

use std::time::Duration;

use ingest_chaos_core::error::{ConnectivityError, HarnessError, ServiceControlError};

/// 서비스 제어 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Docker 데몬 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 서비스(컨테이너)를 찾을 수 없음
    #[error("service not found: {0}")]
    NotFound(String),

    /// 유효하지 않은 서비스 이름
    #[error("invalid service name '{name}': {reason}")]
    InvalidName {
        /// 입력된 이름
        name: String,
        /// 거부 사유
        reason: String,
    },

    /// 생명주기 조작 실패
    #[error("{operation} '{service}' failed: {reason}")]
    Operation {
        /// 대상 서비스
        service: String,
        /// 시도한 조작
        operation: String,
        /// 실패 사유
        reason: String,
    },

    /// 생명주기 조작 타임아웃
    #[error("{operation} '{service}' timed out after {after:?}")]
    Timeout {
        /// 대상 서비스
        service: String,
        /// 시도한 조작
        operation: String,
        /// 적용된 타임아웃
        after: Duration,
    },

    /// 외부 명령 (docker compose) 실행 실패
    #[error("command '{program}' failed: {reason}")]
    Command {
        /// 실행한 프로그램
        program: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl ControlError {
    /// 생명주기 조작 실패를 생성합니다.
    pub fn operation(
        service: impl Into<String>,
        operation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Operation {
            service: service.into(),
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

impl From<ControlError> for HarnessError {
    fn from(err: ControlError) -> Self {
        match err {
            ControlError::DockerConnection(reason) => HarnessError::Connectivity(ConnectivityError {
                dependency: "docker".to_owned(),
                endpoint: "docker daemon".to_owned(),
                reason,
            }),
            ControlError::Operation {
                service,
                operation,
                reason,
            } => HarnessError::ServiceControl(ServiceControlError {
                service,
                operation,
                reason,
            }),
            ControlError::Timeout {
                service,
                operation,
                after,
            } => HarnessError::ServiceControl(ServiceControlError {
                service,
                operation,
                reason: format!("timed out after {after:?}"),
            }),
            ControlError::Config { field, reason } => {
                HarnessError::Config(ingest_chaos_core::error::ConfigError::InvalidValue {
                    field,
                    reason,
                })
            }
            ControlError::NotFound(service) => HarnessError::ServiceControl(ServiceControlError {
                service,
                operation: "lookup".to_owned(),
                reason: "service not found".to_owned(),
            }),
            ControlError::InvalidName { name, reason } => {
                HarnessError::ServiceControl(ServiceControlError {
                    service: name,
                    operation: "lookup".to_owned(),
                    reason,
                })
            }
            other @ (ControlError::DockerApi(_) | ControlError::Command { .. }) => {
                HarnessError::ServiceControl(ServiceControlError {
                    service: String::new(),
                    operation: "control".to_owned(),
                    reason: other.to_string(),
                })
            }
        }
    }
}

/// 준비 상태 샘플 하나의 실패 (일시적)
#[derive(Debug, thiserror::Error)]
pub enum ProbeSampleError {
    /// 로그 조회 실패
    #[error("log sample failed: {0}")]
    Logs(#[from] ControlError),

    /// HTTP 요청 실패
    #[error("http sample failed: {0}")]
    Http(String),

    /// 상태 문서 디코딩 실패
    #[error("status document decode failed: {0}")]
    Decode(String),

    /// 상태 문서에 필드가 없거나 숫자가 아님
    #[error("status field '{0}' missing or not numeric")]
    MissingField(String),

    /// 샘플 타임아웃
    #[error("sample timed out after {0:?}")]
    Timeout(Duration),
}
