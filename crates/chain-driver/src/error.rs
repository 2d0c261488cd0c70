//! 체인 드라이버 에러 타입
//!
//! [`RpcCallError`]는 JSON-RPC 호출 하나의 실패, [`ChainDriverError`]는 드라이버 조작의
//! 실패입니다. `From<ChainDriverError> for HarnessError` 변환이 구현되어 있습니다.

use std::time::Duration;

use ingest_chaos_core::error::{ConfigError, ConnectivityError, HarnessError, TransferError};
use ingest_chaos_core::types::{Chain, TransactionRecord};

/// JSON-RPC 호출 실패
#[derive(Debug, thiserror::Error)]
pub enum RpcCallError {
    /// 요청 전송 또는 응답 수신 실패
    #[error("{method}: transport error: {reason}")]
    Transport { method: String, reason: String },

    /// 노드가 JSON-RPC 에러 객체를 반환
    #[error("{method}: rpc error {code}: {message}")]
    Remote {
        method: String,
        code: i64,
        message: String,
    },

    /// 응답을 기대한 형태로 해석할 수 없음
    #[error("{method}: invalid response: {reason}")]
    Decode { method: String, reason: String },
}

/// 체인 드라이버 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ChainDriverError {
    /// 연결 확인이 기한 안에 한 번도 성공하지 못함
    #[error("{chain} rpc at {endpoint} unreachable after {after:?}: {reason}")]
    Unreachable {
        chain: Chain,
        endpoint: String,
        after: Duration,
        reason: String,
    },

    /// 제출 경로의 RPC 호출 실패
    #[error("{chain} rpc call failed: {source}")]
    Rpc {
        chain: Chain,
        #[source]
        source: RpcCallError,
    },

    /// 전송 거부 (revert, 서명 불가, 계정 부족 등)
    #[error("{chain} transfer rejected: {reason}")]
    Rejected { chain: Chain, reason: String },

    /// 제출은 됐지만 기한 안에 확정되지 않음
    #[error("{chain} transaction {tx_id} not confirmed within {after:?}")]
    ConfirmationTimeout {
        chain: Chain,
        tx_id: String,
        after: Duration,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config { field: String, reason: String },
}

impl ChainDriverError {
    pub(crate) fn rejected(chain: Chain, reason: impl Into<String>) -> Self {
        Self::Rejected {
            chain,
            reason: reason.into(),
        }
    }
}

impl From<ChainDriverError> for HarnessError {
    fn from(err: ChainDriverError) -> Self {
        match err {
            ChainDriverError::Unreachable {
                chain,
                endpoint,
                after,
                reason,
            } => HarnessError::Connectivity(ConnectivityError {
                dependency: format!("{chain} rpc"),
                endpoint,
                reason: format!("{reason} (gave up after {after:?})"),
            }),
            ChainDriverError::Config { field, reason } => {
                HarnessError::Config(ConfigError::InvalidValue { field, reason })
            }
            ChainDriverError::Rpc { chain, source } => HarnessError::Transfer(TransferError {
                chain: chain.to_string(),
                reason: source.to_string(),
            }),
            ChainDriverError::Rejected { chain, reason } => {
                HarnessError::Transfer(TransferError {
                    chain: chain.to_string(),
                    reason,
                })
            }
            ChainDriverError::ConfirmationTimeout {
                chain,
                tx_id,
                after,
            } => HarnessError::Transfer(TransferError {
                chain: chain.to_string(),
                reason: format!("{tx_id} not confirmed within {after:?}"),
            }),
        }
    }
}

/// 일괄 전송 중간 실패
///
/// 실패 전에 확정된 전송 기록을 `completed`로 함께 돌려주므로, 호출자는
/// 부분 집합에 대해서도 불변식을 검증할 수 있습니다.
#[derive(Debug, thiserror::Error)]
#[error("batch transfer stopped after {} of {requested}: {source}", completed.len())]
pub struct BatchTransferError {
    /// 요청한 전송 수
    pub requested: usize,
    /// 실패 전에 완료된 전송 (제출 순서)
    pub completed: Vec<TransactionRecord>,
    /// 실패 원인
    #[source]
    pub source: ChainDriverError,
}

impl From<BatchTransferError> for HarnessError {
    fn from(err: BatchTransferError) -> Self {
        let completed: Vec<_> = err.completed.iter().map(|r| r.tx_id.as_str()).collect();
        let reason = format!(
            "{} (completed before failure: [{}])",
            err,
            completed.join(", ")
        );
        match HarnessError::from(err.source) {
            HarnessError::Transfer(TransferError { chain, .. }) => {
                HarnessError::Transfer(TransferError { chain, reason })
            }
            other => other,
        }
    }
}
