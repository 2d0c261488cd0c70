//! 오라클 샘플 에러
//!
//! [`SampleError`]는 질의 API 샘플 하나의 실패입니다. 오라클 폴링 루프 안에서는
//! `warn`으로 기록하고 다음 샘플로 넘어가며 밖으로 나가지 않습니다.
//! 폴링이 아닌 경로(소스 생성 등)에서는 `From<SampleError> for HarnessError`로 전파합니다.

use std::time::Duration;

use ingest_chaos_core::error::{ConnectivityError, HarnessError};

/// 질의 API 샘플 실패
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// 요청 전송 실패 (연결 거부, 리셋 등)
    #[error("request to {endpoint} failed: {reason}")]
    Http { endpoint: String, reason: String },

    /// 성공이 아닌 HTTP 상태 코드
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },

    /// 응답 본문 디코딩 실패
    #[error("decode of {endpoint} response failed: {reason}")]
    Decode { endpoint: String, reason: String },

    /// 샘플 타임아웃
    #[error("sample timed out after {0:?}")]
    Timeout(Duration),
}

impl SampleError {
    /// 실패한 요청의 대상 (타임아웃은 대상이 없음)
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Http { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
            Self::Timeout(_) => None,
        }
    }
}

impl From<SampleError> for HarnessError {
    fn from(err: SampleError) -> Self {
        HarnessError::Connectivity(ConnectivityError {
            dependency: "pipeline api".to_owned(),
            endpoint: err.endpoint().unwrap_or("pipeline api").to_owned(),
            reason: err.to_string(),
        })
    }
}
