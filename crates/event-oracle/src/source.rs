//! 파이프라인 질의 API 접근 계층
//!
//! [`EventSource`]는 오라클이 파이프라인 상태를 읽는 유일한 경로입니다.
//! 운영 구현은 [`HttpEventSource`]이고, 테스트에서는 `MockEventSource`가
//! 미리 정한 응답 순서를 돌려줍니다.

use std::future::Future;
use std::time::Duration;

use ingest_chaos_core::types::ObservedEvent;
use reqwest::StatusCode;
use tracing::debug;

use crate::error::SampleError;

/// 파이프라인 이벤트 조회 트레이트
///
/// 각 호출은 샘플 하나입니다. 실패는 [`SampleError`]로 반환되며 재시도 여부는
/// 호출자(오라클 폴링 루프)가 결정합니다.
pub trait EventSource: Send + Sync + 'static {
    /// 지갑과 관련된 이벤트를 최대 `limit`개 가져옵니다.
    fn wallet_events(
        &self,
        wallet: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ObservedEvent>, SampleError>> + Send;

    /// 파이프라인이 가장 최근에 받은 이벤트를 가져옵니다 (최신순).
    fn last_received(
        &self,
    ) -> impl Future<Output = Result<Vec<ObservedEvent>, SampleError>> + Send;
}

/// HTTP 질의 API 클라이언트
///
/// - `GET {base}/wallet/{address}/transactions?limit=N`
/// - `GET {base}/internal/last-received`
///
/// 두 엔드포인트 모두 JSON 배열을 반환합니다. 빈 목록이 `null`로 오는 경우도
/// 빈 배열로 처리합니다.
pub struct HttpEventSource {
    base_url: String,
    http: reqwest::Client,
}

impl HttpEventSource {
    /// 요청 하나당 `request_timeout`을 적용하는 클라이언트를 만듭니다.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, SampleError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SampleError::Http {
                endpoint: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_events(
        &self,
        endpoint: String,
        query: &[(&str, String)],
    ) -> Result<Vec<ObservedEvent>, SampleError> {
        let response = self
            .http
            .get(&endpoint)
            .query(query)
            .send()
            .await
            .map_err(|e| SampleError::Http {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SampleError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| SampleError::Http {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        let events: Option<Vec<ObservedEvent>> =
            serde_json::from_slice(&body).map_err(|e| SampleError::Decode {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        let events = events.unwrap_or_default();
        debug!(endpoint = %endpoint, events = events.len(), "sampled pipeline api");
        Ok(events)
    }
}

impl EventSource for HttpEventSource {
    async fn wallet_events(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<ObservedEvent>, SampleError> {
        let endpoint = format!("{}/wallet/{wallet}/transactions", self.base_url);
        self.get_events(endpoint, &[("limit", limit.to_string())])
            .await
    }

    async fn last_received(&self) -> Result<Vec<ObservedEvent>, SampleError> {
        let endpoint = format!("{}/internal/last-received", self.base_url);
        self.get_events(endpoint, &[]).await
    }
}

/// 테스트용 이벤트 소스
///
/// 지갑 조회 응답을 순서대로 돌려주며 마지막 응답은 계속 반복합니다.
/// `Err`는 샘플 실패(연결 거부)를 뜻합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockEventSource {
    pub wallet_script: tokio::sync::Mutex<
        std::collections::VecDeque<Result<Vec<ObservedEvent>, String>>,
    >,
    pub last_script: tokio::sync::Mutex<
        std::collections::VecDeque<Result<Vec<ObservedEvent>, String>>,
    >,
    pub requests: tokio::sync::Mutex<Vec<(String, usize)>>,
    /// 각 샘플을 지연시킬 시간
    pub delay: Option<Duration>,
}

#[cfg(test)]
impl MockEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wallet_samples(mut self, script: Vec<Result<Vec<ObservedEvent>, &str>>) -> Self {
        *self.wallet_script.get_mut() = script
            .into_iter()
            .map(|r| r.map_err(str::to_owned))
            .collect();
        self
    }

    pub fn with_last_received(mut self, script: Vec<Result<Vec<ObservedEvent>, &str>>) -> Self {
        *self.last_script.get_mut() = script
            .into_iter()
            .map(|r| r.map_err(str::to_owned))
            .collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().await.clone()
    }

    async fn next(
        script: &tokio::sync::Mutex<
            std::collections::VecDeque<Result<Vec<ObservedEvent>, String>>,
        >,
    ) -> Result<Vec<ObservedEvent>, SampleError> {
        let mut script = script.lock().await;
        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match next {
            Some(Ok(events)) => Ok(events),
            Some(Err(reason)) => Err(SampleError::Http {
                endpoint: "mock".to_owned(),
                reason,
            }),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
impl EventSource for MockEventSource {
    async fn wallet_events(
        &self,
        wallet: &str,
        limit: usize,
    ) -> Result<Vec<ObservedEvent>, SampleError> {
        self.requests.lock().await.push((wallet.to_owned(), limit));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Self::next(&self.wallet_script).await
    }

    async fn last_received(&self) -> Result<Vec<ObservedEvent>, SampleError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Self::next(&self.last_script).await
    }
}
