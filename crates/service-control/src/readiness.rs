//! 준비 상태 확인기 -- 조건이 관찰되거나 기한이 지날 때까지 서비스를 샘플링
//!
//! [`ReadinessProber`]는 다음 세 가지 형태의 [`ReadinessCheck`]를 지원합니다:
//! - `LogMarkers`: 최근 로그 tail에 마커 문자열 중 하나가 나타나는지
//! - `HttpStatus`: 헬스 엔드포인트가 기대한 상태 코드를 반환하는지
//! - `StatusField`: JSON 상태 문서의 숫자 필드가 최소값에 도달했는지
//!
//! # 상태 전이
//!
//! ```text
//! Waiting ──(조건 거짓, 시간 남음)──> Waiting
//!    │
//!    ├──(조건 참)──> Ready
//!    └──(기한 도달)──> TimedOut
//! ```
//!
//! 샘플 실패(재시작 중 서비스 접속 불가 등)는 `warn`으로 기록하고 다시 시도합니다.
//! 기한 초과는 에러가 아니라 [`ProbeOutcome::TimedOut`]으로 반환되며,
//! 치명적인지는 호출자가 결정합니다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ingest_chaos_core::config::ReadinessConfig;
use ingest_chaos_core::metrics as m;
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ProberConfig;
use crate::error::{ControlError, ProbeSampleError};
use crate::runtime::ServiceRuntime;

/// 샘플 하나에 줄 최소 시간. 기한까지 이보다 적게 남으면 시간 초과로 끝냅니다.
pub const MIN_SAMPLE_BUDGET: Duration = Duration::from_millis(10);

/// 준비 상태 조건
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessCheck {
    /// 로그 tail에 마커 중 하나라도 포함되면 준비됨
    LogMarkers {
        service: String,
        markers: Vec<String>,
        tail_lines: usize,
    },
    /// `GET url`이 `expected` 상태 코드를 반환하면 준비됨
    HttpStatus { url: String, expected: u16 },
    /// `GET url` JSON 문서의 `field`(점 구분 경로) 값이 `min` 이상이면 준비됨
    StatusField { url: String, field: String, min: u64 },
}

impl ReadinessCheck {
    /// 폴러 활동 조건을 설정에서 만듭니다.
    ///
    /// 상태 문서가 설정되어 있으면 타입 있는 필드 조건을, 아니면 로그 마커 조건을 사용합니다.
    pub fn poller_activity(config: &ReadinessConfig, poller: &str) -> Self {
        match (&config.status_url, &config.status_field) {
            (Some(url), Some(field)) => Self::StatusField {
                url: url.clone(),
                field: field.clone(),
                min: config.status_min,
            },
            _ => Self::LogMarkers {
                service: poller.to_owned(),
                markers: config.markers.clone(),
                tail_lines: config.log_tail_lines,
            },
        }
    }

    /// API `/health`가 200을 반환하는 조건
    pub fn api_health(api_url: &str) -> Self {
        Self::HttpStatus {
            url: format!("{}/health", api_url.trim_end_matches('/')),
            expected: 200,
        }
    }
}

impl fmt::Display for ReadinessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LogMarkers { service, .. } => write!(f, "log markers on '{service}'"),
            Self::HttpStatus { url, expected } => write!(f, "GET {url} -> {expected}"),
            Self::StatusField { url, field, min } => write!(f, "{url} {field} >= {min}"),
        }
    }
}

/// 준비 상태 확인 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Ready {
        elapsed: Duration,
        samples: u32,
    },
    TimedOut {
        elapsed: Duration,
        samples: u32,
        /// 마지막 샘플 실패 사유 (있다면)
        last_error: Option<String>,
    },
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    pub fn samples(&self) -> u32 {
        match self {
            Self::Ready { samples, .. } | Self::TimedOut { samples, .. } => *samples,
        }
    }
}

/// 준비 상태 확인기
pub struct ReadinessProber<R: ServiceRuntime> {
    runtime: Arc<R>,
    http: reqwest::Client,
    config: ProberConfig,
}

impl<R: ServiceRuntime> ReadinessProber<R> {
    /// 새 확인기를 생성합니다.
    ///
    /// # Errors
    ///
    /// HTTP 클라이언트를 만들 수 없으면 `ControlError::Config`를 반환합니다.
    pub fn new(runtime: Arc<R>, config: ProberConfig) -> Result<Self, ControlError> {
        let http = reqwest::Client::builder()
            .timeout(config.sample_timeout)
            .build()
            .map_err(|e| ControlError::Config {
                field: "http_client".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            runtime,
            http,
            config,
        })
    }

    /// 조건이 만족되거나 `timeout`이 지날 때까지 샘플링합니다.
    ///
    /// 무한정 대기하지 않습니다: 샘플 하나는 `min(sample_timeout, 남은 시간)`으로
    /// 제한되고 반환 시점은 늦어도 기한 직후입니다. 남은 시간이
    /// [`MIN_SAMPLE_BUDGET`]보다 짧으면 더 샘플링하지 않습니다.
    pub async fn wait_until(&self, check: &ReadinessCheck, timeout: Duration) -> ProbeOutcome {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut samples = 0u32;
        let mut last_error: Option<String> = None;

        debug!(check = %check, timeout_ms = timeout.as_millis() as u64, "waiting for readiness");

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if samples > 0 && remaining < MIN_SAMPLE_BUDGET {
                let elapsed = started.elapsed();
                warn!(
                    check = %check,
                    elapsed_ms = elapsed.as_millis() as u64,
                    samples,
                    last_error = last_error.as_deref().unwrap_or("none"),
                    "readiness timed out"
                );
                return ProbeOutcome::TimedOut {
                    elapsed,
                    samples,
                    last_error,
                };
            }
            let budget = self.config.sample_timeout.min(remaining);

            let sample = match tokio::time::timeout(budget, self.sample(check)).await {
                Ok(result) => result,
                Err(_elapsed) => Err(ProbeSampleError::Timeout(budget)),
            };
            samples += 1;

            match sample {
                Ok(true) => {
                    record_sample("ready");
                    let elapsed = started.elapsed();
                    info!(
                        check = %check,
                        elapsed_ms = elapsed.as_millis() as u64,
                        samples,
                        "service ready"
                    );
                    return ProbeOutcome::Ready { elapsed, samples };
                }
                Ok(false) => {
                    record_sample("pending");
                    debug!(check = %check, attempt = samples, "condition not met yet");
                }
                Err(e) => {
                    record_sample("error");
                    warn!(check = %check, attempt = samples, error = %e, "readiness sample failed");
                    // 기한에 잘린 타임아웃은 앞선 원인을 덮지 않음
                    let cut_short = matches!(e, ProbeSampleError::Timeout(b) if b < self.config.sample_timeout);
                    if !(cut_short && last_error.is_some()) {
                        last_error = Some(e.to_string());
                    }
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        }
    }

    /// 조건을 한 번 샘플링합니다.
    async fn sample(&self, check: &ReadinessCheck) -> Result<bool, ProbeSampleError> {
        match check {
            ReadinessCheck::LogMarkers {
                service,
                markers,
                tail_lines,
            } => {
                let text = self.runtime.logs(service, *tail_lines).await?;
                Ok(markers.iter().any(|marker| text.contains(marker.as_str())))
            }
            ReadinessCheck::HttpStatus { url, expected } => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| ProbeSampleError::Http(e.to_string()))?;
                Ok(response.status().as_u16() == *expected)
            }
            ReadinessCheck::StatusField { url, field, min } => {
                let document: serde_json::Value = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(|e| ProbeSampleError::Http(e.to_string()))?
                    .json()
                    .await
                    .map_err(|e| ProbeSampleError::Decode(e.to_string()))?;
                let value = read_field(&document, field)
                    .ok_or_else(|| ProbeSampleError::MissingField(field.clone()))?;
                Ok(value >= *min)
            }
        }
    }
}

/// 점 구분 경로로 JSON 숫자 필드를 읽습니다. 음수나 숫자가 아닌 값은 `None`입니다.
fn read_field(document: &serde_json::Value, path: &str) -> Option<u64> {
    let value = path
        .split('.')
        .try_fold(document, |node, key| node.get(key))?;
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn record_sample(result: &'static str) {
    counter!(m::PROBE_SAMPLES_TOTAL, m::LABEL_RESULT => result).increment(1);
}
