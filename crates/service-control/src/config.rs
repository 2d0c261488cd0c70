//! 서비스 제어 설정
//!
//! [`ControllerConfig`]는 core의 [`ServicesConfig`]를, [`ProberConfig`]는
//! [`ReadinessConfig`]와 [`EndpointsConfig`]를 기반으로 합니다.
//!
//! # 사용 예시
//! ```ignore
//! use ingest_chaos_core::config::HarnessConfig;
//! use ingest_chaos_service_control::config::ControllerConfig;
//!
//! let core_config = HarnessConfig::default();
//! let config = ControllerConfig::from_core(&core_config.services);
//! ```

use std::time::Duration;

use ingest_chaos_core::config::{EndpointsConfig, ReadinessConfig, ServicesConfig};
use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// 설정 상한값 상수
const MAX_ACTION_TIMEOUT_SECS: u64 = 600;
const MAX_STOP_GRACE_SECS: u64 = 120;

/// 서비스 컨트롤러 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// compose 프로젝트 이름 (컨테이너 이름 `{project}-{service}-1`)
    pub compose_project: String,
    /// compose 파일 목록
    pub compose_files: Vec<String>,
    /// 생명주기 조작 하나의 타임아웃 (초)
    pub action_timeout_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// compose CLI 실행 파일
    pub compose_program: String,
    /// 정지 시 SIGKILL 전 대기 시간 (초)
    pub stop_grace_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_core(&ServicesConfig::default())
    }
}

impl ControllerConfig {
    /// core의 `ServicesConfig`에서 컨트롤러 설정을 생성합니다.
    pub fn from_core(core: &ServicesConfig) -> Self {
        Self {
            docker_socket: core.docker_socket.clone(),
            compose_project: core.compose_project.clone(),
            compose_files: core.compose_files.clone(),
            action_timeout_secs: core.action_timeout_secs,
            compose_program: "docker".to_owned(),
            stop_grace_secs: 10,
        }
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    /// 서비스 이름에 해당하는 컨테이너 이름을 반환합니다.
    pub fn container_name(&self, service: &str) -> String {
        format!("{}-{}-1", self.compose_project, service)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.action_timeout_secs == 0 || self.action_timeout_secs > MAX_ACTION_TIMEOUT_SECS {
            return Err(ControlError::Config {
                field: "action_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_ACTION_TIMEOUT_SECS}"),
            });
        }

        if self.stop_grace_secs > MAX_STOP_GRACE_SECS {
            return Err(ControlError::Config {
                field: "stop_grace_secs".to_owned(),
                reason: format!("must be 0-{MAX_STOP_GRACE_SECS}"),
            });
        }

        if self.compose_project.is_empty() {
            return Err(ControlError::Config {
                field: "compose_project".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.compose_program.is_empty() {
            return Err(ControlError::Config {
                field: "compose_program".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        Ok(())
    }
}

/// 컨트롤러 설정 빌더
#[derive(Default)]
pub struct ControllerConfigBuilder {
    config: ControllerConfig,
}

impl ControllerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn docker_socket(mut self, socket: impl Into<String>) -> Self {
        self.config.docker_socket = socket.into();
        self
    }

    pub fn compose_project(mut self, project: impl Into<String>) -> Self {
        self.config.compose_project = project.into();
        self
    }

    pub fn compose_files(mut self, files: Vec<String>) -> Self {
        self.config.compose_files = files;
        self
    }

    pub fn action_timeout_secs(mut self, secs: u64) -> Self {
        self.config.action_timeout_secs = secs;
        self
    }

    pub fn compose_program(mut self, program: impl Into<String>) -> Self {
        self.config.compose_program = program.into();
        self
    }

    pub fn stop_grace_secs(mut self, secs: u64) -> Self {
        self.config.stop_grace_secs = secs;
        self
    }

    /// 설정을 검증하고 `ControllerConfig`를 생성합니다.
    pub fn build(self) -> Result<ControllerConfig, ControlError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// 준비 상태 확인기 설정
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// 샘플링 간격
    pub poll_interval: Duration,
    /// 샘플 하나의 타임아웃 (HTTP 요청, 로그 조회)
    pub sample_timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self::from_core(&ReadinessConfig::default(), &EndpointsConfig::default())
    }
}

impl ProberConfig {
    pub fn from_core(readiness: &ReadinessConfig, endpoints: &EndpointsConfig) -> Self {
        Self {
            poll_interval: readiness.poll_interval(),
            sample_timeout: endpoints.request_timeout(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ControllerConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let core = ServicesConfig {
            compose_project: "chaos".to_owned(),
            action_timeout_secs: 15,
            ..ServicesConfig::default()
        };
        let config = ControllerConfig::from_core(&core);
        assert_eq!(config.compose_project, "chaos");
        assert_eq!(config.action_timeout(), Duration::from_secs(15));
        assert_eq!(config.compose_files.len(), 2);
        // extended fields use defaults
        assert_eq!(config.compose_program, "docker");
        assert_eq!(config.stop_grace_secs, 10);
    }

    #[test]
    fn container_name_follows_compose_convention() {
        let config = ControllerConfig::default();
        assert_eq!(config.container_name("postgres"), "infra-postgres-1");
    }

    #[test]
    fn validate_rejects_zero_action_timeout() {
        let result = ControllerConfigBuilder::new().action_timeout_secs(0).build();
        assert!(matches!(result, Err(ControlError::Config { .. })));
    }

    #[test]
    fn validate_rejects_excessive_grace() {
        let result = ControllerConfigBuilder::new().stop_grace_secs(1_000).build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_sets_all_fields() {
        let config = ControllerConfigBuilder::new()
            .docker_socket("/run/docker.sock")
            .compose_project("p")
            .compose_files(vec!["a.yml".to_owned()])
            .action_timeout_secs(5)
            .compose_program("podman")
            .stop_grace_secs(1)
            .build()
            .unwrap();
        assert_eq!(config.docker_socket, "/run/docker.sock");
        assert_eq!(config.container_name("api"), "p-api-1");
        assert_eq!(config.compose_program, "podman");
    }

    #[test]
    fn prober_config_from_core() {
        let config = ProberConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.sample_timeout, Duration::from_secs(3));
    }
}
