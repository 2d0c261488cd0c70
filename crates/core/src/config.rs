//! 설정 관리 — ingest-chaos.toml 파싱 및 런타임 설정
//!
//! [`HarnessConfig`]는 하네스의 모든 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`INGEST_CHAOS_ENDPOINTS_API_URL=...` 형식, 그리고 `API_URL` 등 파이프라인 관례 변수)
//! 3. 설정 파일 (`ingest-chaos.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ingest_chaos_core::error::HarnessError> {
//! use ingest_chaos_core::config::HarnessConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = HarnessConfig::load("ingest-chaos.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = HarnessConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, HarnessError};
use crate::types::Chain;

/// 설정에 둘 수 있는 가장 긴 대기 시간 (하루)
pub const MAX_WAIT: Duration = Duration::from_secs(24 * 60 * 60);

/// 하네스 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub endpoints: EndpointsConfig,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scenarios: ScenariosConfig,
    #[serde(default)]
    pub upstream_retry: UpstreamRetryConfig,
    /// 하네스가 직접 띄우는 보조 파이프라인 프로세스
    #[serde(default)]
    pub aux_processes: Vec<AuxProcessConfig>,
}

impl HarnessConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일이 없으면 기본값에서 시작하여 환경변수 오버라이드를 적용합니다.
    ///
    /// `--config`를 명시하지 않은 실행에서 사용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(HarnessError::Config(ConfigError::FileNotFound { .. })) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarnessError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HarnessError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, HarnessError> {
        toml::from_str(toml_str).map_err(|e| {
            HarnessError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 파이프라인 관례 변수(`API_URL`, `ANVIL_RPC`, `ETH_RPC_URL`, `SOLANA_RPC`,
    /// `SOL_RPC_URL`, `REDIS_URL`, `TEST_MODE`)를 먼저 적용하고,
    /// `INGEST_CHAOS_{SECTION}_{FIELD}` 변수가 그 위에 덮어씁니다.
    pub fn apply_env_overrides(&mut self) {
        // 파이프라인 관례 변수
        override_flag(&mut self.general.test_mode, "TEST_MODE");
        override_string(&mut self.endpoints.api_url, "API_URL");
        override_string(&mut self.endpoints.eth_rpc_url, "ANVIL_RPC");
        override_string(&mut self.endpoints.eth_rpc_url, "ETH_RPC_URL");
        override_string(&mut self.endpoints.sol_rpc_url, "SOLANA_RPC");
        override_string(&mut self.endpoints.sol_rpc_url, "SOL_RPC_URL");
        override_string(&mut self.endpoints.bus_url, "REDIS_URL");

        // General
        override_string(&mut self.general.log_level, "INGEST_CHAOS_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "INGEST_CHAOS_GENERAL_LOG_FORMAT",
        );
        override_flag(&mut self.general.test_mode, "INGEST_CHAOS_GENERAL_TEST_MODE");

        // Endpoints
        override_string(&mut self.endpoints.api_url, "INGEST_CHAOS_ENDPOINTS_API_URL");
        override_string(
            &mut self.endpoints.eth_rpc_url,
            "INGEST_CHAOS_ENDPOINTS_ETH_RPC_URL",
        );
        override_string(
            &mut self.endpoints.sol_rpc_url,
            "INGEST_CHAOS_ENDPOINTS_SOL_RPC_URL",
        );
        override_string(&mut self.endpoints.bus_url, "INGEST_CHAOS_ENDPOINTS_BUS_URL");
        override_parse(
            &mut self.endpoints.request_timeout_ms,
            "INGEST_CHAOS_ENDPOINTS_REQUEST_TIMEOUT_MS",
        );

        // Services
        override_string(
            &mut self.services.docker_socket,
            "INGEST_CHAOS_SERVICES_DOCKER_SOCKET",
        );
        override_string(
            &mut self.services.compose_project,
            "INGEST_CHAOS_SERVICES_COMPOSE_PROJECT",
        );
        override_csv(
            &mut self.services.compose_files,
            "INGEST_CHAOS_SERVICES_COMPOSE_FILES",
        );
        override_string(
            &mut self.services.chain_ethereum,
            "INGEST_CHAOS_SERVICES_CHAIN_ETHEREUM",
        );
        override_string(
            &mut self.services.chain_solana,
            "INGEST_CHAOS_SERVICES_CHAIN_SOLANA",
        );
        override_string(&mut self.services.bus, "INGEST_CHAOS_SERVICES_BUS");
        override_string(&mut self.services.api, "INGEST_CHAOS_SERVICES_API");
        override_string(&mut self.services.poller, "INGEST_CHAOS_SERVICES_POLLER");
        override_string(&mut self.services.store, "INGEST_CHAOS_SERVICES_STORE");
        override_parse(
            &mut self.services.action_timeout_secs,
            "INGEST_CHAOS_SERVICES_ACTION_TIMEOUT_SECS",
        );

        // Readiness
        override_parse(
            &mut self.readiness.poll_interval_ms,
            "INGEST_CHAOS_READINESS_POLL_INTERVAL_MS",
        );
        override_parse(
            &mut self.readiness.poller_timeout_secs,
            "INGEST_CHAOS_READINESS_POLLER_TIMEOUT_SECS",
        );
        override_parse(
            &mut self.readiness.log_tail_lines,
            "INGEST_CHAOS_READINESS_LOG_TAIL_LINES",
        );
        override_csv(&mut self.readiness.markers, "INGEST_CHAOS_READINESS_MARKERS");
        override_optional(
            &mut self.readiness.status_url,
            "INGEST_CHAOS_READINESS_STATUS_URL",
        );
        override_optional(
            &mut self.readiness.status_field,
            "INGEST_CHAOS_READINESS_STATUS_FIELD",
        );

        // Oracle
        override_parse(
            &mut self.oracle.poll_interval_ms,
            "INGEST_CHAOS_ORACLE_POLL_INTERVAL_MS",
        );
        override_parse(&mut self.oracle.page_limit, "INGEST_CHAOS_ORACLE_PAGE_LIMIT");
        override_parse(
            &mut self.oracle.visibility_timeout_secs,
            "INGEST_CHAOS_ORACLE_VISIBILITY_TIMEOUT_SECS",
        );

        // Chain
        override_parse(&mut self.chain.backend, "INGEST_CHAOS_CHAIN_BACKEND");
        override_parse(&mut self.chain.recipients, "INGEST_CHAOS_CHAIN_RECIPIENTS");
        override_optional(
            &mut self.chain.token_address,
            "INGEST_CHAOS_CHAIN_TOKEN_ADDRESS",
        );

        // Scenarios
        override_parse_csv(&mut self.scenarios.enabled, "INGEST_CHAOS_SCENARIOS_ENABLED");
        override_optional(
            &mut self.scenarios.smoke_watched_address,
            "INGEST_CHAOS_SCENARIOS_SMOKE_WATCHED_ADDRESS",
        );
        override_parse(
            &mut self.scenarios.bus_recovery_timeout_secs,
            "INGEST_CHAOS_SCENARIOS_BUS_RECOVERY_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        require_non_empty("endpoints.api_url", &self.endpoints.api_url)?;
        require_non_empty("endpoints.bus_url", &self.endpoints.bus_url)?;
        match self.chain.backend {
            Chain::Ethereum => require_non_empty("endpoints.eth_rpc_url", &self.endpoints.eth_rpc_url)?,
            Chain::Solana => require_non_empty("endpoints.sol_rpc_url", &self.endpoints.sol_rpc_url)?,
        }
        require_positive("endpoints.request_timeout_ms", self.endpoints.request_timeout_ms)?;

        for (field, name) in [
            ("services.compose_project", &self.services.compose_project),
            ("services.chain_ethereum", &self.services.chain_ethereum),
            ("services.chain_solana", &self.services.chain_solana),
            ("services.bus", &self.services.bus),
            ("services.api", &self.services.api),
            ("services.poller", &self.services.poller),
            ("services.store", &self.services.store),
        ] {
            require_non_empty(field, name)?;
        }
        require_positive("services.action_timeout_secs", self.services.action_timeout_secs)?;

        require_positive("readiness.poll_interval_ms", self.readiness.poll_interval_ms)?;
        require_positive("readiness.poller_timeout_secs", self.readiness.poller_timeout_secs)?;
        require_positive(
            "readiness.api_health_timeout_secs",
            self.readiness.api_health_timeout_secs,
        )?;
        require_positive("readiness.log_tail_lines", self.readiness.log_tail_lines)?;
        require_interval_within(
            "readiness.poll_interval_ms",
            self.readiness.poll_interval(),
            self.readiness.poller_timeout(),
        )?;
        match (&self.readiness.status_url, &self.readiness.status_field) {
            (Some(_), None) => {
                return Err(invalid(
                    "readiness.status_field",
                    "required when readiness.status_url is set",
                ));
            }
            (None, Some(_)) => {
                return Err(invalid(
                    "readiness.status_url",
                    "required when readiness.status_field is set",
                ));
            }
            (None, None) if self.readiness.markers.iter().all(|m| m.trim().is_empty()) => {
                return Err(invalid(
                    "readiness.markers",
                    "at least one marker is required when no status probe is configured",
                ));
            }
            _ => {}
        }

        require_positive("oracle.poll_interval_ms", self.oracle.poll_interval_ms)?;
        require_positive("oracle.page_limit", self.oracle.page_limit)?;
        require_positive(
            "oracle.visibility_timeout_secs",
            self.oracle.visibility_timeout_secs,
        )?;
        require_positive("oracle.recheck_timeout_secs", self.oracle.recheck_timeout_secs)?;
        require_interval_within(
            "oracle.poll_interval_ms",
            self.oracle.poll_interval(),
            self.oracle.visibility_timeout(),
        )?;

        require_positive("chain.connect_timeout_secs", self.chain.connect_timeout_secs)?;
        require_positive("chain.connect_interval_ms", self.chain.connect_interval_ms)?;
        require_interval_within(
            "chain.connect_interval_ms",
            self.chain.connect_interval(),
            self.chain.connect_timeout(),
        )?;
        require_positive(
            "chain.confirmation_timeout_secs",
            self.chain.confirmation_timeout_secs,
        )?;
        require_positive(
            "chain.confirmation_interval_ms",
            self.chain.confirmation_interval_ms,
        )?;
        require_interval_within(
            "chain.confirmation_interval_ms",
            self.chain.confirmation_interval(),
            self.chain.confirmation_timeout(),
        )?;
        if self.chain.token_address.is_some() && self.chain.backend != Chain::Ethereum {
            return Err(invalid(
                "chain.token_address",
                "token transfers are only supported on the ethereum backend",
            ));
        }
        if self.chain.transfer_amount == Some(0) {
            return Err(invalid("chain.transfer_amount", "must be greater than 0"));
        }

        for (field, name) in [
            ("store.user", &self.store.user),
            ("store.database", &self.store.database),
            ("store.table", &self.store.table),
        ] {
            require_non_empty(field, name)?;
        }
        if !self
            .store
            .table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(invalid(
                "store.table",
                "must contain only alphanumerics, '_' or '.'",
            ));
        }

        require_positive(
            "scenarios.pre_restart_transfers",
            self.scenarios.pre_restart_transfers,
        )?;
        require_positive(
            "scenarios.post_restart_transfers",
            self.scenarios.post_restart_transfers,
        )?;
        require_positive(
            "scenarios.bus_recovery_timeout_secs",
            self.scenarios.bus_recovery_timeout_secs,
        )?;

        if self.upstream_retry.factor.is_nan() || self.upstream_retry.factor < 1.0 {
            return Err(invalid("upstream_retry.factor", "must be >= 1.0"));
        }
        require_positive("upstream_retry.attempts", self.upstream_retry.attempts)?;

        for (idx, process) in self.aux_processes.iter().enumerate() {
            require_non_empty(&format!("aux_processes[{idx}].name"), &process.name)?;
            require_non_empty(&format!("aux_processes[{idx}].program"), &process.program)?;
        }

        let secs = Duration::from_secs;
        let millis = Duration::from_millis;
        for (field, value) in [
            ("endpoints.request_timeout_ms", millis(self.endpoints.request_timeout_ms)),
            ("services.action_timeout_secs", secs(self.services.action_timeout_secs)),
            ("readiness.poll_interval_ms", millis(self.readiness.poll_interval_ms)),
            ("readiness.poller_timeout_secs", secs(self.readiness.poller_timeout_secs)),
            ("readiness.api_health_timeout_secs", secs(self.readiness.api_health_timeout_secs)),
            ("oracle.poll_interval_ms", millis(self.oracle.poll_interval_ms)),
            ("oracle.visibility_timeout_secs", secs(self.oracle.visibility_timeout_secs)),
            ("oracle.recheck_timeout_secs", secs(self.oracle.recheck_timeout_secs)),
            ("chain.connect_timeout_secs", secs(self.chain.connect_timeout_secs)),
            ("chain.connect_interval_ms", millis(self.chain.connect_interval_ms)),
            ("chain.confirmation_timeout_secs", secs(self.chain.confirmation_timeout_secs)),
            ("chain.confirmation_interval_ms", millis(self.chain.confirmation_interval_ms)),
            ("scenarios.baseline_settle_secs", secs(self.scenarios.baseline_settle_secs)),
            ("scenarios.chain_down_secs", secs(self.scenarios.chain_down_secs)),
            ("scenarios.reconnect_settle_secs", secs(self.scenarios.reconnect_settle_secs)),
            (
                "scenarios.bus_down_before_submit_secs",
                secs(self.scenarios.bus_down_before_submit_secs),
            ),
            (
                "scenarios.bus_down_after_submit_secs",
                secs(self.scenarios.bus_down_after_submit_secs),
            ),
            ("scenarios.bus_recovery_timeout_secs", secs(self.scenarios.bus_recovery_timeout_secs)),
            ("scenarios.api_restart_settle_secs", secs(self.scenarios.api_restart_settle_secs)),
            ("scenarios.session_settle_secs", secs(self.scenarios.session_settle_secs)),
            ("upstream_retry.base_ms", self.upstream_retry.ceiling()),
        ] {
            require_at_most(field, value, MAX_WAIT)?;
        }

        Ok(())
    }

    /// 체인 백엔드에 해당하는 RPC 엔드포인트를 반환합니다.
    pub fn rpc_url(&self) -> &str {
        match self.chain.backend {
            Chain::Ethereum => &self.endpoints.eth_rpc_url,
            Chain::Solana => &self.endpoints.sol_rpc_url,
        }
    }

    /// 체인 백엔드에 해당하는 체인 노드 서비스 이름을 반환합니다.
    pub fn chain_service(&self) -> &str {
        match self.chain.backend {
            Chain::Ethereum => &self.services.chain_ethereum,
            Chain::Solana => &self.services.chain_solana,
        }
    }

    /// 버스 다운타임 시나리오의 가시성 대기 한도.
    ///
    /// `max(bus_recovery_timeout, 2 × upstream 재시도 상한)`
    pub fn bus_poll_timeout(&self) -> Duration {
        let configured = Duration::from_secs(self.scenarios.bus_recovery_timeout_secs);
        configured.max(self.upstream_retry.ceiling().saturating_mul(2))
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 파이프라인을 테스트 모드로 실행 중인지 여부 (`TEST_MODE`)
    pub test_mode: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            test_mode: false,
        }
    }
}

/// 외부 엔드포인트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// 파이프라인 질의 API 주소
    pub api_url: String,
    /// Ethereum 호환 RPC 주소
    pub eth_rpc_url: String,
    /// Solana 호환 RPC 주소
    pub sol_rpc_url: String,
    /// 메시지 버스 주소 (보조 프로세스에 전달)
    pub bus_url: String,
    /// HTTP 요청 단위 타임아웃 (밀리초)
    pub request_timeout_ms: u64,
}

impl EndpointsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".to_owned(),
            eth_rpc_url: "http://127.0.0.1:8545".to_owned(),
            sol_rpc_url: "http://127.0.0.1:8899".to_owned(),
            bus_url: "redis://127.0.0.1:6379".to_owned(),
            request_timeout_ms: 3_000,
        }
    }
}

/// 외부 서비스 제어 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Docker 소켓 경로
    pub docker_socket: String,
    /// docker compose 프로젝트 이름
    pub compose_project: String,
    /// docker compose 파일 목록
    pub compose_files: Vec<String>,
    pub chain_ethereum: String,
    pub chain_solana: String,
    pub bus: String,
    pub api: String,
    pub poller: String,
    pub store: String,
    /// 생명주기 조작 하나의 타임아웃 (초)
    pub action_timeout_secs: u64,
}

impl ServicesConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            docker_socket: "/var/run/docker.sock".to_owned(),
            compose_project: "infra".to_owned(),
            compose_files: vec![
                "infra/docker-compose.yml".to_owned(),
                "infra/test-docker-compose.yml".to_owned(),
            ],
            chain_ethereum: "anvil".to_owned(),
            chain_solana: "solana".to_owned(),
            bus: "redis".to_owned(),
            api: "api".to_owned(),
            poller: "rust".to_owned(),
            store: "postgres".to_owned(),
            action_timeout_secs: 60,
        }
    }
}

/// 준비 상태 확인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// 샘플링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 폴러 활동 대기 한도 (초)
    pub poller_timeout_secs: u64,
    /// 로그 tail 줄 수
    pub log_tail_lines: usize,
    /// 폴러 활동을 나타내는 로그 마커
    pub markers: Vec<String>,
    /// 타입 있는 상태 문서 주소 (설정 시 로그 마커 대신 사용)
    pub status_url: Option<String>,
    /// 상태 문서의 숫자 필드 경로 (점 구분)
    pub status_field: Option<String>,
    /// 상태 필드가 도달해야 하는 최소값
    pub status_min: u64,
    /// API `/health` 대기 한도 (초)
    pub api_health_timeout_secs: u64,
}

impl ReadinessConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poller_timeout(&self) -> Duration {
        Duration::from_secs(self.poller_timeout_secs)
    }

    pub fn api_health_timeout(&self) -> Duration {
        Duration::from_secs(self.api_health_timeout_secs)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            poller_timeout_secs: 60,
            log_tail_lines: 100,
            markers: vec![
                "Polling blocks".to_owned(),
                "Published event".to_owned(),
                "Starting ETH HTTP polling".to_owned(),
            ],
            status_url: None,
            status_field: None,
            status_min: 1,
            api_health_timeout_secs: 30,
        }
    }
}

/// 이벤트 오라클 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 지갑 조회 시 `limit` 파라미터
    pub page_limit: usize,
    /// 새 트랜잭션 가시성 대기 한도 (초)
    pub visibility_timeout_secs: u64,
    /// 이전에 관측된 트랜잭션 재확인 한도 (초)
    pub recheck_timeout_secs: u64,
}

impl OracleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.visibility_timeout_secs)
    }

    pub fn recheck_timeout(&self) -> Duration {
        Duration::from_secs(self.recheck_timeout_secs)
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            page_limit: 100,
            visibility_timeout_secs: 60,
            recheck_timeout_secs: 30,
        }
    }
}

/// 수신자 계정 선택 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecipientMode {
    /// 매 전송마다 새로 생성한 주소 (다른 실행과 격리됨)
    #[default]
    Fresh,
    /// 노드의 개발용 계정 (과거 실행의 이벤트가 남아 있을 수 있음)
    DevAccounts,
}

impl FromStr for RecipientMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fresh" => Ok(Self::Fresh),
            "dev-accounts" => Ok(Self::DevAccounts),
            other => Err(format!("unknown recipient mode '{other}'")),
        }
    }
}

/// 체인 드라이버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// 체인 백엔드
    pub backend: Chain,
    /// 연결 확인 한도 (초)
    pub connect_timeout_secs: u64,
    /// 연결 확인 간격 (밀리초)
    pub connect_interval_ms: u64,
    /// 트랜잭션 확정 대기 한도 (초)
    pub confirmation_timeout_secs: u64,
    /// 확정 확인 간격 (밀리초)
    pub confirmation_interval_ms: u64,
    /// 전송량 (최소 단위). 없으면 백엔드 기본값 (1 ETH / 1 SOL)
    pub transfer_amount: Option<u64>,
    /// 수신자 선택 방식
    pub recipients: RecipientMode,
    /// 설정 시 ERC-20 `transfer`로 전송
    pub token_address: Option<String>,
    /// 토큰 심볼 (구조 검증용)
    pub token_symbol: Option<String>,
    /// Solana 송신자 에어드롭 양 (lamports)
    pub airdrop_lamports: u64,
}

/// 1 ETH (wei)
const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;
/// 1 SOL (lamports)
const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

impl ChainConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn connect_interval(&self) -> Duration {
        Duration::from_millis(self.connect_interval_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn confirmation_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_interval_ms)
    }

    /// 백엔드를 고려한 실제 전송량
    pub fn effective_transfer_amount(&self) -> u64 {
        self.transfer_amount.unwrap_or(match self.backend {
            Chain::Ethereum => WEI_PER_ETHER,
            Chain::Solana => LAMPORTS_PER_SOL,
        })
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            backend: Chain::Ethereum,
            connect_timeout_secs: 30,
            connect_interval_ms: 1_000,
            confirmation_timeout_secs: 60,
            confirmation_interval_ms: 500,
            transfer_amount: None,
            recipients: RecipientMode::Fresh,
            token_address: None,
            token_symbol: None,
            airdrop_lamports: 10 * LAMPORTS_PER_SOL,
        }
    }
}

/// 파이프라인 이벤트 저장소 관리 접근 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub user: String,
    pub database: String,
    /// 세션 시작 시 비우는 테이블
    pub table: String,
}

impl StoreConfig {
    /// 저장소 서비스 안에서 실행할 truncate 명령
    pub fn truncate_command(&self) -> Vec<String> {
        vec![
            "psql".to_owned(),
            "-U".to_owned(),
            self.user.clone(),
            "-d".to_owned(),
            self.database.clone(),
            "-c".to_owned(),
            format!("TRUNCATE TABLE {};", self.table),
        ]
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            user: "testuser".to_owned(),
            database: "testdb".to_owned(),
            table: "events".to_owned(),
        }
    }
}

/// 실행 가능한 시나리오
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    RpcDisconnect,
    BusDowntime,
    ApiRestart,
    DeliverySmoke,
}

impl ScenarioKind {
    /// 모든 시나리오 (기본 실행 순서)
    pub const ALL: [Self; 4] = [
        Self::RpcDisconnect,
        Self::BusDowntime,
        Self::ApiRestart,
        Self::DeliverySmoke,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RpcDisconnect => "rpc-disconnect",
            Self::BusDowntime => "bus-downtime",
            Self::ApiRestart => "api-restart",
            Self::DeliverySmoke => "delivery-smoke",
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown scenario '{s}' (expected one of: {})",
                    Self::ALL.map(|k| k.as_str()).join(", ")
                )
            })
    }
}

/// 시나리오 설정
///
/// `*_secs` 대기 시간은 정확성 보장이 아니라 상한 안전 여유입니다.
/// 구체적인 조건이 있는 곳에서는 먼저 조건을 폴링합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenariosConfig {
    /// 실행할 시나리오 (순서대로)
    pub enabled: Vec<ScenarioKind>,
    pub pre_restart_transfers: usize,
    pub post_restart_transfers: usize,
    pub baseline_settle_secs: u64,
    pub chain_down_secs: u64,
    pub reconnect_settle_secs: u64,
    pub bus_down_before_submit_secs: u64,
    pub bus_down_after_submit_secs: u64,
    pub bus_recovery_timeout_secs: u64,
    pub api_restart_settle_secs: u64,
    /// delivery-smoke 시나리오의 감시 주소 (없으면 새 수신자)
    pub smoke_watched_address: Option<String>,
    /// 세션 픽스처 재시작 후 안정화 대기 (초)
    pub session_settle_secs: u64,
}

impl Default for ScenariosConfig {
    fn default() -> Self {
        Self {
            enabled: vec![
                ScenarioKind::RpcDisconnect,
                ScenarioKind::BusDowntime,
                ScenarioKind::ApiRestart,
            ],
            pre_restart_transfers: 2,
            post_restart_transfers: 2,
            baseline_settle_secs: 3,
            chain_down_secs: 5,
            reconnect_settle_secs: 15,
            bus_down_before_submit_secs: 2,
            bus_down_after_submit_secs: 5,
            bus_recovery_timeout_secs: 120,
            api_restart_settle_secs: 5,
            smoke_watched_address: None,
            session_settle_secs: 10,
        }
    }
}

/// 업스트림 프로듀서의 발행 재시도 정책
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamRetryConfig {
    /// 최대 시도 횟수
    pub attempts: u32,
    /// 첫 재시도 지연 (밀리초)
    pub base_ms: u64,
    /// 지연 증가 배수
    pub factor: f64,
}

impl UpstreamRetryConfig {
    /// 모든 재시도 지연의 합 (시도 사이 간격 `attempts - 1`개)
    pub fn ceiling(&self) -> Duration {
        let mut total_ms = 0.0_f64;
        let mut delay = self.base_ms as f64;
        for _ in 1..self.attempts {
            total_ms += delay;
            delay *= self.factor;
        }
        Duration::from_millis(total_ms.round() as u64)
    }
}

impl Default for UpstreamRetryConfig {
    fn default() -> Self {
        Self {
            attempts: 8,
            base_ms: 500,
            factor: 2.0,
        }
    }
}

/// 하네스가 직접 실행하는 보조 프로세스
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxProcessConfig {
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    /// 추가 환경변수
    pub env: BTreeMap<String, String>,
    /// 작업 디렉토리
    pub workdir: Option<String>,
}

// --- 검증 헬퍼 ---

fn invalid(field: &str, reason: impl Into<String>) -> HarnessError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

fn require_non_empty(field: &str, value: &str) -> Result<(), HarnessError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    Ok(())
}

fn require_positive<T: PartialEq + Default>(field: &str, value: T) -> Result<(), HarnessError> {
    if value == T::default() {
        return Err(invalid(field, "must be greater than 0"));
    }
    Ok(())
}

fn require_at_most(field: &str, value: Duration, max: Duration) -> Result<(), HarnessError> {
    if value > max {
        return Err(invalid(field, format!("{value:?} exceeds the {max:?} limit")));
    }
    Ok(())
}

fn require_interval_within(
    field: &str,
    interval: Duration,
    timeout: Duration,
) -> Result<(), HarnessError> {
    if interval > timeout {
        return Err(invalid(
            field,
            format!("interval {interval:?} exceeds its timeout {timeout:?}"),
        ));
    }
    Ok(())
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_optional(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.trim().is_empty() { None } else { Some(val) };
    }
}

/// `true/false` 외에 `1/0`, `yes/no`도 허용합니다.
fn override_flag(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => *target = true,
            "0" | "false" | "no" | "off" => *target = false,
            _ => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse flag from env var, ignoring"
            ),
        }
    }
}

fn override_parse<T>(target: &mut T, env_key: &str)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}

fn override_parse_csv<T>(target: &mut Vec<T>, env_key: &str)
where
    T: FromStr,
    T::Err: fmt::Display,
{
    if let Ok(val) = std::env::var(env_key) {
        let parsed: Result<Vec<T>, _> = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<T>)
            .collect();
        match parsed {
            Ok(values) => *target = values,
            Err(e) => warn!(
                env_key,
                value = val.as_str(),
                error = %e,
                "failed to parse list from env var, ignoring"
            ),
        }
    }
}
