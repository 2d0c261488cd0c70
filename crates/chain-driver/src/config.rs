//! 체인 드라이버 설정
//!
//! [`DriverConfig`]는 core의 [`ChainConfig`](ingest_chaos_core::config::ChainConfig)와 엔드포인트 설정을 기반으로 합니다.

use std::time::Duration;

use ingest_chaos_core::config::{HarnessConfig, RecipientMode};
use ingest_chaos_core::types::{Chain, TokenInfo};

use crate::error::ChainDriverError;

/// 설정 상한값 상수
const MAX_CONFIRMATION_TIMEOUT_SECS: u64 = 600;

/// 체인 드라이버 설정
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub chain: Chain,
    pub rpc_url: String,
    /// RPC 요청 하나의 타임아웃
    pub request_timeout: Duration,
    pub connect_interval: Duration,
    pub confirmation_timeout: Duration,
    pub confirmation_interval: Duration,
    /// 전송 한 건의 양 (wei / lamports / 토큰 최소 단위)
    pub transfer_amount: u64,
    pub recipients: RecipientMode,
    /// 설정 시 ERC-20 전송
    pub token: Option<TokenInfo>,
    /// Solana 송신자 에어드롭 양
    pub airdrop_lamports: u64,
}

impl DriverConfig {
    /// core 설정에서 드라이버 설정을 생성합니다.
    pub fn from_core(core: &HarnessConfig) -> Self {
        let chain = &core.chain;
        let token = chain.token_address.as_ref().map(|address| TokenInfo {
            address: address.clone(),
            symbol: chain.token_symbol.clone().unwrap_or_default(),
            decimals: None,
        });
        Self {
            chain: chain.backend,
            rpc_url: core.rpc_url().to_owned(),
            request_timeout: core.endpoints.request_timeout(),
            connect_interval: chain.connect_interval(),
            confirmation_timeout: chain.confirmation_timeout(),
            confirmation_interval: chain.confirmation_interval(),
            transfer_amount: chain.effective_transfer_amount(),
            recipients: chain.recipients,
            token,
            airdrop_lamports: chain.airdrop_lamports,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ChainDriverError> {
        if self.rpc_url.is_empty() {
            return Err(config_error("rpc_url", "must not be empty"));
        }
        if self.confirmation_timeout.is_zero()
            || self.confirmation_timeout.as_secs() > MAX_CONFIRMATION_TIMEOUT_SECS
        {
            return Err(config_error(
                "confirmation_timeout",
                &format!("must be 1-{MAX_CONFIRMATION_TIMEOUT_SECS}s"),
            ));
        }
        if self.confirmation_interval.is_zero() || self.connect_interval.is_zero() {
            return Err(config_error("interval", "must be greater than 0"));
        }
        if self.transfer_amount == 0 {
            return Err(config_error("transfer_amount", "must be greater than 0"));
        }
        if self.token.is_some() && self.chain != Chain::Ethereum {
            return Err(config_error(
                "token_address",
                "token transfers are only supported on ethereum",
            ));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self::from_core(&HarnessConfig::default())
    }
}

fn config_error(field: &str, reason: &str) -> ChainDriverError {
    ChainDriverError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}
