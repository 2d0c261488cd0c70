//! 설정으로 고르는 백엔드
//!
//! [`ChainDriver`]는 RPITIT 트레이트라 trait object로 쓸 수 없으므로,
//! 실행 시점 선택은 열거형 위임으로 처리합니다.

use std::time::Duration;

use ingest_chaos_core::types::{Chain, TransactionRecord};

use crate::config::DriverConfig;
use crate::driver::ChainDriver;
use crate::error::ChainDriverError;
use crate::evm::EvmDriver;
use crate::solana::SolanaDriver;

/// 설정된 백엔드 드라이버
pub enum AnyDriver {
    Evm(EvmDriver),
    Solana(SolanaDriver),
}

impl AnyDriver {
    /// `config.chain`에 맞는 드라이버를 생성합니다.
    pub fn from_config(config: DriverConfig) -> Result<Self, ChainDriverError> {
        match config.chain {
            Chain::Ethereum => EvmDriver::new(config).map(Self::Evm),
            Chain::Solana => SolanaDriver::new(config).map(Self::Solana),
        }
    }
}

impl ChainDriver for AnyDriver {
    fn chain(&self) -> Chain {
        match self {
            Self::Evm(d) => d.chain(),
            Self::Solana(d) => d.chain(),
        }
    }

    fn endpoint(&self) -> &str {
        match self {
            Self::Evm(d) => d.endpoint(),
            Self::Solana(d) => d.endpoint(),
        }
    }

    fn transfer_amount(&self) -> u64 {
        match self {
            Self::Evm(d) => d.transfer_amount(),
            Self::Solana(d) => d.transfer_amount(),
        }
    }

    async fn connect(&self, timeout: Duration) -> Result<(), ChainDriverError> {
        match self {
            Self::Evm(d) => d.connect(timeout).await,
            Self::Solana(d) => d.connect(timeout).await,
        }
    }

    async fn sender(&self) -> Result<String, ChainDriverError> {
        match self {
            Self::Evm(d) => d.sender().await,
            Self::Solana(d) => d.sender().await,
        }
    }

    async fn new_recipients(&self, count: usize) -> Result<Vec<String>, ChainDriverError> {
        match self {
            Self::Evm(d) => d.new_recipients(count).await,
            Self::Solana(d) => d.new_recipients(count).await,
        }
    }

    async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransactionRecord, ChainDriverError> {
        match self {
            Self::Evm(d) => d.transfer(from, to, amount).await,
            Self::Solana(d) => d.transfer(from, to, amount).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_chaos_core::config::HarnessConfig;

    #[test]
    fn backend_follows_configured_chain() {
        let mut core = HarnessConfig::default();
        let evm = AnyDriver::from_config(DriverConfig::from_core(&core)).unwrap();
        assert_eq!(evm.chain(), Chain::Ethereum);
        assert_eq!(evm.endpoint(), "http://127.0.0.1:8545");

        core.chain.backend = Chain::Solana;
        let sol = AnyDriver::from_config(DriverConfig::from_core(&core)).unwrap();
        assert_eq!(sol.chain(), Chain::Solana);
        assert_eq!(sol.transfer_amount(), 1_000_000_000);
    }
}
