//! Ethereum 호환 백엔드
//!
//! alloy HTTP 프로바이더로 노드가 관리하는 개발 계정(`eth_accounts`)에서
//! `eth_sendTransaction`을 보내고 영수증을 폴링해 성공 상태면 확정으로 봅니다.
//! 토큰 주소가 설정되면 ERC-20 `transfer(address,uint256)` 호출을 보냅니다.

use std::future::IntoFuture;
use std::time::Duration;

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use alloy::sol_types::SolCall;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportError};
use ingest_chaos_core::config::RecipientMode;
use ingest_chaos_core::types::{Chain, TransactionRecord};
use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::driver::{ChainDriver, Confirmation, record_transfer, wait_confirmed, wait_reachable};
use crate::error::{ChainDriverError, RpcCallError};

alloy::sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// Ethereum 호환 체인 드라이버
pub struct EvmDriver {
    provider: RootProvider<Http<Client>>,
    config: DriverConfig,
    /// 설정된 ERC-20 컨트랙트
    token_contract: Option<Address>,
    /// `connect`에서 읽은 개발 계정
    accounts: RwLock<Vec<Address>>,
}

impl EvmDriver {
    /// 새 드라이버를 생성합니다. 네트워크에는 아직 연결하지 않습니다.
    pub fn new(config: DriverConfig) -> Result<Self, ChainDriverError> {
        config.validate()?;
        let url = config
            .rpc_url
            .parse::<reqwest::Url>()
            .map_err(|e| ChainDriverError::Config {
                field: "rpc_url".to_owned(),
                reason: e.to_string(),
            })?;
        let token_contract = config
            .token
            .as_ref()
            .map(|token| {
                token.address.parse::<Address>().map_err(|e| ChainDriverError::Config {
                    field: "token_address".to_owned(),
                    reason: format!("'{}': {e}", token.address),
                })
            })
            .transpose()?;

        Ok(Self {
            provider: ProviderBuilder::new().on_http(url),
            config,
            token_contract,
            accounts: RwLock::new(Vec::new()),
        })
    }

    /// 요청 하나를 설정된 시간 안에 끝냅니다.
    async fn request<T>(
        &self,
        method: &'static str,
        call: impl IntoFuture<Output = Result<T, TransportError>>,
    ) -> Result<T, ChainDriverError> {
        let source = match tokio::time::timeout(self.config.request_timeout, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => rpc_call_error(method, e),
            Err(_) => RpcCallError::Transport {
                method: method.to_owned(),
                reason: format!("no response within {:?}", self.config.request_timeout),
            },
        };
        Err(ChainDriverError::Rpc {
            chain: Chain::Ethereum,
            source,
        })
    }

    async fn probe(&self) -> Result<(), ChainDriverError> {
        let chain_id = self
            .request("eth_chainId", self.provider.get_chain_id())
            .await?;
        debug!(chain_id, "eth_chainId");
        Ok(())
    }

    async fn receipt_status(&self, tx_hash: B256) -> Result<Confirmation, ChainDriverError> {
        let receipt = self
            .request(
                "eth_getTransactionReceipt",
                self.provider.get_transaction_receipt(tx_hash),
            )
            .await?;
        Ok(match receipt {
            None => Confirmation::Pending,
            Some(receipt) if receipt.status() => Confirmation::Confirmed,
            Some(_) => Confirmation::Failed("reverted (status 0)".to_owned()),
        })
    }

    fn transaction_request(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransactionRequest, ChainDriverError> {
        let from = parse_address(from)?;
        let request = TransactionRequest::default().from(from);
        match self.token_contract {
            Some(contract) => Ok(request
                .to(contract)
                .input(TransactionInput::new(erc20_transfer_calldata(to, amount)?))),
            None => Ok(request.to(parse_address(to)?).value(U256::from(amount))),
        }
    }
}

impl ChainDriver for EvmDriver {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    fn endpoint(&self) -> &str {
        &self.config.rpc_url
    }

    fn transfer_amount(&self) -> u64 {
        self.config.transfer_amount
    }

    async fn connect(&self, timeout: Duration) -> Result<(), ChainDriverError> {
        wait_reachable(
            Chain::Ethereum,
            &self.config.rpc_url,
            timeout,
            self.config.connect_interval,
            || self.probe(),
        )
        .await?;

        let accounts = self
            .request("eth_accounts", self.provider.get_accounts())
            .await?;
        let Some(sender) = accounts.first() else {
            return Err(ChainDriverError::rejected(
                Chain::Ethereum,
                "node exposes no unlocked accounts",
            ));
        };
        info!(accounts = accounts.len(), sender = %format!("{sender:#x}"), "ethereum accounts loaded");
        *self.accounts.write().await = accounts;
        Ok(())
    }

    async fn sender(&self) -> Result<String, ChainDriverError> {
        self.accounts
            .read()
            .await
            .first()
            .map(|account| format!("{account:#x}"))
            .ok_or_else(|| ChainDriverError::rejected(Chain::Ethereum, "not connected"))
    }

    async fn new_recipients(&self, count: usize) -> Result<Vec<String>, ChainDriverError> {
        match self.config.recipients {
            RecipientMode::Fresh => Ok((0..count)
                .map(|_| format!("{:#x}", random_address()))
                .collect()),
            RecipientMode::DevAccounts => {
                let accounts = self.accounts.read().await;
                let available = accounts.len().saturating_sub(1);
                if available < count {
                    return Err(ChainDriverError::rejected(
                        Chain::Ethereum,
                        format!("need {count} dev accounts besides the sender, node has {available}"),
                    ));
                }
                Ok(accounts[1..=count]
                    .iter()
                    .map(|account| format!("{account:#x}"))
                    .collect())
            }
        }
    }

    async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransactionRecord, ChainDriverError> {
        let result = async {
            let request = self.transaction_request(from, to, amount)?;
            let pending = self
                .request("eth_sendTransaction", self.provider.send_transaction(request))
                .await?;
            let tx_hash = *pending.tx_hash();
            let tx_id = format!("{tx_hash:#x}");
            debug!(tx_hash = %tx_id, to, "transaction submitted");

            wait_confirmed(
                Chain::Ethereum,
                &tx_id,
                self.config.confirmation_timeout,
                self.config.confirmation_interval,
                || self.receipt_status(tx_hash),
            )
            .await?;

            Ok(TransactionRecord {
                chain: Chain::Ethereum,
                tx_id,
                from: from.to_owned(),
                to: to.to_owned(),
                value: amount.to_string(),
                token: self.config.token.clone(),
            })
        }
        .await;

        record_transfer(Chain::Ethereum, result.is_ok());
        result
    }
}

/// ERC-20 `transfer(to, amount)` 호출 데이터를 만듭니다.
pub fn erc20_transfer_calldata(to: &str, amount: u64) -> Result<Bytes, ChainDriverError> {
    let call = IERC20::transferCall {
        to: parse_address(to)?,
        amount: U256::from(amount),
    };
    Ok(call.abi_encode().into())
}

fn parse_address(raw: &str) -> Result<Address, ChainDriverError> {
    raw.parse()
        .map_err(|_| ChainDriverError::rejected(Chain::Ethereum, format!("invalid address '{raw}'")))
}

fn rpc_call_error(method: &str, err: TransportError) -> RpcCallError {
    let method = method.to_owned();
    match err {
        RpcError::ErrorResp(payload) => RpcCallError::Remote {
            method,
            code: payload.code,
            message: payload.message.to_string(),
        },
        RpcError::DeserError { err, .. } => RpcCallError::Decode {
            method,
            reason: err.to_string(),
        },
        other => RpcCallError::Transport {
            method,
            reason: other.to_string(),
        },
    }
}

/// 이력이 없는 새 20바이트 주소
fn random_address() -> Address {
    Address::from(rand::random::<[u8; 20]>())
}
