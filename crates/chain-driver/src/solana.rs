//! Solana 호환 백엔드
//!
//! CLI 없이 동작합니다. 송신 키 쌍은 드라이버 생성 시 만들고, `requestAirdrop`으로
//! 자금을 받고, 시스템 프로그램 전송 메시지를 직접 서명해 `sendTransaction`(base64)으로
//! 제출합니다. 확정은 `getSignatureStatuses`를 폴링해 `confirmed` 이상이면 인정합니다.
//!
//! 테스트 검증기가 재시작되면 잔액이 사라지므로 `connect`가 잔액을 확인하고
//! 부족하면 에어드롭을 다시 요청합니다. 연결 없이 잔액만 사라질 수도 있어서
//! 전송마다 수량과 수수료를 낼 잔액이 있는지 다시 확인합니다.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use ed25519_dalek::SigningKey;
use ingest_chaos_core::config::RecipientMode;
use ingest_chaos_core::types::{Chain, TransactionRecord};
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::DriverConfig;
use crate::driver::{ChainDriver, Confirmation, record_transfer, wait_confirmed, wait_reachable};
use crate::error::ChainDriverError;
use crate::message::{sign_transaction, transfer_message};
use crate::rpc::JsonRpcClient;

/// 서명 하나짜리 전송의 기본 수수료
const SIGNATURE_FEE_LAMPORTS: u64 = 5_000;

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct LatestBlockhash {
    blockhash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    confirmation_status: Option<String>,
}

/// Solana 호환 체인 드라이버
pub struct SolanaDriver {
    rpc: JsonRpcClient,
    config: DriverConfig,
    signer: SigningKey,
    sender: String,
}

impl SolanaDriver {
    /// 새 송신 키 쌍으로 드라이버를 생성합니다. 네트워크에는 아직 연결하지 않습니다.
    pub fn new(config: DriverConfig) -> Result<Self, ChainDriverError> {
        Self::with_signer(config, SigningKey::generate(&mut OsRng))
    }

    /// 주어진 송신 키로 드라이버를 생성합니다.
    pub fn with_signer(config: DriverConfig, signer: SigningKey) -> Result<Self, ChainDriverError> {
        config.validate()?;
        let rpc = JsonRpcClient::new(&config.rpc_url, config.request_timeout).map_err(|source| {
            ChainDriverError::Rpc {
                chain: Chain::Solana,
                source,
            }
        })?;
        let sender = bs58::encode(signer.verifying_key().to_bytes()).into_string();
        Ok(Self {
            rpc,
            config,
            signer,
            sender,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainDriverError> {
        self.rpc
            .call(method, params)
            .await
            .map_err(|source| ChainDriverError::Rpc {
                chain: Chain::Solana,
                source,
            })
    }

    async fn probe(&self) -> Result<(), ChainDriverError> {
        let health: String = self.call("getHealth", json!([])).await?;
        if health == "ok" {
            Ok(())
        } else {
            Err(ChainDriverError::rejected(
                Chain::Solana,
                format!("getHealth returned '{health}'"),
            ))
        }
    }

    async fn balance(&self) -> Result<u64, ChainDriverError> {
        let balance: WithContext<u64> = self
            .call(
                "getBalance",
                json!([self.sender, { "commitment": "confirmed" }]),
            )
            .await?;
        Ok(balance.value)
    }

    /// 잔액이 `minimum`보다 적으면 에어드롭을 받습니다.
    async fn ensure_funded(&self, minimum: u64) -> Result<(), ChainDriverError> {
        let balance = self.balance().await?;
        if balance >= minimum {
            debug!(sender = %self.sender, balance, minimum, "sender already funded");
            return Ok(());
        }

        let lamports = self.config.airdrop_lamports.max(minimum);
        let signature: String = self
            .call("requestAirdrop", json!([self.sender, lamports]))
            .await?;
        wait_confirmed(
            Chain::Solana,
            &signature,
            self.config.confirmation_timeout,
            self.config.confirmation_interval,
            || self.signature_status(&signature),
        )
        .await?;
        info!(sender = %self.sender, balance, lamports, "sender funded by airdrop");
        Ok(())
    }

    async fn signature_status(&self, signature: &str) -> Result<Confirmation, ChainDriverError> {
        let statuses: WithContext<Vec<Option<SignatureStatus>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature], { "searchTransactionHistory": true }]),
            )
            .await?;
        Ok(match statuses.value.into_iter().next().flatten() {
            None => Confirmation::Pending,
            Some(SignatureStatus { err: Some(err), .. }) if !err.is_null() => {
                Confirmation::Failed(err.to_string())
            }
            Some(SignatureStatus {
                confirmation_status: Some(status),
                ..
            }) if status == "confirmed" || status == "finalized" => Confirmation::Confirmed,
            Some(_) => Confirmation::Pending,
        })
    }

    async fn latest_blockhash(&self) -> Result<[u8; 32], ChainDriverError> {
        let latest: WithContext<LatestBlockhash> = self
            .call("getLatestBlockhash", json!([{ "commitment": "confirmed" }]))
            .await?;
        decode_pubkey(&latest.value.blockhash)
    }
}

impl ChainDriver for SolanaDriver {
    fn chain(&self) -> Chain {
        Chain::Solana
    }

    fn endpoint(&self) -> &str {
        self.rpc.url()
    }

    fn transfer_amount(&self) -> u64 {
        self.config.transfer_amount
    }

    async fn connect(&self, timeout: Duration) -> Result<(), ChainDriverError> {
        wait_reachable(
            Chain::Solana,
            self.rpc.url(),
            timeout,
            self.config.connect_interval,
            || self.probe(),
        )
        .await?;
        self.ensure_funded(self.config.airdrop_lamports / 2).await
    }

    async fn sender(&self) -> Result<String, ChainDriverError> {
        Ok(self.sender.clone())
    }

    async fn new_recipients(&self, count: usize) -> Result<Vec<String>, ChainDriverError> {
        if self.config.recipients == RecipientMode::DevAccounts {
            debug!("solana has no dev accounts, generating fresh recipients");
        }
        Ok((0..count)
            .map(|_| {
                let key = SigningKey::generate(&mut OsRng);
                bs58::encode(key.verifying_key().to_bytes()).into_string()
            })
            .collect())
    }

    async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransactionRecord, ChainDriverError> {
        let result = async {
            if from != self.sender {
                return Err(ChainDriverError::rejected(
                    Chain::Solana,
                    format!("no signing key for '{from}'"),
                ));
            }
            if from == to {
                return Err(ChainDriverError::rejected(
                    Chain::Solana,
                    "sender and recipient must differ",
                ));
            }
            let to_key = decode_pubkey(to)?;
            self.ensure_funded(amount.saturating_add(SIGNATURE_FEE_LAMPORTS))
                .await?;
            let blockhash = self.latest_blockhash().await?;

            let message = transfer_message(
                &self.signer.verifying_key().to_bytes(),
                &to_key,
                amount,
                &blockhash,
            );
            let (tx, signature) = sign_transaction(&self.signer, &message);
            let encoded = BASE64_STANDARD.encode(tx);

            let submitted: String = self
                .call(
                    "sendTransaction",
                    json!([encoded, { "encoding": "base64" }]),
                )
                .await?;
            if submitted != signature {
                debug!(local = %signature, remote = %submitted, "node returned a different signature");
            }
            debug!(tx_hash = %submitted, to, "transaction submitted");

            wait_confirmed(
                Chain::Solana,
                &submitted,
                self.config.confirmation_timeout,
                self.config.confirmation_interval,
                || self.signature_status(&submitted),
            )
            .await?;

            Ok(TransactionRecord {
                chain: Chain::Solana,
                tx_id: submitted,
                from: from.to_owned(),
                to: to.to_owned(),
                value: amount.to_string(),
                token: None,
            })
        }
        .await;

        record_transfer(Chain::Solana, result.is_ok());
        result
    }
}

/// base58 32바이트 키(또는 blockhash)를 해석합니다.
fn decode_pubkey(raw: &str) -> Result<[u8; 32], ChainDriverError> {
    let bytes = bs58::decode(raw)
        .into_vec()
        .map_err(|e| ChainDriverError::rejected(Chain::Solana, format!("invalid base58 '{raw}': {e}")))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ChainDriverError::rejected(
            Chain::Solana,
            format!("'{raw}' decodes to {} bytes, expected 32", bytes.len()),
        )
    })
}
