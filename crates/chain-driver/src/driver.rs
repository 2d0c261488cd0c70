//! 체인 드라이버 트레이트와 백엔드 공용 폴링 헬퍼
//!
//! [`ChainDriver`]는 체인 종류와 무관한 계약입니다. 백엔드마다 식별자 형식
//! (`0x` 해시 / base58 서명)과 확정 방식 (영수증 폴링 / 서명 상태 폴링)이 다릅니다.

use std::future::Future;
use std::time::Duration;

use ingest_chaos_core::metrics as m;
use ingest_chaos_core::types::{Chain, TransactionRecord};
use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{BatchTransferError, ChainDriverError};

/// 테스트 체인 드라이버
///
/// # 체인 재시작
///
/// 테스트 체인이 재시작되면 이전 기록과 잔액이 사라집니다. 재시작 뒤에는
/// [`connect`](ChainDriver::connect)를 다시 호출해 송신 계정을 다시 준비해야 합니다.
pub trait ChainDriver: Send + Sync + 'static {
    /// 드라이버가 다루는 체인
    fn chain(&self) -> Chain;

    /// RPC 엔드포인트
    fn endpoint(&self) -> &str;

    /// 설정된 전송 한 건의 양
    fn transfer_amount(&self) -> u64;

    /// 연결을 고정 간격으로 재시도하고 송신 계정을 준비합니다.
    ///
    /// `timeout` 안에 한 번도 연결되지 않으면 `ChainDriverError::Unreachable`을 반환합니다.
    fn connect(&self, timeout: Duration)
    -> impl Future<Output = Result<(), ChainDriverError>> + Send;

    /// 기본 송신자 주소
    fn sender(&self) -> impl Future<Output = Result<String, ChainDriverError>> + Send;

    /// 서로 다른 수신자 주소 `count`개
    fn new_recipients(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>, ChainDriverError>> + Send;

    /// 전송을 제출하고 확정될 때까지 기다립니다.
    fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> impl Future<Output = Result<TransactionRecord, ChainDriverError>> + Send;

    /// 서로 다른 수신자 `count`명에게 순서대로 전송합니다.
    ///
    /// 중간에 실패하면 이미 확정된 기록을 [`BatchTransferError::completed`]에 담아 반환합니다.
    fn batch_transfer(
        &self,
        count: usize,
    ) -> impl Future<Output = Result<Vec<TransactionRecord>, BatchTransferError>> + Send {
        async move {
            let fail = |source| BatchTransferError {
                requested: count,
                completed: Vec::new(),
                source,
            };
            let from = self.sender().await.map_err(fail)?;
            let recipients = self.new_recipients(count).await.map_err(fail)?;
            let amount = self.transfer_amount();

            let mut completed = Vec::with_capacity(count);
            for (idx, to) in recipients.iter().enumerate() {
                match self.transfer(&from, to, amount).await {
                    Ok(record) => {
                        info!(
                            chain = %self.chain(),
                            tx_hash = %record.tx_id,
                            to = %to,
                            "transfer {}/{} confirmed",
                            idx + 1,
                            count
                        );
                        completed.push(record);
                    }
                    Err(source) => {
                        warn!(
                            chain = %self.chain(),
                            completed = completed.len(),
                            error = %source,
                            "batch transfer interrupted"
                        );
                        return Err(BatchTransferError {
                            requested: count,
                            completed,
                            source,
                        });
                    }
                }
            }
            Ok(completed)
        }
    }
}

/// 확정 확인 한 번의 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Confirmation {
    Pending,
    Confirmed,
    Failed(String),
}

/// 연결 확인을 `interval`마다 반복합니다. 첫 성공에서 반환합니다.
pub(crate) async fn wait_reachable<F, Fut>(
    chain: Chain,
    endpoint: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<(), ChainDriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ChainDriverError>>,
{
    let started = Instant::now();
    let deadline = started + timeout;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let last_error = match probe().await {
            Ok(()) => {
                info!(chain = %chain, endpoint, attempt, "chain rpc reachable");
                return Ok(());
            }
            Err(e) => e.to_string(),
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ChainDriverError::Unreachable {
                chain,
                endpoint: endpoint.to_owned(),
                after: started.elapsed(),
                reason: last_error,
            });
        }
        warn!(chain = %chain, endpoint, attempt, error = %last_error, "chain rpc not ready, retrying");
        tokio::time::sleep(interval.min(remaining)).await;
    }
}

/// 트랜잭션이 확정될 때까지 `interval`마다 확인합니다.
///
/// 확인 도중의 RPC 실패는 일시적인 것으로 보고 기한까지 재시도합니다.
pub(crate) async fn wait_confirmed<F, Fut>(
    chain: Chain,
    tx_id: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<(), ChainDriverError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Confirmation, ChainDriverError>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        match check().await {
            Ok(Confirmation::Confirmed) => return Ok(()),
            Ok(Confirmation::Failed(reason)) => {
                return Err(ChainDriverError::rejected(
                    chain,
                    format!("{tx_id} failed on chain: {reason}"),
                ));
            }
            Ok(Confirmation::Pending) => debug!(chain = %chain, tx_hash = tx_id, "not confirmed yet"),
            Err(e) => warn!(chain = %chain, tx_hash = tx_id, error = %e, "confirmation check failed"),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(ChainDriverError::ConfirmationTimeout {
                chain,
                tx_id: tx_id.to_owned(),
                after: timeout,
            });
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }
}

/// 전송 결과를 메트릭에 기록합니다.
pub(crate) fn record_transfer(chain: Chain, success: bool) {
    counter!(
        m::TRANSFERS_TOTAL,
        m::LABEL_CHAIN => chain.as_str(),
        m::LABEL_RESULT => if success { "success" } else { "failure" },
    )
    .increment(1);
}

/// 테스트용 Mock 드라이버
#[cfg(test)]
#[derive(Default)]
pub struct MockDriver {
    /// 이 인덱스(0부터)의 전송에서 실패
    pub fail_at: Option<usize>,
    pub transfers: tokio::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(test)]
impl ChainDriver for MockDriver {
    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    fn endpoint(&self) -> &str {
        "mock://chain"
    }

    fn transfer_amount(&self) -> u64 {
        7
    }

    async fn connect(&self, _timeout: Duration) -> Result<(), ChainDriverError> {
        Ok(())
    }

    async fn sender(&self) -> Result<String, ChainDriverError> {
        Ok("0xsender".to_owned())
    }

    async fn new_recipients(&self, count: usize) -> Result<Vec<String>, ChainDriverError> {
        Ok((0..count).map(|i| format!("0xrecipient{i}")).collect())
    }

    async fn transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
    ) -> Result<TransactionRecord, ChainDriverError> {
        let mut transfers = self.transfers.lock().await;
        if self.fail_at == Some(transfers.len()) {
            return Err(ChainDriverError::rejected(Chain::Ethereum, "mock failure"));
        }
        transfers.push((from.to_owned(), to.to_owned()));
        Ok(TransactionRecord {
            chain: Chain::Ethereum,
            tx_id: format!("0x{:064x}", transfers.len()),
            from: from.to_owned(),
            to: to.to_owned(),
            value: amount.to_string(),
            token: None,
        })
    }
}
