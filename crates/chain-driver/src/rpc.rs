//! JSON-RPC 2.0 HTTP 클라이언트
//!
//! Solana 백엔드가 씁니다. 요청 ID는 클라이언트마다 단조 증가합니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RpcCallError;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC 클라이언트
pub struct JsonRpcClient {
    url: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// 새 클라이언트를 생성합니다. `timeout`은 요청 하나에 적용됩니다.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RpcCallError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcCallError::Transport {
                method: "client".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            url: url.into(),
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 메서드를 호출하고 `result`를 원본 JSON으로 반환합니다. `null` 결과도 그대로 반환합니다.
    pub async fn call_raw(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcCallError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, id = request.id, "rpc request");

        let response: RpcResponse = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RpcCallError::Transport {
                method: method.to_owned(),
                reason: e.to_string(),
            })?
            .json()
            .await
            .map_err(|e| RpcCallError::Decode {
                method: method.to_owned(),
                reason: e.to_string(),
            })?;

        if let Some(error) = response.error {
            return Err(RpcCallError::Remote {
                method: method.to_owned(),
                code: error.code,
                message: error.message,
            });
        }
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// 메서드를 호출하고 `result`를 `T`로 디코딩합니다.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, RpcCallError> {
        let value = self.call_raw(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcCallError::Decode {
            method: method.to_owned(),
            reason: e.to_string(),
        })
    }
}
