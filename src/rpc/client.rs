//! JSON-RPC backend over HTTP
//!
//! Speaks the node's JSON-RPC 1.0 dialect (`listunspent`, `importaddress`,
//! `sendrawtransaction`). Hosted gateways that require an API key receive it
//! in the `x-api-key` header.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{BackendError, ChainBackend, RpcUtxo};

/// Header carrying the gateway API key
pub const API_KEY_HEADER: &str = "x-api-key";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_CONFIRMATIONS: u32 = 9_999_999;

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// [`ChainBackend`] backed by a node or gateway JSON-RPC endpoint
pub struct JsonRpcBackend {
    url: String,
    api_key: Option<String>,
    http_client: HttpClient,
}

impl JsonRpcBackend {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, BackendError> {
        let http_client = HttpClient::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self {
            url: url.into(),
            api_key,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, BackendError> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: "zmultisig",
            method,
            params,
        };

        let mut builder = self.http_client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        log::debug!("RPC {} -> {}", method, self.url);
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        decode_http(status, &body)
    }
}

/// Map an HTTP reply to the RPC result.
///
/// Nodes report RPC errors with HTTP 500 and a JSON `error` object, which is
/// passed through as [`BackendError::Rpc`]. Any other non-2xx reply is a
/// transport failure, whatever its body says.
fn decode_http(status: StatusCode, body: &str) -> Result<Value, BackendError> {
    match serde_json::from_str::<RpcResponse>(body) {
        Ok(response) if response.error.is_some() => decode_response(response),
        _ if !status.is_success() => Err(BackendError::Transport(format!(
            "HTTP {}: {}",
            status,
            body.trim()
        ))),
        Ok(response) => decode_response(response),
        Err(e) => Err(BackendError::InvalidResponse(e.to_string())),
    }
}

fn decode_response(body: RpcResponse) -> Result<Value, BackendError> {
    if let Some(error) = body.error {
        return Err(BackendError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    Ok(body.result)
}

#[async_trait]
impl ChainBackend for JsonRpcBackend {
    async fn list_unspent(&self, address: &str) -> Result<Vec<RpcUtxo>, BackendError> {
        let result = self
            .call("listunspent", json!([1, MAX_CONFIRMATIONS, [address]]))
            .await?;
        serde_json::from_value(result).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    async fn import_watch_only(
        &self,
        script_or_address: &str,
        p2sh: bool,
    ) -> Result<(), BackendError> {
        // importaddress <script|address> <label> <rescan> [p2sh]
        let params = if p2sh {
            json!([script_or_address, "", false, true])
        } else {
            json!([script_or_address, "", false])
        };
        self.call("importaddress", params).await.map(|_| ())
    }

    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, BackendError> {
        let result = self.call("sendrawtransaction", json!([raw_hex])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BackendError::InvalidResponse(format!("expected txid, got {}", result)))
    }
}
