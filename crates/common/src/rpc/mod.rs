//! Minimal JSON-RPC 2.0 client shared by the wallet provider and the ledger.
//!
//! Provider errors follow EIP-1193: code `4001` is an explicit user rejection,
//! `4100` means the requested account or method is not authorized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::{header::HeaderMap, header::HeaderValue, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

pub const USER_REJECTED_CODE: i64 = 4001;
pub const UNAUTHORIZED_CODE: i64 = 4100;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}

impl RpcError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RpcError::Rpc { code, .. } if *code == UNAUTHORIZED_CODE)
    }

    /// The endpoint could not be reached or answered with a non-success status
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Reqwest(_) | RpcError::HttpStatus(..))
    }
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Clone)]
pub struct RpcClient {
    remote: Url,
    client: Client,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(remote: &Url) -> Result<Self, RpcError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method, id, "rpc call");

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let response = self
            .client
            .post(self.remote.clone())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RpcError::HttpStatus(
                response.status(),
                response.text().await?,
            ));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        // a missing result decodes as null, which is what `Option<T>` callers expect
        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result).map_err(|e| RpcError::Malformed(e.to_string()))
    }
}

/// Parse a hex quantity (`0x1a`) as returned by Ethereum JSON-RPC
pub fn parse_quantity(value: &str) -> Result<u128, RpcError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Malformed(format!("quantity without 0x prefix: {}", value)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("invalid quantity {}: {}", value, e)))
}

pub fn to_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x").unwrap(), 0);
        assert_eq!(parse_quantity("0x66eee").unwrap(), 421614);
        assert_eq!(
            parse_quantity("0xde0b6b3a7640000").unwrap(),
            1_000_000_000_000_000_000
        );
    }

    #[test]
    fn test_parse_quantity_rejects_garbage() {
        assert!(parse_quantity("1234").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_to_quantity() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(421614), "0x66eee");
    }

    #[test]
    fn test_user_rejection_is_classified_by_code() {
        let rejected = RpcError::Rpc {
            code: USER_REJECTED_CODE,
            message: "User denied transaction signature".into(),
        };
        assert!(rejected.is_user_rejection());
        assert!(!rejected.is_transport());

        let other = RpcError::Rpc {
            code: -32000,
            message: "rejected by the node".into(),
        };
        assert!(!other.is_user_rejection());
    }
}
