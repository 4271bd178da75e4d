//! Minimal JSON-RPC client over HTTP.
//!
//! Every remote interaction in this crate (node, bundler, paymaster) is a
//! JSON-RPC method call; this wrapper only handles envelope plumbing and error
//! mapping. Provider selection per chain is the caller's concern.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::RpcError;

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Clone, Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Perform one JSON-RPC call, returning the raw `result` value.
    ///
    /// A `null` result is returned as `Value::Null`; some methods (receipt
    /// lookups) use it as an explicit not-found signal.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = JsonRpcRequest { jsonrpc: "2.0", id: 1, method, params };
        let response: JsonRpcResponse = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;
        if let Some(err) = response.error {
            return Err(RpcError::Rpc { code: err.code, message: err.message, data: err.data });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Call and deserialize a non-null result.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode(e.to_string()))
    }

    /// `eth_call` against `to` with pre-encoded calldata, latest block.
    pub async fn eth_call(&self, to: alloy_primitives::Address, data: &[u8]) -> Result<Vec<u8>, RpcError> {
        let result: String = self
            .request_as(
                "eth_call",
                json!([{ "to": to, "data": format!("0x{}", hex::encode(data)) }, "latest"]),
            )
            .await?;
        decode_hex(&result)
    }

    /// `eth_sendTransaction` from a node-managed signer. Returns the tx hash.
    pub async fn eth_send_transaction(
        &self,
        from: alloy_primitives::Address,
        to: alloy_primitives::Address,
        data: &[u8],
    ) -> Result<alloy_primitives::B256, RpcError> {
        self.request_as(
            "eth_sendTransaction",
            json!([{ "from": from, "to": to, "data": format!("0x{}", hex::encode(data)) }]),
        )
        .await
    }

    /// `eth_getCode` at the latest block.
    pub async fn eth_get_code(&self, address: alloy_primitives::Address) -> Result<Vec<u8>, RpcError> {
        let result: String = self.request_as("eth_getCode", json!([address, "latest"])).await?;
        decode_hex(&result)
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, RpcError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| RpcError::Decode(format!("invalid hex in result: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_hex_accepts_prefixed_and_bare() {
        assert_eq!(decode_hex("0x0102").unwrap(), vec![1, 2]);
        assert_eq!(decode_hex("ff").unwrap(), vec![0xff]);
        assert!(decode_hex("0xzz").is_err());
    }

    #[test]
    fn revert_data_shapes() {
        let err = RpcError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!("0xdeadbeef")),
        };
        assert_eq!(err.revert_data().unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);

        let nested = RpcError::Rpc {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!({ "data": "0x01" })),
        };
        assert_eq!(nested.revert_data().unwrap(), vec![0x01]);

        let none = RpcError::Rpc { code: -32000, message: "boom".into(), data: None };
        assert!(none.revert_data().is_none());
    }
}
