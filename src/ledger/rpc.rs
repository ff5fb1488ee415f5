//! JSON-RPC ledger reader.

use crate::abi::{txCooldownCall, txExpirationCall, txNonceCall};
use crate::error::DispatchError;
use crate::http::{build_http_client, describe_http_error, describe_status};
use crate::ledger::{QueueLedger, QueueSnapshot};
use crate::types::{Address, Bytes, Gas, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Single-word view getters read for a snapshot
#[derive(Debug, Clone, Copy)]
enum Getter {
    TxNonce,
    TxCooldown,
    TxExpiration,
}

impl Getter {
    fn name(self) -> &'static str {
        match self {
            Getter::TxNonce => "txNonce",
            Getter::TxCooldown => "txCooldown",
            Getter::TxExpiration => "txExpiration",
        }
    }

    fn calldata(self) -> Vec<u8> {
        match self {
            Getter::TxNonce => txNonceCall {}.abi_encode(),
            Getter::TxCooldown => txCooldownCall {}.abi_encode(),
            Getter::TxExpiration => txExpirationCall {}.abi_encode(),
        }
    }

    fn decode(self, raw: &[u8]) -> alloy_sol_types::Result<U256> {
        match self {
            Getter::TxNonce => txNonceCall::abi_decode_returns(raw, true).map(|r| r._0),
            Getter::TxCooldown => txCooldownCall::abi_decode_returns(raw, true).map(|r| r._0),
            Getter::TxExpiration => txExpirationCall::abi_decode_returns(raw, true).map(|r| r._0),
        }
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
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// Reads queue state and estimates costs through an Ethereum JSON-RPC endpoint
pub struct RpcLedger {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(url: String, request_timeout: Duration) -> Result<Self, DispatchError> {
        let client = build_http_client(request_timeout).map_err(DispatchError::Ledger)?;
        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, DispatchError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Ledger(describe_http_error(&e)))?;

        if !response.status().is_success() {
            return Err(DispatchError::Ledger(format!(
                "{} failed with {}",
                method,
                describe_status(response).await
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Ledger(format!("Failed to parse {} response: {}", method, e)))?;

        if let Some(err) = parsed.error {
            return Err(DispatchError::Ledger(format!(
                "{} returned error {}: {}",
                method, err.code, err.message
            )));
        }
        parsed
            .result
            .ok_or_else(|| DispatchError::Ledger(format!("{} returned no result", method)))
    }

    async fn eth_call(&self, instance: Address, data: Vec<u8>) -> Result<Vec<u8>, DispatchError> {
        let params = json!([
            { "to": instance, "data": format!("0x{}", hex::encode(data)) },
            "latest"
        ]);
        let result = self.request("eth_call", params).await?;
        decode_hex_bytes(&result).map_err(DispatchError::Ledger)
    }

    async fn read_u64(&self, instance: Address, getter: Getter) -> Result<u64, DispatchError> {
        let raw = self.eth_call(instance, getter.calldata()).await?;
        let value = getter
            .decode(&raw)
            .map_err(|e| DispatchError::Ledger(format!("Failed to decode {}(): {}", getter.name(), e)))?;
        u256_to_u64(value, getter.name())
    }

    async fn is_deployed(&self, instance: Address) -> Result<bool, DispatchError> {
        let result = self
            .request("eth_getCode", json!([instance, "latest"]))
            .await?;
        let code = decode_hex_bytes(&result).map_err(DispatchError::Ledger)?;
        Ok(!code.is_empty())
    }
}

#[async_trait]
impl QueueLedger for RpcLedger {
    async fn snapshot(&self, instance: Address) -> Result<QueueSnapshot, DispatchError> {
        if !self.is_deployed(instance).await? {
            return Err(DispatchError::ContractNotFound(instance));
        }

        let (tx_nonce, cooldown, expiration) = futures::try_join!(
            self.read_u64(instance, Getter::TxNonce),
            self.read_u64(instance, Getter::TxCooldown),
            self.read_u64(instance, Getter::TxExpiration),
        )?;

        debug!(%instance, tx_nonce, cooldown, expiration, "Read queue snapshot");
        Ok(QueueSnapshot {
            tx_nonce,
            cooldown,
            expiration,
        })
    }

    async fn estimate_cost(&self, instance: Address, data: &Bytes) -> Result<Gas, DispatchError> {
        let tx = json!({
            "to": instance,
            "data": format!("0x{}", hex::encode(data)),
        });
        let result = self
            .request("eth_estimateGas", json!([tx]))
            .await
            .map_err(|e| DispatchError::Estimation(e.to_string()))?;
        parse_quantity(&result).map_err(DispatchError::Estimation)
    }
}

fn decode_hex_bytes(value: &Value) -> Result<Vec<u8>, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected hex string, got {}", value))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|e| format!("invalid hex {:?}: {}", s, e))
}

fn parse_quantity(value: &Value) -> Result<u64, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected hex quantity, got {}", value))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| format!("invalid quantity {:?}: {}", s, e))
}

fn u256_to_u64(value: U256, name: &str) -> Result<u64, DispatchError> {
    u64::try_from(value)
        .map_err(|_| DispatchError::Ledger(format!("{}() value {} does not fit in u64", name, value)))
}
