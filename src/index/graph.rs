//! GraphQL subgraph index client.

use crate::error::DispatchError;
use crate::http::{build_http_client, describe_http_error, describe_status};
use crate::index::{IndexedEntry, QueueIndex};
use crate::queue::Operation;
use crate::types::{Address, Bytes, Sequence, B256, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const QUERY: &str = r#"query DelayTransactions($id: String, $nonce: Int) {
  delayModifier(id: $id) {
    transactions(where: {nonce_gte: $nonce}, orderBy: nonce, orderDirection: asc) {
      nonce
      to
      data
      hash
      value
      operation
      createdAt
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct GraphResponse {
    data: Option<GraphData>,
    #[serde(default)]
    errors: Vec<GraphErrorBody>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphData {
    delay_modifier: Option<GraphModifier>,
}

#[derive(Debug, Deserialize)]
struct GraphModifier {
    #[serde(default)]
    transactions: Vec<GraphTransaction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphTransaction {
    #[serde(deserialize_with = "number_or_string")]
    nonce: u64,
    to: String,
    data: String,
    hash: String,
    value: String,
    operation: String,
    #[serde(deserialize_with = "number_or_string")]
    created_at: u64,
}

/// Subgraph fields arrive either as JSON numbers or as `BigInt` strings.
fn number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

impl GraphTransaction {
    fn into_entry(self) -> Result<IndexedEntry, String> {
        let operation = match self.operation.as_str() {
            "Call" => Operation::Call,
            "DelegateCall" => Operation::DelegateCall,
            other => return Err(format!("unknown operation {:?} at nonce {}", other, self.nonce)),
        };
        let target = Address::from_str(&self.to)
            .map_err(|e| format!("invalid target {:?} at nonce {}: {}", self.to, self.nonce, e))?;
        let value = U256::from_str(&self.value)
            .map_err(|e| format!("invalid value {:?} at nonce {}: {}", self.value, self.nonce, e))?;
        let payload = hex::decode(self.data.trim_start_matches("0x"))
            .map_err(|e| format!("invalid data at nonce {}: {}", self.nonce, e))?;
        let content_hash = B256::from_str(&self.hash)
            .map_err(|e| format!("invalid hash {:?} at nonce {}: {}", self.hash, self.nonce, e))?;

        Ok(IndexedEntry {
            sequence: self.nonce,
            target,
            value,
            payload: Bytes::from(payload),
            operation,
            content_hash,
            created_at: self.created_at,
        })
    }
}

/// Queue index backed by a GraphQL subgraph endpoint
pub struct GraphQueueIndex {
    client: Client,
    url: String,
}

impl GraphQueueIndex {
    pub fn new(url: String, request_timeout: Duration) -> Result<Self, DispatchError> {
        let client = build_http_client(request_timeout).map_err(DispatchError::Index)?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl QueueIndex for GraphQueueIndex {
    async fn entries_from(
        &self,
        instance: Address,
        from_sequence: Sequence,
    ) -> Result<Vec<IndexedEntry>, DispatchError> {
        let body = json!({
            "query": QUERY,
            "variables": {
                "id": format!("{:#x}", instance),
                "nonce": from_sequence,
            },
            "operationName": "DelayTransactions",
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DispatchError::Index(describe_http_error(&e)))?;

        if !response.status().is_success() {
            return Err(DispatchError::Index(describe_status(response).await));
        }

        let parsed: GraphResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Index(format!("Failed to parse response: {}", e)))?;

        parse_entries(parsed, instance)
    }
}

fn parse_entries(parsed: GraphResponse, instance: Address) -> Result<Vec<IndexedEntry>, DispatchError> {
    if let Some(first) = parsed.errors.first() {
        return Err(DispatchError::Index(first.message.clone()));
    }

    let Some(modifier) = parsed.data.and_then(|d| d.delay_modifier) else {
        debug!(%instance, "Index has no record of instance");
        return Ok(Vec::new());
    };

    let mut entries = modifier
        .transactions
        .into_iter()
        .map(GraphTransaction::into_entry)
        .collect::<Result<Vec<_>, _>>()
        .map_err(DispatchError::Index)?;
    entries.sort_by_key(|e| e.sequence);
    Ok(entries)
}
