//! Sponsored-call HTTP relay client.

use crate::error::DispatchError;
use crate::http::{build_http_client, describe_http_error, describe_status};
use crate::relay::{RelayReceipt, RelayRequest, RelayService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SPONSORED_CALL_PATH: &str = "/relays/v2/sponsored-call";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsoredCallBody {
    chain_id: String,
    target: String,
    data: String,
    sponsor_api_key: String,
    gas_limit: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SponsoredCallResponse {
    task_id: String,
}

/// Relay that submits calls as sponsored meta-transactions
pub struct SponsoredRelay {
    client: Client,
    base_url: String,
    chain_id: u64,
    api_key: String,
}

impl SponsoredRelay {
    pub fn new(
        base_url: String,
        chain_id: u64,
        api_key: String,
        request_timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = build_http_client(request_timeout).map_err(DispatchError::Relay)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            api_key,
        })
    }

    fn body(&self, request: &RelayRequest) -> SponsoredCallBody {
        SponsoredCallBody {
            chain_id: self.chain_id.to_string(),
            target: format!("{:#x}", request.target),
            data: format!("0x{}", hex::encode(&request.data)),
            sponsor_api_key: self.api_key.clone(),
            gas_limit: request.gas_limit.to_string(),
        }
    }
}

#[async_trait]
impl RelayService for SponsoredRelay {
    async fn submit(&self, request: RelayRequest) -> Result<RelayReceipt, DispatchError> {
        let url = format!("{}{}", self.base_url, SPONSORED_CALL_PATH);
        let response = self
            .client
            .post(&url)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| DispatchError::Relay(describe_http_error(&e)))?;

        if !response.status().is_success() {
            return Err(DispatchError::Relay(describe_status(response).await));
        }

        let parsed: SponsoredCallResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::Relay(format!("Failed to parse response: {}", e)))?;

        debug!(task_id = %parsed.task_id, target = %request.target, "Relay accepted call");
        Ok(RelayReceipt {
            task_id: parsed.task_id,
        })
    }
}
