//! Relay service: submits a payload to a queue instance on the dispatcher's behalf.

pub mod http;

pub use http::SponsoredRelay;

use crate::error::DispatchError;
use crate::types::{Address, Bytes, Gas};
use async_trait::async_trait;

/// One relay submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub target: Address,
    pub data: Bytes,
    /// Budget hint forwarded to the relay (the estimated cost)
    pub gas_limit: Gas,
}

/// Acknowledgement of an accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    pub task_id: String,
}

#[async_trait]
pub trait RelayService: Send + Sync {
    /// Submit `request`. Any error aborts the dispatcher run.
    async fn submit(&self, request: RelayRequest) -> Result<RelayReceipt, DispatchError>;
}
