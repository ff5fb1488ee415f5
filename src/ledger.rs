//! Ledger read surface consumed by the dispatcher.

pub mod rpc;

pub use rpc::RpcLedger;

use crate::error::DispatchError;
use crate::types::{Address, Bytes, Gas, Sequence};
use async_trait::async_trait;

/// Queue configuration and cursor as read from the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub tx_nonce: Sequence,
    pub cooldown: u64,
    pub expiration: u64,
}

/// Read access to a deployed queue instance
#[async_trait]
pub trait QueueLedger: Send + Sync {
    /// Current `txNonce`, cooldown and expiration of `instance`.
    ///
    /// Returns `DispatchError::ContractNotFound` when nothing is deployed there.
    async fn snapshot(&self, instance: Address) -> Result<QueueSnapshot, DispatchError>;

    /// Resource cost of applying `data` to `instance`
    async fn estimate_cost(&self, instance: Address, data: &Bytes) -> Result<Gas, DispatchError>;
}
