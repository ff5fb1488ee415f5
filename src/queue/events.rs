//! Events emitted by the queue state machine.

use crate::queue::call::Operation;
use crate::types::{Address, Bytes, Sequence, Timestamp, B256, U256};
use serde::{Deserialize, Serialize};

/// A new entry was appended to the queue. Sole integration point for indexers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAdded {
    pub sequence: Sequence,
    pub content_hash: B256,
    pub target: Address,
    pub value: U256,
    pub payload: Bytes,
    pub operation: Operation,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueEvent {
    Setup {
        owner: Address,
        executor: Address,
    },
    EntryAdded(EntryAdded),
    CooldownSet(u64),
    ExpirationSet(u64),
    TxNonceSet(Sequence),
    AgentAuthorized(Address),
    AgentRevoked(Address),
}
