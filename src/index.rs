//! Queue index: a queryable, possibly stale view of `EntryAdded` events.

pub mod graph;
pub mod memory;

pub use graph::GraphQueueIndex;
pub use memory::MemoryQueueIndex;

use crate::error::DispatchError;
use crate::queue::{Call, EntryAdded, Operation};
use crate::types::{Address, Bytes, Sequence, Timestamp, B256, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One indexed queue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedEntry {
    pub sequence: Sequence,
    pub target: Address,
    pub value: U256,
    pub payload: Bytes,
    pub operation: Operation,
    pub content_hash: B256,
    pub created_at: Timestamp,
}

impl IndexedEntry {
    /// The call this entry was enqueued with
    pub fn call(&self) -> Call {
        Call::new(self.target, self.value, self.payload.clone(), self.operation)
    }
}

impl From<&EntryAdded> for IndexedEntry {
    fn from(event: &EntryAdded) -> Self {
        Self {
            sequence: event.sequence,
            target: event.target,
            value: event.value,
            payload: event.payload.clone(),
            operation: event.operation,
            content_hash: event.content_hash,
            created_at: event.timestamp,
        }
    }
}

/// Read access to indexed queue entries
#[async_trait]
pub trait QueueIndex: Send + Sync {
    /// Entries of `instance` with sequence `>= from_sequence`, ascending by sequence.
    ///
    /// An instance the index has never seen yields an empty list.
    async fn entries_from(
        &self,
        instance: Address,
        from_sequence: Sequence,
    ) -> Result<Vec<IndexedEntry>, DispatchError>;
}
