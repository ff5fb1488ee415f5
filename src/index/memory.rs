//! In-process queue index fed from queue events.

use crate::error::DispatchError;
use crate::index::{IndexedEntry, QueueIndex};
use crate::queue::QueueEvent;
use crate::types::{Address, Sequence};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Queue index held in memory.
///
/// Only `EntryAdded` events are indexed, mirroring what a subgraph keeps.
#[derive(Default)]
pub struct MemoryQueueIndex {
    entries: RwLock<HashMap<Address, BTreeMap<Sequence, IndexedEntry>>>,
    /// Queries left to fail before answering again
    failures: AtomicUsize,
}

impl MemoryQueueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one event emitted by `instance`. Returns true if it was an entry.
    pub fn ingest(&self, instance: Address, event: &QueueEvent) -> bool {
        let QueueEvent::EntryAdded(added) = event else {
            return false;
        };
        self.entries
            .write()
            .entry(instance)
            .or_default()
            .insert(added.sequence, IndexedEntry::from(added));
        true
    }

    /// Index a batch of events, returning how many entries were added
    pub fn ingest_all<'a>(
        &self,
        instance: Address,
        events: impl IntoIterator<Item = &'a QueueEvent>,
    ) -> usize {
        events
            .into_iter()
            .filter(|event| self.ingest(instance, event))
            .count()
    }

    /// Make the next `count` queries fail as unreachable
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    pub fn len(&self, instance: &Address) -> usize {
        self.entries.read().get(instance).map_or(0, BTreeMap::len)
    }

    fn take_failure(&self) -> bool {
        self.failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl QueueIndex for MemoryQueueIndex {
    async fn entries_from(
        &self,
        instance: Address,
        from_sequence: Sequence,
    ) -> Result<Vec<IndexedEntry>, DispatchError> {
        if self.take_failure() {
            return Err(DispatchError::Index("index unavailable".to_string()));
        }
        let entries = self.entries.read();
        Ok(entries
            .get(&instance)
            .map(|by_seq| by_seq.range(from_sequence..).map(|(_, e)| e.clone()).collect())
            .unwrap_or_default())
    }
}
