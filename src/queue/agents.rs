//! Agent allow-list: identities permitted to enqueue.

use crate::error::QueueError;
use crate::types::Address;
use std::collections::HashSet;

/// Ordered set of authorized agents
///
/// Iteration order is insertion order. Revocation preserves the relative
/// order of the remaining agents.
#[derive(Debug, Clone, Default)]
pub struct AgentSet {
    order: Vec<Address>,
    members: HashSet<Address>,
}

impl AgentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, identity: &Address) -> bool {
        self.members.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Add an agent; fails if already present
    pub fn insert(&mut self, identity: Address) -> Result<(), QueueError> {
        if !self.members.insert(identity) {
            return Err(QueueError::AlreadyAuthorized(identity));
        }
        self.order.push(identity);
        Ok(())
    }

    /// Remove an agent; fails if absent
    pub fn remove(&mut self, identity: &Address) -> Result<(), QueueError> {
        if !self.members.remove(identity) {
            return Err(QueueError::NotAuthorized(*identity));
        }
        self.order.retain(|a| a != identity);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.order.iter()
    }

    /// One page of agents starting after `start` (or from the beginning).
    ///
    /// Returns the page and the cursor for the next page, `None` once exhausted.
    /// An unknown `start` yields an empty page. A zero `page_size` is rejected.
    pub fn page(
        &self,
        start: Option<Address>,
        page_size: usize,
    ) -> Result<(Vec<Address>, Option<Address>), QueueError> {
        if page_size == 0 {
            return Err(QueueError::InvalidPageSize(page_size));
        }
        let offset = match start {
            None => 0,
            Some(cursor) => match self.order.iter().position(|a| *a == cursor) {
                Some(idx) => idx + 1,
                None => return Ok((Vec::new(), None)),
            },
        };

        let page: Vec<Address> = self
            .order
            .iter()
            .skip(offset)
            .take(page_size)
            .copied()
            .collect();

        let next = if offset + page.len() < self.order.len() {
            page.last().copied()
        } else {
            None
        };
        Ok((page, next))
    }
}
