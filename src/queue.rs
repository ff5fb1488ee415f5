//! Delay Queue State Machine
//!
//! Authoritative, single-writer queue of pending operations. Entries become
//! executable once their cooldown has elapsed and stay executable until the
//! expiration window closes. Every mutation goes through the operations below;
//! the caller identity and the ledger time are explicit parameters.

pub mod agents;
pub mod call;
pub mod events;
pub mod executor;

pub use agents::AgentSet;
pub use call::{entry_hash, Call, Operation};
pub use events::{EntryAdded, QueueEvent};
pub use executor::{RecordingExecutor, TargetExecutor};

use crate::error::QueueError;
use crate::types::{Address, Sequence, Timestamp, B256, MIN_EXPIRATION_SECS, SENTINEL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Parameters for a new queue instance
#[derive(Debug, Clone)]
pub struct QueueSetup {
    pub owner: Address,
    /// Identity of the target executor the queue forwards calls to
    pub executor: Address,
    pub cooldown: u64,
    pub expiration: u64,
}

/// Nonces and window configuration of one queue instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueState {
    /// Next sequence number to assign
    pub queue_nonce: Sequence,
    /// Next sequence number eligible for execution
    pub tx_nonce: Sequence,
    pub cooldown: u64,
    /// Zero means entries never expire
    pub expiration: u64,
}

impl QueueState {
    /// Earliest time an entry created at `created_at` may execute
    pub fn ready_at(&self, created_at: Timestamp) -> Timestamp {
        created_at.saturating_add(self.cooldown)
    }

    /// Last time an entry created at `created_at` may execute, if it expires
    pub fn expires_at(&self, created_at: Timestamp) -> Option<Timestamp> {
        if self.expiration == 0 {
            None
        } else {
            Some(self.ready_at(created_at).saturating_add(self.expiration))
        }
    }

    pub fn is_expired(&self, created_at: Timestamp, now: Timestamp) -> bool {
        matches!(self.expires_at(created_at), Some(deadline) if now > deadline)
    }

    pub fn is_cooled(&self, created_at: Timestamp, now: Timestamp) -> bool {
        now >= self.ready_at(created_at)
    }

    /// Number of entries not yet executed or skipped
    pub fn pending(&self) -> u64 {
        self.queue_nonce - self.tx_nonce
    }
}

/// Logical state of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Executable,
    /// Consumed by the cursor (executed or skipped)
    Consumed,
    Expired,
}

/// Per-entry record kept by the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct EntryRecord {
    hash: B256,
    created_at: Timestamp,
}

/// Receipt returned by [`DelayQueue::enqueue_with_receipt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub sequence: Sequence,
    pub content_hash: B256,
    pub created_at: Timestamp,
}

fn validate_expiration(expiration: u64) -> Result<(), QueueError> {
    if expiration > 0 && expiration < MIN_EXPIRATION_SECS {
        return Err(QueueError::InvalidConfiguration(format!(
            "Expiration must be 0 or at least {} seconds (got {})",
            MIN_EXPIRATION_SECS, expiration
        )));
    }
    Ok(())
}

/// The queue state machine
#[derive(Debug, Clone)]
pub struct DelayQueue {
    owner: Address,
    executor: Address,
    state: QueueState,
    entries: Vec<EntryRecord>,
    agents: AgentSet,
    events: Vec<QueueEvent>,
}

impl DelayQueue {
    /// Create a queue instance
    pub fn new(setup: QueueSetup) -> Result<Self, QueueError> {
        if setup.owner == Address::ZERO {
            return Err(QueueError::InvalidConfiguration(
                "Owner can not be zero address".to_string(),
            ));
        }
        if setup.executor == Address::ZERO {
            return Err(QueueError::InvalidConfiguration(
                "Target can not be zero address".to_string(),
            ));
        }
        validate_expiration(setup.expiration)?;

        info!(
            owner = %setup.owner,
            executor = %setup.executor,
            cooldown = setup.cooldown,
            expiration = setup.expiration,
            "Delay queue set up"
        );

        Ok(Self {
            owner: setup.owner,
            executor: setup.executor,
            state: QueueState {
                queue_nonce: 0,
                tx_nonce: 0,
                cooldown: setup.cooldown,
                expiration: setup.expiration,
            },
            entries: Vec::new(),
            agents: AgentSet::new(),
            events: vec![QueueEvent::Setup {
                owner: setup.owner,
                executor: setup.executor,
            }],
        })
    }

    fn require_owner(&self, caller: Address) -> Result<(), QueueError> {
        if caller != self.owner {
            return Err(QueueError::Unauthorized(caller));
        }
        Ok(())
    }

    // ----- owner operations -----

    /// Set cooldown and expiration together
    pub fn configure(
        &mut self,
        caller: Address,
        cooldown: u64,
        expiration: u64,
    ) -> Result<(), QueueError> {
        self.require_owner(caller)?;
        validate_expiration(expiration)?;
        self.state.cooldown = cooldown;
        self.state.expiration = expiration;
        self.events.push(QueueEvent::CooldownSet(cooldown));
        self.events.push(QueueEvent::ExpirationSet(expiration));
        Ok(())
    }

    pub fn set_cooldown(&mut self, caller: Address, cooldown: u64) -> Result<(), QueueError> {
        self.require_owner(caller)?;
        self.state.cooldown = cooldown;
        self.events.push(QueueEvent::CooldownSet(cooldown));
        Ok(())
    }

    pub fn set_expiration(&mut self, caller: Address, expiration: u64) -> Result<(), QueueError> {
        self.require_owner(caller)?;
        validate_expiration(expiration)?;
        self.state.expiration = expiration;
        self.events.push(QueueEvent::ExpirationSet(expiration));
        Ok(())
    }

    /// Move the execution cursor forward, never past `queue_nonce`
    pub fn set_cursor(&mut self, caller: Address, new_tx_nonce: Sequence) -> Result<(), QueueError> {
        self.require_owner(caller)?;
        if new_tx_nonce < self.state.tx_nonce {
            return Err(QueueError::InvalidConfiguration(format!(
                "New nonce {} must not be lower than current txNonce {}",
                new_tx_nonce, self.state.tx_nonce
            )));
        }
        if new_tx_nonce > self.state.queue_nonce {
            return Err(QueueError::InvalidConfiguration(format!(
                "New nonce {} cannot be higher than queueNonce {}",
                new_tx_nonce, self.state.queue_nonce
            )));
        }
        self.state.tx_nonce = new_tx_nonce;
        self.events.push(QueueEvent::TxNonceSet(new_tx_nonce));
        Ok(())
    }

    pub fn authorize_agent(&mut self, caller: Address, identity: Address) -> Result<(), QueueError> {
        self.require_owner(caller)?;
        if identity == Address::ZERO || identity == SENTINEL || identity == self.owner {
            return Err(QueueError::InvalidIdentity(identity));
        }
        self.agents.insert(identity)?;
        self.events.push(QueueEvent::AgentAuthorized(identity));
        Ok(())
    }

    pub fn revoke_agent(&mut self, caller: Address, identity: Address) -> Result<(), QueueError> {
        self.require_owner(caller)?;
        if identity == Address::ZERO || identity == SENTINEL || identity == self.owner {
            return Err(QueueError::InvalidIdentity(identity));
        }
        self.agents.remove(&identity)?;
        self.events.push(QueueEvent::AgentRevoked(identity));
        Ok(())
    }

    // ----- agent operations -----

    /// Append an operation; returns its sequence number
    pub fn enqueue(&mut self, caller: Address, now: Timestamp, call: Call) -> Result<Sequence, QueueError> {
        self.enqueue_with_receipt(caller, now, call)
            .map(|receipt| receipt.sequence)
    }

    /// Append an operation; returns sequence number, content hash and creation time
    pub fn enqueue_with_receipt(
        &mut self,
        caller: Address,
        now: Timestamp,
        call: Call,
    ) -> Result<EnqueueReceipt, QueueError> {
        if !self.agents.contains(&caller) {
            return Err(QueueError::Unauthorized(caller));
        }

        let sequence = self.state.queue_nonce;
        let hash = entry_hash(&call, sequence);
        self.entries.push(EntryRecord {
            hash,
            created_at: now,
        });
        self.state.queue_nonce += 1;

        debug!(sequence, hash = %hash, agent = %caller, "Entry added");

        self.events.push(QueueEvent::EntryAdded(EntryAdded {
            sequence,
            content_hash: hash,
            target: call.target,
            value: call.value,
            payload: call.payload,
            operation: call.operation,
            timestamp: now,
        }));

        Ok(EnqueueReceipt {
            sequence,
            content_hash: hash,
            created_at: now,
        })
    }

    // ----- open operations -----

    /// Execute the head entry, verifying the supplied call against the stored hash
    pub fn execute_next<E: TargetExecutor + ?Sized>(
        &mut self,
        executor: &mut E,
        now: Timestamp,
        call: &Call,
    ) -> Result<(), QueueError> {
        let sequence = self.state.tx_nonce;
        if sequence == self.state.queue_nonce {
            return Err(QueueError::QueueEmpty);
        }

        let record = self.record(sequence).ok_or(QueueError::QueueEmpty)?;
        let actual = entry_hash(call, sequence);
        if actual != record.hash {
            return Err(QueueError::HashMismatch {
                sequence,
                expected: record.hash,
                actual,
            });
        }

        let ready_at = self.state.ready_at(record.created_at);
        if now < ready_at {
            return Err(QueueError::StillInCooldown { sequence, ready_at });
        }
        if let Some(expired_at) = self.state.expires_at(record.created_at) {
            if now > expired_at {
                return Err(QueueError::Expired {
                    sequence,
                    expired_at,
                });
            }
        }

        if !executor.exec(call) {
            return Err(QueueError::ExecutionFailed(sequence));
        }

        self.state.tx_nonce += 1;
        info!(sequence, target = %call.target, "Executed queued transaction");
        Ok(())
    }

    /// Advance past the contiguous run of expired entries at the head.
    ///
    /// Returns the number of entries skipped.
    pub fn skip_expired(&mut self, now: Timestamp) -> u64 {
        let start = self.state.tx_nonce;
        while self.state.tx_nonce < self.state.queue_nonce {
            let created_at = match self.record(self.state.tx_nonce) {
                Some(record) => record.created_at,
                None => break,
            };
            if !self.state.is_expired(created_at, now) {
                break;
            }
            self.state.tx_nonce += 1;
        }
        let skipped = self.state.tx_nonce - start;
        if skipped > 0 {
            info!(from = start, to = self.state.tx_nonce, skipped, "Skipped expired entries");
        }
        skipped
    }

    // ----- reads -----

    fn record(&self, sequence: Sequence) -> Option<&EntryRecord> {
        usize::try_from(sequence)
            .ok()
            .and_then(|idx| self.entries.get(idx))
    }

    pub fn state(&self) -> QueueState {
        self.state
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn executor(&self) -> Address {
        self.executor
    }

    pub fn queue_nonce(&self) -> Sequence {
        self.state.queue_nonce
    }

    pub fn tx_nonce(&self) -> Sequence {
        self.state.tx_nonce
    }

    pub fn cooldown(&self) -> u64 {
        self.state.cooldown
    }

    pub fn expiration(&self) -> u64 {
        self.state.expiration
    }

    pub fn entry_hash(&self, sequence: Sequence) -> Option<B256> {
        self.record(sequence).map(|r| r.hash)
    }

    pub fn entry_created_at(&self, sequence: Sequence) -> Option<Timestamp> {
        self.record(sequence).map(|r| r.created_at)
    }

    pub fn entry_status(&self, sequence: Sequence, now: Timestamp) -> Option<EntryStatus> {
        let record = self.record(sequence)?;
        let status = if sequence < self.state.tx_nonce {
            EntryStatus::Consumed
        } else if self.state.is_expired(record.created_at, now) {
            EntryStatus::Expired
        } else if self.state.is_cooled(record.created_at, now) {
            EntryStatus::Executable
        } else {
            EntryStatus::Pending
        };
        Some(status)
    }

    pub fn is_agent(&self, identity: &Address) -> bool {
        self.agents.contains(identity)
    }

    pub fn agents_page(
        &self,
        start: Option<Address>,
        page_size: usize,
    ) -> Result<(Vec<Address>, Option<Address>), QueueError> {
        self.agents.page(start, page_size)
    }

    /// Full event log since setup
    pub fn events(&self) -> &[QueueEvent] {
        &self.events
    }

    /// Events emitted after the first `offset` events
    pub fn events_since(&self, offset: usize) -> &[QueueEvent] {
        self.events.get(offset..).unwrap_or(&[])
    }
}
