//! Budget-gated dispatcher.
//!
//! Each [`Dispatcher::run`] reads the queue, finds entries past cooldown and
//! relays them in sequence order until the budget runs out. Progress is
//! persisted only when at least one relay was accepted, so a run that fails
//! early leaves the stored cursor exactly as it found it.

pub mod budget;
pub mod cursor;
pub mod outcome;
pub mod retry;

pub use budget::Allowance;
pub use cursor::{CursorStore, DispatchCursor, MemoryCursorStore, SledCursorStore};
pub use outcome::{IdleReason, RunOutcome};
pub use retry::CallPolicy;

use crate::abi::{encode_execute_next, encode_skip_expired};
use crate::error::DispatchError;
use crate::index::{IndexedEntry, QueueIndex};
use crate::ledger::{QueueLedger, QueueSnapshot};
use crate::relay::{RelayRequest, RelayService};
use crate::types::{Address, Bytes, Gas, Timestamp};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Static parameters of a dispatcher
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    /// Queue instance to serve
    pub instance: Address,
    pub allowance: Allowance,
    pub policy: CallPolicy,
}

/// Index entries split by where they stand at `now`
#[derive(Debug, Default)]
struct Partition {
    expired: Vec<IndexedEntry>,
    executable: Vec<IndexedEntry>,
    /// Rows exist past `tx_nonce` but the head row itself is missing
    head_missing: bool,
}

fn partition(snapshot: &QueueSnapshot, mut entries: Vec<IndexedEntry>, now: Timestamp) -> Partition {
    let mut parts = Partition::default();
    entries.sort_by_key(|e| e.sequence);

    // stale rows are dropped; only the gapless run starting at tx_nonce is usable
    let mut expected = snapshot.tx_nonce;
    for entry in entries {
        if entry.sequence < expected {
            continue;
        }
        if entry.sequence > expected {
            parts.head_missing = expected == snapshot.tx_nonce;
            break;
        }
        expected += 1;

        let ready_at = entry.created_at.saturating_add(snapshot.cooldown);
        if ready_at > now {
            continue;
        }
        if snapshot.expiration != 0 && ready_at.saturating_add(snapshot.expiration) < now {
            parts.expired.push(entry);
        } else {
            parts.executable.push(entry);
        }
    }
    parts
}

/// Mutable state of one run
struct RunState {
    budget: Gas,
    relays: u64,
}

enum Attempt {
    Relayed,
    Unaffordable { required: Gas },
}

/// Periodically invoked dispatcher for one queue instance
pub struct Dispatcher {
    ledger: Arc<dyn QueueLedger>,
    index: Arc<dyn QueueIndex>,
    relay: Arc<dyn RelayService>,
    store: Arc<dyn CursorStore>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        ledger: Arc<dyn QueueLedger>,
        index: Arc<dyn QueueIndex>,
        relay: Arc<dyn RelayService>,
        store: Arc<dyn CursorStore>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            ledger,
            index,
            relay,
            store,
            settings,
        }
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Persisted cursor, if any run has committed progress
    pub fn cursor(&self) -> Result<Option<DispatchCursor>, DispatchError> {
        Ok(DispatchCursor::load(self.store.as_ref())?)
    }

    /// Perform one invocation at ledger time `now`
    pub async fn run(&self, now: Timestamp) -> Result<RunOutcome, DispatchError> {
        let instance = self.settings.instance;
        let policy = self.settings.policy;

        let cursor = DispatchCursor::load_or_initial(self.store.as_ref(), self.settings.allowance.full)?;
        debug!(
            checkpoint = cursor.checkpoint,
            budget_remaining = cursor.budget_remaining,
            "Loaded dispatch cursor"
        );

        let snapshot = match policy
            .retrying("queue snapshot", || self.ledger.snapshot(instance))
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(%instance, error = %err, "Failed to read queue state");
                return Ok(RunOutcome::idle(IdleReason::ContractNotFound {
                    instance,
                    cause: err.to_string(),
                }));
            }
        };

        let entries = match policy
            .retrying("index query", || {
                self.index.entries_from(instance, snapshot.tx_nonce)
            })
            .await
        {
            Ok(entries) => entries,
            Err(err) => {
                warn!(%instance, error = %err, "Index query failed");
                return Ok(RunOutcome::idle(IdleReason::IndexUnreachable {
                    cause: err.to_string(),
                }));
            }
        };

        let budget = self
            .settings
            .allowance
            .replenish(cursor.budget_remaining, cursor.checkpoint, now);
        info!(
            previous = cursor.budget_remaining,
            budget,
            elapsed = now.saturating_sub(cursor.checkpoint),
            "Gas allowance topped up"
        );

        let parts = partition(&snapshot, entries, now);
        info!(
            tx_nonce = snapshot.tx_nonce,
            expired = parts.expired.len(),
            executable = parts.executable.len(),
            "Partitioned queue entries"
        );

        if parts.head_missing {
            warn!(tx_nonce = snapshot.tx_nonce, "Index is missing the head entry");
            return Ok(RunOutcome::idle(IdleReason::IndexBehind {
                tx_nonce: snapshot.tx_nonce,
            }));
        }
        if parts.executable.is_empty() {
            return Ok(RunOutcome::idle(IdleReason::NoExecutableEntries));
        }

        let mut state = RunState { budget, relays: 0 };
        let mut skipped_expired = false;

        if !parts.expired.is_empty() {
            info!(count = parts.expired.len(), "Skipping expired transactions");
            match self.attempt(&mut state, encode_skip_expired()).await {
                Ok(Attempt::Relayed) => skipped_expired = true,
                Ok(Attempt::Unaffordable { required }) => {
                    return Ok(RunOutcome::idle(IdleReason::InsufficientBudgetForSkip {
                        balance: state.budget,
                        required,
                    }));
                }
                Err(err) => {
                    // nothing has been relayed yet, so nothing to persist
                    return Err(DispatchError::SkipRelayFailed {
                        cause: err.to_string(),
                    });
                }
            }
        }

        let mut relayed = 0u64;
        let mut shortfall = None;
        for entry in &parts.executable {
            match self.attempt(&mut state, encode_execute_next(&entry.call())).await {
                Ok(Attempt::Relayed) => {
                    relayed += 1;
                    info!(sequence = entry.sequence, budget = state.budget, "Relayed queued transaction");
                }
                Ok(Attempt::Unaffordable { required }) => {
                    info!(
                        sequence = entry.sequence,
                        required,
                        budget = state.budget,
                        "Gas allowance insufficient, stopping"
                    );
                    shortfall = Some(required);
                    break;
                }
                Err(err) => {
                    // the relay failure is what gets reported
                    if let Err(commit_err) = self.commit(&state, now) {
                        error!(
                            sequence = entry.sequence,
                            error = %commit_err,
                            "Failed to persist progress after relay failure"
                        );
                    }
                    return Err(DispatchError::ExecuteRelayFailed {
                        sequence: entry.sequence,
                        cause: err.to_string(),
                    });
                }
            }
        }

        self.commit(&state, now)?;

        if state.relays == 0 {
            let required = shortfall.unwrap_or_default();
            return Ok(RunOutcome::idle(IdleReason::InsufficientBudget {
                balance: state.budget,
                required,
            }));
        }

        let outcome = RunOutcome::Executed {
            relayed,
            skipped_expired,
            budget_remaining: state.budget,
        };
        info!(%outcome, "Dispatch run complete");
        Ok(outcome)
    }

    /// Estimate, check budget, debit and submit one payload
    async fn attempt(&self, state: &mut RunState, data: Bytes) -> Result<Attempt, DispatchError> {
        let instance = self.settings.instance;
        let policy = self.settings.policy;

        let cost = policy
            .retrying("cost estimation", || self.ledger.estimate_cost(instance, &data))
            .await?;
        if cost > state.budget {
            return Ok(Attempt::Unaffordable { required: cost });
        }

        state.budget -= cost;
        let request = RelayRequest {
            target: instance,
            data,
            gas_limit: cost,
        };
        // submissions are never retried; a timed out call may already be in flight
        let receipt = policy.once("relay submission", self.relay.submit(request)).await?;
        state.relays += 1;
        debug!(task_id = %receipt.task_id, cost, "Relay accepted");
        Ok(Attempt::Relayed)
    }

    /// Persist checkpoint and budget if anything was relayed
    fn commit(&self, state: &RunState, now: Timestamp) -> Result<(), DispatchError> {
        if state.relays == 0 {
            return Ok(());
        }
        let cursor = DispatchCursor {
            checkpoint: now,
            budget_remaining: state.budget,
        };
        cursor.save(self.store.as_ref())?;
        debug!(checkpoint = now, budget_remaining = state.budget, relays = state.relays, "Persisted dispatch cursor");
        Ok(())
    }
}
