//! Result of one dispatcher run.

use crate::types::{Address, Gas, Sequence};
use serde::Serialize;
use std::fmt;

/// Why a run relayed nothing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IdleReason {
    NoExecutableEntries,
    /// The first executable entry costs more than the budget
    InsufficientBudget { balance: Gas, required: Gas },
    /// Expired entries block the head but skipping them is unaffordable
    InsufficientBudgetForSkip { balance: Gas, required: Gas },
    ContractNotFound { instance: Address, cause: String },
    IndexUnreachable { cause: String },
    /// The index has entries past the queue head but not the head itself
    IndexBehind { tx_nonce: Sequence },
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleReason::NoExecutableEntries => write!(f, "No executable transactions found"),
            IdleReason::InsufficientBudget { balance, .. } => write!(
                f,
                "Gas allowance balance of {} insufficient for executing next transaction from queue",
                balance
            ),
            IdleReason::InsufficientBudgetForSkip { balance, .. } => write!(
                f,
                "Gas allowance balance of {} insufficient for skipping expired transactions",
                balance
            ),
            IdleReason::ContractNotFound { instance, .. } => {
                write!(f, "Delay mod contract not deployed at {}", instance)
            }
            IdleReason::IndexUnreachable { cause } => write!(f, "Subgraph query failed ({})", cause),
            IdleReason::IndexBehind { tx_nonce } => {
                write!(f, "Subgraph has not indexed transaction with nonce {} yet", tx_nonce)
            }
        }
    }
}

/// Outcome of a run that did not fail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// At least one relay was accepted
    Executed {
        /// Execute relays accepted
        relayed: u64,
        /// Whether a skip relay was accepted first
        skipped_expired: bool,
        budget_remaining: Gas,
    },
    Idle {
        #[serde(flatten)]
        reason: IdleReason,
    },
}

impl RunOutcome {
    pub fn idle(reason: IdleReason) -> Self {
        RunOutcome::Idle { reason }
    }

    pub fn is_executed(&self) -> bool {
        matches!(self, RunOutcome::Executed { .. })
    }

    /// Total relays accepted, skip included
    pub fn relays(&self) -> u64 {
        match self {
            RunOutcome::Executed {
                relayed,
                skipped_expired,
                ..
            } => relayed + u64::from(*skipped_expired),
            RunOutcome::Idle { .. } => 0,
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Executed {
                relayed,
                skipped_expired,
                budget_remaining,
            } => {
                write!(f, "Relayed {} transaction(s)", relayed)?;
                if *skipped_expired {
                    write!(f, " after skipping expired entries")?;
                }
                write!(f, ", gas allowance left {}", budget_remaining)
            }
            RunOutcome::Idle { reason } => write!(f, "{}", reason),
        }
    }
}
