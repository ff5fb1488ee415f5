//! Error types for the delay queue and its dispatcher.

use crate::types::{Address, Sequence, Timestamp, B256};
use thiserror::Error;

/// Queue state machine errors
///
/// Every variant is fatal to the single call that produced it and leaves the
/// queue state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    #[error("Agent not authorized: {0}")]
    NotAuthorized(Address),

    #[error("Agent already authorized: {0}")]
    AlreadyAuthorized(Address),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(Address),

    #[error("Invalid page size: {0}")]
    InvalidPageSize(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Transaction queue is empty")]
    QueueEmpty,

    #[error("Transaction hashes do not match for nonce {sequence}: expected {expected}, got {actual}")]
    HashMismatch {
        sequence: Sequence,
        expected: B256,
        actual: B256,
    },

    #[error("Transaction {sequence} is still in cooldown until {ready_at}")]
    StillInCooldown {
        sequence: Sequence,
        ready_at: Timestamp,
    },

    #[error("Transaction {sequence} expired at {expired_at}")]
    Expired {
        sequence: Sequence,
        expired_at: Timestamp,
    },

    #[error("Module transaction failed for nonce {0}")]
    ExecutionFailed(Sequence),
}

/// Cursor storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Corrupt value for key {key}: {value:?}")]
    Corrupt { key: String, value: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Dispatcher run-level errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Ledger request failed: {0}")]
    Ledger(String),

    #[error("Delay mod contract not deployed at {0}")]
    ContractNotFound(Address),

    #[error("Index request failed: {0}")]
    Index(String),

    #[error("Cost estimation failed: {0}")]
    Estimation(String),

    #[error("Relay request failed: {0}")]
    Relay(String),

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("Failed to relay skipExpired() call: {cause}")]
    SkipRelayFailed { cause: String },

    #[error("Failed to execute transaction with nonce {sequence}: {cause}")]
    ExecuteRelayFailed { sequence: Sequence, cause: String },

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for DispatchError {
    fn from(err: config::ConfigError) -> Self {
        DispatchError::ConfigError(err.to_string())
    }
}
