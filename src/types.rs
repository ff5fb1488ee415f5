//! Shared primitive types.

pub use alloy_primitives::{Address, Bytes, B256, U256};

/// Ledger time in unix seconds.
pub type Timestamp = u64;

/// Queue sequence number (nonce).
pub type Sequence = u64;

/// Resource units (gas) spent by the dispatcher.
pub type Gas = u64;

/// Reserved sentinel identity of the agent allow-list; never a valid agent.
pub const SENTINEL: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

/// Minimum non-zero expiration window, in seconds.
pub const MIN_EXPIRATION_SECS: u64 = 60;
