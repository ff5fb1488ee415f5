//! delayq: Delayed, Budget-Gated Transaction Dispatch
//!
//! A queue of pending operations that may only execute after a cooldown and
//! before an expiration deadline, plus a dispatcher that discovers executable
//! entries, enforces a periodically replenished gas allowance and submits them
//! through a relay.

pub mod abi;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod index;
pub mod ledger;
pub mod local;
pub mod logging;
pub mod queue;
pub mod relay;
pub mod types;
