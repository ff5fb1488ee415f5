//! Queued operations and their content hash.

use crate::types::{Address, Bytes, Sequence, B256, U256};
use alloy_primitives::keccak256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the target executor applies a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Operation {
    Call = 0,
    DelegateCall = 1,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Operation {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Call),
            1 => Ok(Operation::DelegateCall),
            other => Err(other),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Call => write!(f, "Call"),
            Operation::DelegateCall => write!(f, "DelegateCall"),
        }
    }
}

/// The operation an entry asks the target executor to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    pub target: Address,
    pub value: U256,
    pub payload: Bytes,
    pub operation: Operation,
}

impl Call {
    pub fn new(target: Address, value: U256, payload: impl Into<Bytes>, operation: Operation) -> Self {
        Self {
            target,
            value,
            payload: payload.into(),
            operation,
        }
    }

    /// Plain call with no value attached.
    pub fn simple(target: Address, payload: impl Into<Bytes>) -> Self {
        Self::new(target, U256::ZERO, payload, Operation::Call)
    }
}

/// Content hash recorded for an entry at enqueue time.
///
/// keccak256(target || value || payload || operation || sequence), packed:
/// 20-byte address, 32-byte big-endian value, raw payload, one operation byte,
/// 32-byte big-endian sequence.
pub fn entry_hash(call: &Call, sequence: Sequence) -> B256 {
    let mut buf = Vec::with_capacity(20 + 32 + call.payload.len() + 1 + 32);
    buf.extend_from_slice(call.target.as_slice());
    buf.extend_from_slice(&call.value.to_be_bytes::<32>());
    buf.extend_from_slice(&call.payload);
    buf.push(call.operation.as_u8());
    buf.extend_from_slice(&U256::from(sequence).to_be_bytes::<32>());
    keccak256(buf)
}
