//! On-ledger ABI of the delay queue.
//!
//! Used to build relay payloads, to read queue state over JSON-RPC, and to
//! decode relayed payloads back into queue calls in-process.

use crate::queue::{Call, Operation};
use crate::types::Bytes;
use alloy_sol_types::{sol, SolCall};

sol! {
    function executeNextTx(address to, uint256 value, bytes data, uint8 operation);
    function skipExpired();
    function txCooldown() external view returns (uint256);
    function txExpiration() external view returns (uint256);
    function txNonce() external view returns (uint256);
    function queueNonce() external view returns (uint256);
}

/// A decoded relay payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCall {
    ExecuteNext(Call),
    SkipExpired,
}

/// Calldata for `executeNextTx(to, value, data, operation)`
pub fn encode_execute_next(call: &Call) -> Bytes {
    executeNextTxCall {
        to: call.target,
        value: call.value,
        data: call.payload.clone(),
        operation: call.operation.as_u8(),
    }
    .abi_encode()
    .into()
}

/// Calldata for `skipExpired()`
pub fn encode_skip_expired() -> Bytes {
    skipExpiredCall {}.abi_encode().into()
}

/// Decode relayed calldata into a queue call.
pub fn decode_queue_call(data: &[u8]) -> Result<QueueCall, String> {
    if data.len() < 4 {
        return Err(format!("calldata too short ({} bytes)", data.len()));
    }
    let selector = &data[..4];

    if selector == executeNextTxCall::SELECTOR.as_slice() {
        let decoded = executeNextTxCall::abi_decode(data, true)
            .map_err(|e| format!("invalid executeNextTx calldata: {}", e))?;
        let operation = Operation::try_from(decoded.operation)
            .map_err(|op| format!("unknown operation {}", op))?;
        return Ok(QueueCall::ExecuteNext(Call {
            target: decoded.to,
            value: decoded.value,
            payload: decoded.data,
            operation,
        }));
    }

    if selector == skipExpiredCall::SELECTOR.as_slice() {
        return Ok(QueueCall::SkipExpired);
    }

    Err(format!("unknown selector 0x{}", hex::encode(selector)))
}
