//! Target executor seam.

use crate::queue::call::Call;

/// Applies a dequeued operation's side effects.
///
/// Returns `false` when the execution layer reports failure; the queue then
/// surfaces `ExecutionFailed` and does not advance.
pub trait TargetExecutor {
    fn exec(&mut self, call: &Call) -> bool;
}

/// Executor that records every call it accepts and can be told to fail.
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    pub executed: Vec<Call>,
    pub fail: bool,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            executed: Vec::new(),
            fail: true,
        }
    }
}

impl TargetExecutor for RecordingExecutor {
    fn exec(&mut self, call: &Call) -> bool {
        if self.fail {
            return false;
        }
        self.executed.push(call.clone());
        true
    }
}
