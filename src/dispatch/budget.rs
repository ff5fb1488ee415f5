//! Budget accrual.

use crate::types::{Gas, Timestamp};

/// Refill parameters of the dispatcher's resource budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allowance {
    /// Budget ceiling, also the refill amount per interval
    pub full: Gas,
    /// Seconds to refill a fully drained budget; 0 disables refills
    pub refill_interval: u64,
}

impl Allowance {
    /// Amount accrued over `elapsed` seconds
    pub fn accrued(&self, elapsed: u64) -> Gas {
        if self.refill_interval == 0 {
            return 0;
        }
        let accrued = u128::from(self.full) * u128::from(elapsed) / u128::from(self.refill_interval);
        Gas::try_from(accrued).unwrap_or(Gas::MAX)
    }

    /// Budget available at `now`, given what remained at `checkpoint`.
    ///
    /// Never exceeds `full`. A checkpoint in the future accrues nothing.
    pub fn replenish(&self, remaining: Gas, checkpoint: Timestamp, now: Timestamp) -> Gas {
        let elapsed = now.saturating_sub(checkpoint);
        remaining
            .saturating_add(self.accrued(elapsed))
            .min(self.full)
    }
}
