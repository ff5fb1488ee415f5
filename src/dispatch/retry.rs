//! Bounded waits for outbound calls.

use crate::error::DispatchError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Per-call timeout and retry count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Clamped to at most one
    pub max_retries: u32,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 1,
        }
    }
}

impl CallPolicy {
    fn attempts(&self) -> u32 {
        1 + self.max_retries.min(1)
    }

    /// Run `call` once under the timeout
    pub async fn once<T, Fut>(&self, operation: &str, call: Fut) -> Result<T, DispatchError>
    where
        Fut: Future<Output = Result<T, DispatchError>>,
    {
        match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout {
                operation: operation.to_string(),
                millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    /// Run `call` under the timeout, retrying once on a retryable failure
    pub async fn retrying<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, DispatchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DispatchError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;
        loop {
            match self.once(operation, call()).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < attempts && is_retryable(&err) => {
                    warn!(operation, attempt, error = %err, "Retrying call");
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// An undeployed instance stays undeployed; everything else may be transient.
fn is_retryable(err: &DispatchError) -> bool {
    !matches!(err, DispatchError::ContractNotFound(_))
}
