//! In-process ledger hosting a single [`DelayQueue`].
//!
//! Serves as both the ledger reader and the relay for a dispatcher, applying
//! relayed calldata to the queue directly. Used for simulation and tests.

use crate::abi::{decode_queue_call, QueueCall};
use crate::error::DispatchError;
use crate::index::MemoryQueueIndex;
use crate::ledger::{QueueLedger, QueueSnapshot};
use crate::queue::{Call, DelayQueue, RecordingExecutor};
use crate::relay::{RelayReceipt, RelayRequest, RelayService};
use crate::types::{Address, Bytes, Gas, Timestamp};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// How the local ledger prices a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModel {
    Fixed(Gas),
    /// `base + per_byte * payload length`
    PerByte { base: Gas, per_byte: Gas },
}

impl CostModel {
    pub fn cost(&self, data: &[u8]) -> Gas {
        match *self {
            CostModel::Fixed(cost) => cost,
            CostModel::PerByte { base, per_byte } => {
                let len = Gas::try_from(data.len()).unwrap_or(Gas::MAX);
                base.saturating_add(per_byte.saturating_mul(len))
            }
        }
    }
}

pub struct LocalLedger {
    instance: Address,
    queue: Arc<Mutex<DelayQueue>>,
    executor: Mutex<RecordingExecutor>,
    clock: AtomicU64,
    cost: CostModel,
    submitted: Mutex<Vec<RelayRequest>>,
    /// Submission index (0-based) that will be rejected
    reject_at: Mutex<Option<usize>>,
    published: AtomicUsize,
}

impl LocalLedger {
    pub fn new(instance: Address, queue: DelayQueue, cost: CostModel) -> Self {
        Self {
            instance,
            queue: Arc::new(Mutex::new(queue)),
            executor: Mutex::new(RecordingExecutor::new()),
            clock: AtomicU64::new(0),
            cost,
            submitted: Mutex::new(Vec::new()),
            reject_at: Mutex::new(None),
            published: AtomicUsize::new(0),
        }
    }

    pub fn instance(&self) -> Address {
        self.instance
    }

    /// Shared handle to the hosted queue
    pub fn queue(&self) -> Arc<Mutex<DelayQueue>> {
        Arc::clone(&self.queue)
    }

    pub fn now(&self) -> Timestamp {
        self.clock.load(Ordering::SeqCst)
    }

    pub fn set_time(&self, now: Timestamp) {
        self.clock.store(now, Ordering::SeqCst);
    }

    /// Reject the `n`th submission from now on (0-based, counting all submissions)
    pub fn reject_submission(&self, n: usize) {
        *self.reject_at.lock() = Some(n);
    }

    /// Every request handed to the relay, accepted or not
    pub fn submitted(&self) -> Vec<RelayRequest> {
        self.submitted.lock().clone()
    }

    /// Calls the target executor has applied
    pub fn executed(&self) -> Vec<Call> {
        self.executor.lock().executed.clone()
    }

    /// Make the target executor report failure
    pub fn fail_executions(&self, fail: bool) {
        self.executor.lock().fail = fail;
    }

    /// Feed queue events not yet published into `index`
    pub fn publish_to(&self, index: &MemoryQueueIndex) -> usize {
        let queue = self.queue.lock();
        let offset = self.published.load(Ordering::SeqCst);
        let events = queue.events_since(offset);
        self.published.store(offset + events.len(), Ordering::SeqCst);
        index.ingest_all(self.instance, events)
    }

    fn apply(&self, data: &[u8]) -> Result<(), String> {
        let now = self.now();
        let call = decode_queue_call(data)?;
        let mut queue = self.queue.lock();
        match call {
            QueueCall::SkipExpired => {
                queue.skip_expired(now);
                Ok(())
            }
            QueueCall::ExecuteNext(call) => {
                let mut executor = self.executor.lock();
                queue
                    .execute_next(&mut *executor, now, &call)
                    .map_err(|e| e.to_string())
            }
        }
    }
}

#[async_trait]
impl QueueLedger for LocalLedger {
    async fn snapshot(&self, instance: Address) -> Result<QueueSnapshot, DispatchError> {
        if instance != self.instance {
            return Err(DispatchError::ContractNotFound(instance));
        }
        let state = self.queue.lock().state();
        Ok(QueueSnapshot {
            tx_nonce: state.tx_nonce,
            cooldown: state.cooldown,
            expiration: state.expiration,
        })
    }

    async fn estimate_cost(&self, instance: Address, data: &Bytes) -> Result<Gas, DispatchError> {
        if instance != self.instance {
            return Err(DispatchError::Estimation(format!("no code at {}", instance)));
        }
        Ok(self.cost.cost(data))
    }
}

#[async_trait]
impl RelayService for LocalLedger {
    async fn submit(&self, request: RelayRequest) -> Result<RelayReceipt, DispatchError> {
        let position = {
            let mut submitted = self.submitted.lock();
            submitted.push(request.clone());
            submitted.len() - 1
        };

        if *self.reject_at.lock() == Some(position) {
            return Err(DispatchError::Relay("relay rejected submission".to_string()));
        }
        if request.target != self.instance {
            return Err(DispatchError::Relay(format!("unknown target {}", request.target)));
        }

        self.apply(&request.data).map_err(DispatchError::Relay)?;
        debug!(position, gas_limit = request.gas_limit, "Applied relayed call");
        Ok(RelayReceipt {
            task_id: format!("local-{}", position),
        })
    }
}
