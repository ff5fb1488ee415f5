//! Shared test utilities for integration tests
//!
//! Builds an in-process environment: a queue hosted by a local ledger, an
//! in-memory index fed from its events, an in-memory cursor store and a
//! dispatcher wired to all three.

use delayq::dispatch::{Allowance, CallPolicy, DispatchSettings, Dispatcher, MemoryCursorStore};
use delayq::index::MemoryQueueIndex;
use delayq::local::{CostModel, LocalLedger};
use delayq::queue::{Call, DelayQueue, QueueSetup};
use delayq::types::{Address, Gas, Sequence, Timestamp};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OWNER: Address = Address::new([0xaa; 20]);
pub const EXECUTOR: Address = Address::new([0xee; 20]);
pub const AGENT: Address = Address::new([0x0a; 20]);
pub const INSTANCE: Address = Address::new([0xd1; 20]);

/// Global mutex to serialize environment variable access across tests
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub fn new_queue(cooldown: u64, expiration: u64) -> DelayQueue {
    let mut queue = DelayQueue::new(QueueSetup {
        owner: OWNER,
        executor: EXECUTOR,
        cooldown,
        expiration,
    })
    .unwrap();
    queue.authorize_agent(OWNER, AGENT).unwrap();
    queue
}

/// A distinct call per seed
pub fn call(seed: u8) -> Call {
    Call::simple(Address::repeat_byte(seed), vec![0xd0, 0xe3, 0x0d, 0xb0, seed])
}

pub struct Harness {
    pub ledger: Arc<LocalLedger>,
    pub index: Arc<MemoryQueueIndex>,
    pub store: Arc<MemoryCursorStore>,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(cooldown: u64, expiration: u64, allowance: Allowance, cost: CostModel) -> Self {
        let ledger = Arc::new(LocalLedger::new(INSTANCE, new_queue(cooldown, expiration), cost));
        let index = Arc::new(MemoryQueueIndex::new());
        let store = Arc::new(MemoryCursorStore::new());
        let dispatcher = Dispatcher::new(
            ledger.clone(),
            index.clone(),
            ledger.clone(),
            store.clone(),
            settings(INSTANCE, allowance),
        );
        Self {
            ledger,
            index,
            store,
            dispatcher,
        }
    }

    /// Fixed per-call cost and a refill interval of one day
    pub fn with_fixed_cost(cooldown: u64, expiration: u64, full: Gas, cost: Gas) -> Self {
        Self::new(
            cooldown,
            expiration,
            Allowance {
                full,
                refill_interval: 86_400,
            },
            CostModel::Fixed(cost),
        )
    }

    /// Enqueue `calls` at time `at` and publish them to the index
    pub fn enqueue_at(&self, at: Timestamp, calls: &[Call]) -> Vec<Sequence> {
        let queue = self.ledger.queue();
        let seqs = {
            let mut queue = queue.lock();
            calls
                .iter()
                .map(|c| queue.enqueue(AGENT, at, c.clone()).unwrap())
                .collect()
        };
        self.ledger.publish_to(&self.index);
        seqs
    }

    /// Set the ledger clock and run the dispatcher at the same time
    pub async fn run_at(
        &self,
        now: Timestamp,
    ) -> Result<delayq::dispatch::RunOutcome, delayq::error::DispatchError> {
        self.ledger.set_time(now);
        self.dispatcher.run(now).await
    }

    pub fn tx_nonce(&self) -> Sequence {
        self.ledger.queue().lock().tx_nonce()
    }
}

pub fn settings(instance: Address, allowance: Allowance) -> DispatchSettings {
    DispatchSettings {
        instance,
        allowance,
        policy: CallPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 1,
        },
    }
}
