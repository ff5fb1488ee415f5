//! Integration tests for dispatcher runs against an in-process ledger

use super::test_utils::{call, settings, Harness, AGENT, INSTANCE};
use delayq::abi::{decode_queue_call, encode_skip_expired, QueueCall};
use delayq::dispatch::cursor::{BUDGET_KEY, CHECKPOINT_KEY};
use delayq::dispatch::{
    Allowance, CursorStore, DispatchCursor, Dispatcher, IdleReason, RunOutcome, SledCursorStore,
};
use delayq::error::{DispatchError, StorageError};
use delayq::queue::QueueEvent;
use delayq::types::Address;
use std::sync::Arc;
use tempfile::TempDir;

const T: u64 = 1_700_000_000;

#[tokio::test]
async fn test_budget_limits_relays_per_run() {
    let h = Harness::with_fixed_cost(1800, 0, 300_000, 123_000);
    h.enqueue_at(T, &[call(1), call(2), call(3), call(4)]);

    let now = T + 1800;
    let outcome = h.run_at(now).await.unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Executed {
            relayed: 2,
            skipped_expired: false,
            budget_remaining: 54_000,
        }
    );
    assert_eq!(h.tx_nonce(), 2);
    assert_eq!(h.ledger.executed(), vec![call(1), call(2)]);

    let stored = h.store.snapshot();
    assert_eq!(stored[BUDGET_KEY], "54000");
    assert_eq!(stored[CHECKPOINT_KEY], now.to_string());
}

#[tokio::test]
async fn test_unaffordable_run_leaves_cursor_untouched() {
    let h = Harness::with_fixed_cost(0, 0, 10, 123_000);
    h.enqueue_at(T, &[call(1)]);

    let outcome = h.run_at(T).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::idle(IdleReason::InsufficientBudget {
            balance: 10,
            required: 123_000
        })
    );
    assert!(h.ledger.submitted().is_empty());
    assert!(h.store.snapshot().is_empty());
    assert_eq!(h.tx_nonce(), 0);
}

#[tokio::test]
async fn test_unaffordable_run_keeps_committed_cursor() {
    let h = Harness::with_fixed_cost(0, 0, 300_000, 123_000);
    h.enqueue_at(T, &[call(1), call(2), call(3), call(4)]);
    h.run_at(T).await.unwrap();
    let committed = h.store.snapshot();
    assert_eq!(committed[BUDGET_KEY], "54000");

    // one second accrues 3 units, far short of the next call
    let outcome = h.run_at(T + 1).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::idle(IdleReason::InsufficientBudget {
            balance: 54_003,
            required: 123_000
        })
    );
    assert_eq!(h.store.snapshot(), committed);
    assert_eq!(h.tx_nonce(), 2);
    assert_eq!(h.ledger.submitted().len(), 2);
}

#[tokio::test]
async fn test_allowance_refills_between_runs() {
    let h = Harness::with_fixed_cost(1800, 0, 300_000, 123_000);
    h.enqueue_at(T, &[call(1), call(2), call(3), call(4)]);

    let first = T + 1800;
    h.run_at(first).await.unwrap();

    // half an interval accrues half the allowance: 54000 + 150000
    let second = first + 43_200;
    let outcome = h.run_at(second).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Executed {
            relayed: 1,
            skipped_expired: false,
            budget_remaining: 81_000,
        }
    );
    assert_eq!(h.tx_nonce(), 3);
    assert_eq!(
        DispatchCursor::load(h.store.as_ref()).unwrap(),
        Some(DispatchCursor {
            checkpoint: second,
            budget_remaining: 81_000
        })
    );
}

#[tokio::test]
async fn test_skip_relayed_before_executions() {
    let h = Harness::with_fixed_cost(60, 60, 1_000_000, 1_000);
    h.enqueue_at(T, &[call(1), call(2)]);
    h.enqueue_at(T + 100, &[call(3), call(4)]);

    let outcome = h.run_at(T + 200).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Executed {
            relayed: 2,
            skipped_expired: true,
            budget_remaining: 997_000,
        }
    );

    let submitted = h.ledger.submitted();
    assert_eq!(submitted.len(), 3);
    assert_eq!(submitted[0].data, encode_skip_expired());
    assert_eq!(
        decode_queue_call(&submitted[1].data),
        Ok(QueueCall::ExecuteNext(call(3)))
    );
    assert!(submitted.iter().all(|r| r.target == INSTANCE && r.gas_limit == 1_000));
    assert_eq!(h.tx_nonce(), 4);
    assert_eq!(h.ledger.executed(), vec![call(3), call(4)]);
}

#[tokio::test]
async fn test_relay_failure_persists_progress_and_names_sequence() {
    let h = Harness::with_fixed_cost(0, 0, 1_000_000, 1_000);
    h.enqueue_at(T, &[call(1), call(2), call(3)]);
    h.ledger.reject_submission(1);

    let err = h.run_at(T).await.unwrap_err();
    match err {
        DispatchError::ExecuteRelayFailed { sequence, .. } => assert_eq!(sequence, 1),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.tx_nonce(), 1);

    // the rejected submission had already been debited
    let stored = h.store.snapshot();
    assert_eq!(stored[CHECKPOINT_KEY], T.to_string());
    assert_eq!(stored[BUDGET_KEY], "998000");
}

#[tokio::test]
async fn test_first_relay_failure_persists_nothing() {
    let h = Harness::with_fixed_cost(0, 0, 1_000_000, 1_000);
    h.enqueue_at(T, &[call(1)]);
    h.ledger.reject_submission(0);

    let err = h.run_at(T).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to execute transaction with nonce 0: Relay request failed: relay rejected submission"
    );
    assert!(h.store.snapshot().is_empty());
}

#[tokio::test]
async fn test_reverted_execution_aborts_run_without_progress() {
    let h = Harness::with_fixed_cost(0, 0, 1_000_000, 1_000);
    h.enqueue_at(T, &[call(1), call(2)]);
    h.ledger.fail_executions(true);

    let err = h.run_at(T).await.unwrap_err();
    assert!(matches!(err, DispatchError::ExecuteRelayFailed { sequence: 0, .. }));
    assert!(err.to_string().contains("Module transaction failed for nonce 0"));
    assert!(h.store.snapshot().is_empty());
    assert_eq!(h.tx_nonce(), 0);

    // nothing was persisted, so the next run starts from the full allowance
    h.ledger.fail_executions(false);
    let outcome = h.run_at(T + 10).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Executed {
            relayed: 2,
            skipped_expired: false,
            budget_remaining: 998_000,
        }
    );
    assert_eq!(h.ledger.executed(), vec![call(1), call(2)]);
}

#[tokio::test]
async fn test_skip_relay_failure_aborts_run() {
    let h = Harness::with_fixed_cost(60, 60, 1_000_000, 1_000);
    h.enqueue_at(T, &[call(1)]);
    h.enqueue_at(T + 100, &[call(2)]);
    h.ledger.reject_submission(0);

    let err = h.run_at(T + 200).await.unwrap_err();
    assert!(matches!(err, DispatchError::SkipRelayFailed { .. }));
    assert!(err.to_string().starts_with("Failed to relay skipExpired() call"));
    assert_eq!(h.ledger.submitted().len(), 1);
    assert!(h.store.snapshot().is_empty());
    assert_eq!(h.tx_nonce(), 0);
}

#[tokio::test]
async fn test_unaffordable_skip_stops_run() {
    let h = Harness::with_fixed_cost(60, 60, 500, 1_000);
    h.enqueue_at(T, &[call(1)]);
    h.enqueue_at(T + 100, &[call(2)]);

    let outcome = h.run_at(T + 200).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::idle(IdleReason::InsufficientBudgetForSkip {
            balance: 500,
            required: 1_000
        })
    );
    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_nothing_cooled_is_idle() {
    let h = Harness::with_fixed_cost(1800, 0, 300_000, 1);
    h.enqueue_at(T, &[call(1)]);

    let outcome = h.run_at(T + 1799).await.unwrap();
    assert_eq!(outcome, RunOutcome::idle(IdleReason::NoExecutableEntries));
    assert_eq!(outcome.to_string(), "No executable transactions found");
    assert!(h.store.snapshot().is_empty());
}

#[tokio::test]
async fn test_only_expired_entries_is_idle() {
    let h = Harness::with_fixed_cost(60, 60, 300_000, 1);
    h.enqueue_at(T, &[call(1)]);

    let outcome = h.run_at(T + 1_000).await.unwrap();
    assert_eq!(outcome, RunOutcome::idle(IdleReason::NoExecutableEntries));
    assert!(h.ledger.submitted().is_empty());
}

#[tokio::test]
async fn test_unknown_instance_reports_contract_not_found() {
    let h = Harness::with_fixed_cost(0, 0, 300_000, 1);
    let missing = Address::repeat_byte(0x77);
    let dispatcher = Dispatcher::new(
        h.ledger.clone(),
        h.index.clone(),
        h.ledger.clone(),
        h.store.clone(),
        settings(
            missing,
            Allowance {
                full: 300_000,
                refill_interval: 86_400,
            },
        ),
    );

    let outcome = dispatcher.run(T).await.unwrap();
    assert!(matches!(
        &outcome,
        RunOutcome::Idle {
            reason: IdleReason::ContractNotFound { instance, .. }
        } if *instance == missing
    ));
    assert_eq!(
        outcome.to_string(),
        format!("Delay mod contract not deployed at {}", missing)
    );
}

#[tokio::test]
async fn test_index_outage_reports_unreachable() {
    let h = Harness::with_fixed_cost(0, 0, 300_000, 1);
    h.enqueue_at(T, &[call(1)]);
    h.index.fail_next(2);

    let outcome = h.run_at(T).await.unwrap();
    assert!(matches!(
        outcome,
        RunOutcome::Idle {
            reason: IdleReason::IndexUnreachable { .. }
        }
    ));
    assert!(outcome.to_string().starts_with("Subgraph query failed"));
    assert!(h.store.snapshot().is_empty());
}

#[tokio::test]
async fn test_index_missing_head_relays_nothing() {
    let h = Harness::with_fixed_cost(0, 0, 300_000, 1_000);
    let queue = h.ledger.queue();
    {
        let mut queue = queue.lock();
        queue.enqueue(AGENT, T, call(1)).unwrap();
        queue.enqueue(AGENT, T, call(2)).unwrap();
        // the index has only caught up with the second entry
        for event in queue.events() {
            if matches!(event, QueueEvent::EntryAdded(added) if added.sequence == 1) {
                h.index.ingest(INSTANCE, event);
            }
        }
    }

    let outcome = h.run_at(T + 200).await.unwrap();
    assert_eq!(outcome, RunOutcome::idle(IdleReason::IndexBehind { tx_nonce: 0 }));
    assert!(h.ledger.submitted().is_empty());
    assert!(h.store.snapshot().is_empty());

    h.ledger.publish_to(&h.index);
    let outcome = h.run_at(T + 300).await.unwrap();
    assert_eq!(outcome.relays(), 2);
    assert_eq!(h.ledger.executed(), vec![call(1), call(2)]);
}

#[tokio::test]
async fn test_single_index_failure_is_retried() {
    let h = Harness::with_fixed_cost(0, 0, 300_000, 1);
    h.enqueue_at(T, &[call(1)]);
    h.index.fail_next(1);

    let outcome = h.run_at(T).await.unwrap();
    assert_eq!(outcome.relays(), 1);
}

#[tokio::test]
async fn test_cursor_persists_in_sled() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledCursorStore::new(dir.path().join("cursor")).unwrap());
    let h = Harness::with_fixed_cost(0, 0, 300_000, 123_000);
    h.enqueue_at(T, &[call(1), call(2), call(3)]);
    let dispatcher = Dispatcher::new(
        h.ledger.clone(),
        h.index.clone(),
        h.ledger.clone(),
        store.clone(),
        settings(
            INSTANCE,
            Allowance {
                full: 300_000,
                refill_interval: 86_400,
            },
        ),
    );

    h.ledger.set_time(T);
    dispatcher.run(T).await.unwrap();
    assert_eq!(
        dispatcher.cursor().unwrap(),
        Some(DispatchCursor {
            checkpoint: T,
            budget_remaining: 54_000
        })
    );
}

/// Store whose writes always fail
struct ReadOnlyStore;

impl CursorStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Ok(None)
    }

    fn put_all(&self, _pairs: &[(&str, String)]) -> Result<(), StorageError> {
        Err(StorageError::Backend("read-only store".to_string()))
    }
}

#[tokio::test]
async fn test_relay_failure_reported_when_persisting_fails() {
    let h = Harness::with_fixed_cost(0, 0, 1_000_000, 1_000);
    h.enqueue_at(T, &[call(1), call(2), call(3)]);
    h.ledger.reject_submission(1);
    let dispatcher = Dispatcher::new(
        h.ledger.clone(),
        h.index.clone(),
        h.ledger.clone(),
        Arc::new(ReadOnlyStore),
        settings(
            INSTANCE,
            Allowance {
                full: 1_000_000,
                refill_interval: 86_400,
            },
        ),
    );

    h.ledger.set_time(T);
    match dispatcher.run(T).await {
        Err(DispatchError::ExecuteRelayFailed { sequence, cause }) => {
            assert_eq!(sequence, 1);
            assert!(cause.contains("relay rejected submission"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(h.tx_nonce(), 1);
}
