//! Property-based tests for queue ordering and allowance bounds

use delayq::dispatch::Allowance;
use delayq::queue::{Call, DelayQueue, QueueSetup, RecordingExecutor};
use delayq::types::Address;
use proptest::prelude::*;

const OWNER: Address = Address::new([0xaa; 20]);
const AGENT: Address = Address::new([0x0a; 20]);

fn queue(cooldown: u64, expiration: u64) -> DelayQueue {
    let mut queue = DelayQueue::new(QueueSetup {
        owner: OWNER,
        executor: Address::new([0xee; 20]),
        cooldown,
        expiration,
    })
    .unwrap();
    queue.authorize_agent(OWNER, AGENT).unwrap();
    queue
}

fn call(seed: u8) -> Call {
    Call::simple(Address::repeat_byte(seed.max(1)), vec![seed])
}

/// The cursor never passes the next sequence number, whatever the operation order
#[test]
fn test_cursor_never_passes_queue_nonce() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                0u64..600,
                prop_oneof![Just(0u64), 60u64..600],
                prop::collection::vec((0u8..3, 0u64..400), 0..40),
            ),
            |(cooldown, expiration, ops)| {
                let mut q = queue(cooldown, expiration);
                let mut executor = RecordingExecutor::new();
                let mut now = 1_700_000_000u64;
                let mut calls = Vec::new();

                for (kind, delta) in ops {
                    now += delta;
                    match kind {
                        0 => {
                            let before = q.queue_nonce();
                            let c = call(calls.len() as u8);
                            let seq = q.enqueue(AGENT, now, c.clone()).unwrap();
                            prop_assert_eq!(seq, before);
                            prop_assert_eq!(q.queue_nonce(), before + 1);
                            calls.push(c);
                        }
                        1 => {
                            let before = q.tx_nonce();
                            let skipped = q.skip_expired(now);
                            prop_assert_eq!(q.tx_nonce(), before + skipped);
                        }
                        _ => {
                            let before = q.tx_nonce();
                            let head = calls.get(before as usize).cloned().unwrap_or_else(|| call(0));
                            match q.execute_next(&mut executor, now, &head) {
                                Ok(()) => {
                                    prop_assert_eq!(q.tx_nonce(), before + 1);
                                }
                                Err(_) => {
                                    prop_assert_eq!(q.tx_nonce(), before);
                                }
                            }
                        }
                    }
                    prop_assert!(q.tx_nonce() <= q.queue_nonce());
                }
                Ok(())
            },
        )
        .unwrap();
}

/// skip_expired consumes exactly the expired prefix and nothing after it
#[test]
fn test_skip_expired_consumes_only_expired_prefix() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(
                0u64..300,
                60u64..300,
                prop::collection::vec(0u64..200, 1..20),
                0u64..2_000,
            ),
            |(cooldown, expiration, gaps, probe)| {
                let mut q = queue(cooldown, expiration);
                let start = 1_700_000_000u64;
                let mut created = Vec::new();
                let mut at = start;
                for (i, gap) in gaps.iter().enumerate() {
                    at += gap;
                    q.enqueue(AGENT, at, call(i as u8)).unwrap();
                    created.push(at);
                }

                let now = start + probe;
                let state = q.state();
                let expected = created
                    .iter()
                    .take_while(|&&c| state.is_expired(c, now))
                    .count() as u64;

                prop_assert_eq!(q.skip_expired(now), expected);
                prop_assert_eq!(q.tx_nonce(), expected);
                if let Some(&head) = created.get(expected as usize) {
                    prop_assert!(!state.is_expired(head, now));
                }
                Ok(())
            },
        )
        .unwrap();
}

/// Expiration windows shorter than a minute are rejected, except zero
#[test]
fn test_short_expiration_rejected() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(0u64..240), |expiration| {
            let result = DelayQueue::new(QueueSetup {
                owner: OWNER,
                executor: Address::new([0xee; 20]),
                cooldown: 0,
                expiration,
            });
            if expiration > 0 && expiration < 60 {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.is_ok());
            }
            Ok(())
        })
        .unwrap();
}

/// Replenishing never exceeds the allowance and never loses what remained
#[test]
fn test_replenish_is_bounded() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(any::<u64>(), 0u64..1_000_000, any::<u64>(), any::<u32>(), any::<u32>()),
            |(full, refill_interval, remaining, checkpoint, elapsed)| {
                let allowance = Allowance {
                    full,
                    refill_interval,
                };
                let checkpoint = u64::from(checkpoint);
                let balance = allowance.replenish(remaining, checkpoint, checkpoint + u64::from(elapsed));
                prop_assert!(balance <= full);
                prop_assert!(balance >= remaining.min(full));
                Ok(())
            },
        )
        .unwrap();
}
