//! Integration tests for the pipe under real thread contention.
//!
//! Every scenario runs against both strategies.

use pipestudy_core::{CancelToken, Pipe, PipeError, Strategy};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Polls until `expected` callers are parked on `pipe`, or panics.
fn until_waiting<T>(pipe: &Pipe<T>, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while pipe.waiting() < expected {
        assert!(Instant::now() < deadline, "caller never started waiting");
        thread::yield_now();
    }
}

/// Runs `producers` threads putting `per_producer` items each and
/// `consumers` threads sharing the gets, then returns everything received.
fn run_mpmc(
    strategy: Strategy,
    capacity: usize,
    producers: usize,
    consumers: usize,
    per_producer: usize,
) -> Vec<(usize, usize)> {
    let pipe = Arc::new(Pipe::new(capacity, strategy));
    let cancel = CancelToken::new();
    let total = producers * per_producer;
    let claimed = Arc::new(AtomicUsize::new(0));

    let producer_handles: Vec<_> = (0..producers)
        .map(|p| {
            let pipe = Arc::clone(&pipe);
            let cancel = cancel.clone();
            thread::spawn(move || {
                for i in 0..per_producer {
                    pipe.put((p, i), &cancel).unwrap();
                }
            })
        })
        .collect();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let pipe = Arc::clone(&pipe);
            let cancel = cancel.clone();
            let claimed = Arc::clone(&claimed);
            thread::spawn(move || {
                let mut received = Vec::new();
                while claimed.fetch_add(1, Ordering::Relaxed) < total {
                    received.push(pipe.get(&cancel).unwrap());
                }
                received
            })
        })
        .collect();

    for h in producer_handles {
        h.join().unwrap();
    }
    let mut all = Vec::with_capacity(total);
    for h in consumer_handles {
        all.extend(h.join().unwrap());
    }

    assert!(pipe.is_empty(), "{strategy}: pipe should be drained");
    assert_eq!(pipe.waiting(), 0);
    let stats = pipe.stats();
    assert_eq!(stats.puts as usize, total);
    assert_eq!(stats.gets as usize, total);
    all
}

#[test]
fn test_every_item_retrieved_exactly_once() {
    let shapes = [(1, 1, 1), (4, 4, 1), (3, 5, 2), (8, 2, 3), (2, 8, 16), (6, 6, 20)];

    for strategy in Strategy::ALL {
        for (producers, consumers, capacity) in shapes {
            let per_producer = 500;
            let received = run_mpmc(strategy, capacity, producers, consumers, per_producer);

            assert_eq!(received.len(), producers * per_producer);
            let unique: HashSet<_> = received.iter().copied().collect();
            assert_eq!(
                unique.len(),
                received.len(),
                "{strategy} M={producers} K={consumers} N={capacity}: duplicate item"
            );
            for p in 0..producers {
                for i in 0..per_producer {
                    assert!(unique.contains(&(p, i)), "{strategy}: lost item ({p}, {i})");
                }
            }
        }
    }
}

#[test]
fn test_single_producer_single_consumer_is_fifo() {
    for strategy in Strategy::ALL {
        let received = run_mpmc(strategy, 4, 1, 1, 5_000);
        let expected: Vec<_> = (0..5_000).map(|i| (0, i)).collect();
        assert_eq!(received, expected, "{strategy}: order broken");
    }
}

#[test]
fn test_per_producer_order_with_single_consumer() {
    for strategy in Strategy::ALL {
        let received = run_mpmc(strategy, 3, 4, 1, 1_000);

        let mut next = [0usize; 4];
        for (p, i) in received {
            assert_eq!(i, next[p], "{strategy}: producer {p} reordered");
            next[p] += 1;
        }
    }
}

#[test]
fn test_capacity_one_put_waits_for_get() {
    for strategy in Strategy::ALL {
        let pipe = Arc::new(Pipe::new(1, strategy));
        let cancel = CancelToken::new();

        pipe.put("A", &cancel).unwrap();

        let second = {
            let pipe = Arc::clone(&pipe);
            let cancel = cancel.clone();
            thread::spawn(move || pipe.put("B", &cancel))
        };

        until_waiting(&pipe, 1);
        assert!(!second.is_finished(), "{strategy}: put B completed on a full pipe");
        assert_eq!(pipe.len(), 1);

        assert_eq!(pipe.get(&cancel).unwrap(), "A");
        second.join().unwrap().unwrap();
        assert_eq!(pipe.get(&cancel).unwrap(), "B");
        assert!(pipe.is_empty());
    }
}

#[test]
fn test_capacity_three_concurrent_producers() {
    for strategy in Strategy::ALL {
        let pipe = Arc::new(Pipe::new(3, strategy));
        let cancel = CancelToken::new();

        let handles: Vec<_> = (0..3)
            .map(|p| {
                let pipe = Arc::clone(&pipe);
                let cancel = cancel.clone();
                thread::spawn(move || pipe.put(p, &cancel))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        assert_eq!(pipe.len(), 3);
        assert_eq!(pipe.cursors(), (0, 0));

        let got: HashSet<i32> = (0..3).map(|_| pipe.get(&cancel).unwrap()).collect();
        assert_eq!(got, HashSet::from([0, 1, 2]));
        assert!(pipe.is_empty());
    }
}

#[test]
fn test_cancel_blocked_put_on_full_pipe() {
    for strategy in Strategy::ALL {
        let pipe = Arc::new(Pipe::new(2, strategy));
        let fill = CancelToken::new();
        pipe.put(10, &fill).unwrap();
        pipe.put(11, &fill).unwrap();
        let before = pipe.cursors();

        let cancel = CancelToken::new();
        let blocked = {
            let pipe = Arc::clone(&pipe);
            let cancel = cancel.clone();
            thread::spawn(move || pipe.put(12, &cancel))
        };

        until_waiting(&pipe, 1);
        let start = Instant::now();
        cancel.cancel();
        pipe.wake_all();

        assert_eq!(blocked.join().unwrap(), Err(PipeError::Cancelled));
        assert!(
            start.elapsed() < Duration::from_millis(250),
            "{strategy}: cancellation was not prompt"
        );

        // Nothing moved.
        assert_eq!(pipe.len(), 2);
        assert_eq!(pipe.cursors(), before);
        assert_eq!(pipe.get(&fill).unwrap(), 10);
        assert_eq!(pipe.get(&fill).unwrap(), 11);

        // The pipe still works after the cancelled call.
        pipe.put(13, &fill).unwrap();
        assert_eq!(pipe.get(&fill).unwrap(), 13);
    }
}

#[test]
fn test_cancel_queued_producers_behind_spinning_one() {
    // Locked-Spin: the second producer is stuck on the producer lock, not on
    // the occupancy counter. It must still observe cancellation.
    let pipe = Arc::new(Pipe::new(1, Strategy::LockedSpin));
    let cancel = CancelToken::new();
    pipe.put(0, &cancel).unwrap();

    let handles: Vec<_> = (1..=2)
        .map(|i| {
            let pipe = Arc::clone(&pipe);
            let cancel = cancel.clone();
            thread::spawn(move || pipe.put(i, &cancel))
        })
        .collect();

    // One producer spins on the counter, the other is queued on the lock.
    until_waiting(&pipe, 1);
    cancel.cancel();
    for h in handles {
        assert_eq!(h.join().unwrap(), Err(PipeError::Cancelled));
    }
    assert_eq!(pipe.len(), 1);
}

#[test]
fn test_occupancy_and_cursors_stay_in_bounds() {
    for strategy in Strategy::ALL {
        let capacity = 5;
        let pipe = Arc::new(Pipe::new(capacity, strategy));
        let done = Arc::new(AtomicBool::new(false));

        let monitor = {
            let pipe = Arc::clone(&pipe);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut samples = 0u64;
                while !done.load(Ordering::Acquire) {
                    let len = pipe.len();
                    let (write, read) = pipe.cursors();
                    assert!(len <= capacity, "occupancy {len} exceeds {capacity}");
                    assert!(write < capacity && read < capacity);
                    samples += 1;
                }
                samples
            })
        };

        let received = run_mpmc_on(&pipe, 4, 4, 2_000);
        done.store(true, Ordering::Release);

        assert!(monitor.join().unwrap() > 0);
        assert_eq!(received, 8_000);
    }
}

/// Like `run_mpmc` but on a caller-owned pipe; returns the number received.
fn run_mpmc_on(pipe: &Arc<Pipe<usize>>, producers: usize, consumers: usize, per: usize) -> usize {
    let cancel = CancelToken::new();
    let total = producers * per;
    let claimed = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..producers {
        let pipe = Arc::clone(pipe);
        let cancel = cancel.clone();
        handles.push(thread::spawn(move || {
            for i in 0..per {
                pipe.put(i, &cancel).unwrap();
            }
            0
        }));
    }
    for _ in 0..consumers {
        let pipe = Arc::clone(pipe);
        let cancel = cancel.clone();
        let claimed = Arc::clone(&claimed);
        handles.push(thread::spawn(move || {
            let mut n = 0;
            while claimed.fetch_add(1, Ordering::Relaxed) < total {
                pipe.get(&cancel).unwrap();
                n += 1;
            }
            n
        }));
    }

    handles.into_iter().map(|h| h.join().unwrap()).sum()
}

#[test]
fn test_locked_spin_never_hands_off_slots() {
    let pipe = Arc::new(Pipe::new(4, Strategy::LockedSpin));
    assert_eq!(run_mpmc_on(&pipe, 8, 8, 5_000), 40_000);
    assert_eq!(pipe.stats().handoff_waits, 0);
}

#[test]
fn test_counted_permit_busy_waits_are_only_handoffs() {
    // Small capacity and many peers on each side, so consumers regularly
    // claim a slot whose producer is still mid-copy.
    let pipe = Arc::new(Pipe::new(4, Strategy::CountedPermit));
    assert_eq!(run_mpmc_on(&pipe, 8, 8, 5_000), 40_000);

    let stats = pipe.stats();
    assert_eq!(stats.spin_polls, 0);
    assert_eq!(stats.busy_waits(), stats.handoff_waits);
    assert_eq!(stats.puts, 40_000);
    assert_eq!(stats.gets, 40_000);
}
