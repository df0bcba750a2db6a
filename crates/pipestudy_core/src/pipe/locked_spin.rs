//! # Locked-Spin Strategy
//!
//! One lock per role, and a busy-wait on the shared occupancy counter while
//! holding it. This is the "bad" baseline of the study: a producer that finds
//! the buffer full keeps every other producer from even looking at the
//! counter until it gets through. Consumers mirror producers exactly.

use std::hint;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use super::ring::SlotRing;
use super::stats::WaitCounters;
use crate::cancel::CancelToken;
use crate::error::{PipeError, PipeResult};

/// Upper bound on one timed attempt at a role lock before re-checking the
/// cancellation token.
const LOCK_RECHECK: Duration = Duration::from_millis(1);

pub(crate) struct LockedSpin {
    producer_lock: Mutex<()>,
    consumer_lock: Mutex<()>,
}

impl LockedSpin {
    pub(crate) fn new() -> Self {
        Self {
            producer_lock: Mutex::new(()),
            consumer_lock: Mutex::new(()),
        }
    }

    pub(crate) fn put<T>(
        &self,
        ring: &SlotRing<T>,
        counters: &WaitCounters,
        item: T,
        cancel: &CancelToken,
    ) -> PipeResult<()> {
        let _guard = lock_cancellable(&self.producer_lock, cancel)?;

        let capacity = ring.capacity();
        spin_while(counters, cancel, || ring.occupancy() == capacity)?;

        let index = ring.claim_write_index();
        counters.add_handoff_waits(ring.write(index, item));
        ring.increment_occupancy();
        Ok(())
    }

    pub(crate) fn get<T>(
        &self,
        ring: &SlotRing<T>,
        counters: &WaitCounters,
        cancel: &CancelToken,
    ) -> PipeResult<T> {
        let _guard = lock_cancellable(&self.consumer_lock, cancel)?;

        spin_while(counters, cancel, || ring.occupancy() == 0)?;

        let index = ring.claim_read_index();
        let (item, retries) = ring.take(index);
        counters.add_handoff_waits(retries);
        ring.decrement_occupancy();
        Ok(item)
    }
}

/// Acquires a role lock, giving up if the token fires first.
fn lock_cancellable<'a>(
    lock: &'a Mutex<()>,
    cancel: &CancelToken,
) -> PipeResult<MutexGuard<'a, ()>> {
    loop {
        if cancel.is_cancelled() {
            return Err(PipeError::Cancelled);
        }
        if let Some(guard) = lock.try_lock_for(LOCK_RECHECK) {
            return Ok(guard);
        }
    }
}

/// Tight poll loop. Never sleeps or yields; checks the token every pass.
fn spin_while(
    counters: &WaitCounters,
    cancel: &CancelToken,
    mut blocked: impl FnMut() -> bool,
) -> PipeResult<()> {
    if !blocked() {
        return Ok(());
    }

    counters.enter_wait();
    let mut polls = 1u64;
    let outcome = loop {
        if cancel.is_cancelled() {
            break Err(PipeError::Cancelled);
        }
        hint::spin_loop();
        if !blocked() {
            break Ok(());
        }
        polls += 1;
    };
    counters.leave_wait();
    // Flushed once; the poll loop itself never touches a shared counter.
    counters.add_spin_polls(polls);
    outcome
}
