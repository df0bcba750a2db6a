//! # Counted-Permit Strategy
//!
//! Two permit pools: producers start with `capacity` permits, consumers with
//! none. After taking a permit, a caller claims its slot with an atomic
//! fetch-and-advance of the cursor, so concurrent producers (or consumers)
//! land on distinct slots without a role lock. Waiting for space or items
//! happens by suspending inside the permit pools.
//!
//! One busy-wait remains. A permit only says that *some* slot is ready, so a
//! claimant can land on a slot whose peer from the previous lap is still
//! copying. It then waits out that copy in the ring's handoff loop, and each
//! failed attempt is counted in `PipeStats::handoff_waits`.

use super::permit::{Acquired, PermitPool};
use super::ring::SlotRing;
use super::stats::WaitCounters;
use crate::cancel::CancelToken;
use crate::error::PipeResult;

pub(crate) struct CountedPermit {
    producer_permits: PermitPool,
    consumer_permits: PermitPool,
}

impl CountedPermit {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            producer_permits: PermitPool::new(capacity),
            consumer_permits: PermitPool::new(0),
        }
    }

    pub(crate) fn put<T>(
        &self,
        ring: &SlotRing<T>,
        counters: &WaitCounters,
        item: T,
        cancel: &CancelToken,
    ) -> PipeResult<()> {
        if self.producer_permits.acquire(counters, cancel)? == Acquired::AfterWaiting {
            counters.add_blocking_wait();
        }

        // Past this point the put always completes; a claimed index is never
        // abandoned.
        let index = ring.claim_write_index();
        counters.add_handoff_waits(ring.write(index, item));
        ring.increment_occupancy();
        self.consumer_permits.release();
        Ok(())
    }

    pub(crate) fn get<T>(
        &self,
        ring: &SlotRing<T>,
        counters: &WaitCounters,
        cancel: &CancelToken,
    ) -> PipeResult<T> {
        if self.consumer_permits.acquire(counters, cancel)? == Acquired::AfterWaiting {
            counters.add_blocking_wait();
        }

        let index = ring.claim_read_index();
        let (item, retries) = ring.take(index);
        counters.add_handoff_waits(retries);
        ring.decrement_occupancy();
        self.producer_permits.release();
        Ok(item)
    }

    pub(crate) fn wake_all(&self) {
        self.producer_permits.wake_all();
        self.consumer_permits.wake_all();
    }
}
