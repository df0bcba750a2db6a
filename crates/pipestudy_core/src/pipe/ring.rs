//! # Slot Ring
//!
//! The shared state behind a pipe: `N` slots, a write cursor, a read cursor
//! and the occupancy counter. Only the access strategies touch it.
//!
//! ## Safety Note
//!
//! Slots are `UnsafeCell`s so that a producer and a consumer can copy into
//! and out of different slots at the same time without a lock. Every slot
//! carries a small state machine, and the state grants exclusive access to
//! the cell:
//!
//! ```text
//!   EMPTY ──(producer CAS)──► WRITING ──store──► FULL
//!     ▲                                           │
//!     └──store── READING ◄──(consumer CAS)────────┘
//! ```
//!
//! Under correct flow control a claimed slot is already in the state the
//! claimant needs. The only exception is a Counted-Permit peer from the
//! previous lap that has claimed the same index but is still mid-copy. The
//! claimant then waits for that copy to finish (the handoff wait).

#![allow(unsafe_code)]

use std::cell::UnsafeCell;
use std::hint;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread;

const EMPTY: u8 = 0;
const WRITING: u8 = 1;
const FULL: u8 = 2;
const READING: u8 = 3;

/// Spins before the handoff wait starts yielding the time slice.
const HANDOFF_SPINS: u64 = 64;

struct Slot<T> {
    state: AtomicU8,
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Moves the slot from `from` to `to`, waiting out a peer's copy.
    ///
    /// Returns the number of failed attempts.
    fn claim(&self, from: u8, to: u8) -> u64 {
        let mut retries = 0u64;
        while self
            .state
            .compare_exchange(from, to, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            retries += 1;
            if retries <= HANDOFF_SPINS {
                hint::spin_loop();
            } else {
                thread::yield_now();
            }
        }
        retries
    }
}

/// Fixed-capacity circular storage with `in`/`out` cursors and occupancy.
pub(crate) struct SlotRing<T> {
    slots: Box<[Slot<T>]>,
    write_cursor: AtomicUsize,
    read_cursor: AtomicUsize,
    occupancy: AtomicUsize,
}

// SAFETY: values only move between threads through the slot state machine,
// which hands each cell to exactly one thread at a time.
unsafe impl<T: Send> Send for SlotRing<T> {}
// SAFETY: see above; shared access never yields `&T` to two threads.
unsafe impl<T: Send> Sync for SlotRing<T> {}

impl<T> SlotRing<T> {
    /// Creates an empty ring.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    pub(crate) fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            write_cursor: AtomicUsize::new(0),
            read_cursor: AtomicUsize::new(0),
            occupancy: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn occupancy(&self) -> usize {
        self.occupancy.load(Ordering::Acquire)
    }

    /// Current `(in, out)` cursor positions, both in `[0, capacity)`.
    #[inline]
    pub(crate) fn cursors(&self) -> (usize, usize) {
        (
            self.write_cursor.load(Ordering::Acquire),
            self.read_cursor.load(Ordering::Acquire),
        )
    }

    /// Atomically claims the next write index and advances `in` modulo N.
    #[inline]
    pub(crate) fn claim_write_index(&self) -> usize {
        Self::advance(&self.write_cursor, self.capacity())
    }

    /// Atomically claims the next read index and advances `out` modulo N.
    #[inline]
    pub(crate) fn claim_read_index(&self) -> usize {
        Self::advance(&self.read_cursor, self.capacity())
    }

    #[inline]
    pub(crate) fn increment_occupancy(&self) {
        self.occupancy.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn decrement_occupancy(&self) {
        self.occupancy.fetch_sub(1, Ordering::AcqRel);
    }

    /// Stores `item` into a slot previously claimed for writing.
    ///
    /// Returns the handoff retries spent waiting for the slot to drain.
    pub(crate) fn write(&self, index: usize, item: T) -> u64 {
        let slot = &self.slots[index];
        let retries = slot.claim(EMPTY, WRITING);
        // SAFETY: the WRITING state gives this thread sole access to the cell,
        // and EMPTY guaranteed it held no initialized value.
        unsafe {
            (*slot.value.get()).write(item);
        }
        slot.state.store(FULL, Ordering::Release);
        retries
    }

    /// Moves the item out of a slot previously claimed for reading, along
    /// with the handoff retries spent waiting for it to fill.
    pub(crate) fn take(&self, index: usize) -> (T, u64) {
        let slot = &self.slots[index];
        let retries = slot.claim(FULL, READING);
        // SAFETY: the READING state gives this thread sole access to the cell,
        // and FULL guaranteed it held an initialized value. Leaving the slot
        // EMPTY afterwards means nobody reads the moved-out bits again.
        let item = unsafe { (*slot.value.get()).assume_init_read() };
        slot.state.store(EMPTY, Ordering::Release);
        (item, retries)
    }

    fn advance(cursor: &AtomicUsize, capacity: usize) -> usize {
        match cursor.fetch_update(Ordering::AcqRel, Ordering::Acquire, |x| {
            Some((x + 1) % capacity)
        }) {
            Ok(previous) | Err(previous) => previous,
        }
    }
}

impl<T> Drop for SlotRing<T> {
    fn drop(&mut self) {
        for slot in self.slots.iter_mut() {
            if *slot.state.get_mut() == FULL {
                // SAFETY: FULL slots hold an initialized value and `&mut self`
                // rules out any concurrent access.
                unsafe {
                    slot.value.get_mut().assume_init_drop();
                }
            }
        }
    }
}
