//! Wait instrumentation shared by both strategies.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Snapshot of a pipe's wait counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipeStats {
    /// Failed fullness/emptiness polls (Locked-Spin only).
    pub spin_polls: u64,
    /// Permit acquisitions that had to suspend (Counted-Permit only).
    pub blocking_waits: u64,
    /// Failed slot claims while a peer was still copying into or out of the
    /// same slot. Only Counted-Permit lets peers overlap on a slot.
    pub handoff_waits: u64,
    /// Completed `put` calls.
    pub puts: u64,
    /// Completed `get` calls.
    pub gets: u64,
}

impl PipeStats {
    /// All busy-wait iterations, whichever part of the pipe they came from.
    #[inline]
    #[must_use]
    pub const fn busy_waits(&self) -> u64 {
        self.spin_polls + self.handoff_waits
    }
}

#[derive(Default)]
pub(crate) struct WaitCounters {
    spin_polls: AtomicU64,
    blocking_waits: AtomicU64,
    handoff_waits: AtomicU64,
    puts: AtomicU64,
    gets: AtomicU64,
    waiting: AtomicUsize,
}

impl WaitCounters {
    #[inline]
    pub(crate) fn add_spin_polls(&self, polls: u64) {
        if polls > 0 {
            self.spin_polls.fetch_add(polls, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_blocking_wait(&self) {
        self.blocking_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_handoff_waits(&self, retries: u64) {
        if retries > 0 {
            self.handoff_waits.fetch_add(retries, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn add_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a caller as parked on a full or empty buffer.
    #[inline]
    pub(crate) fn enter_wait(&self) {
        self.waiting.fetch_add(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn leave_wait(&self) {
        self.waiting.fetch_sub(1, Ordering::AcqRel);
    }

    #[inline]
    pub(crate) fn waiting(&self) -> usize {
        self.waiting.load(Ordering::Acquire)
    }

    pub(crate) fn snapshot(&self) -> PipeStats {
        PipeStats {
            spin_polls: self.spin_polls.load(Ordering::Relaxed),
            blocking_waits: self.blocking_waits.load(Ordering::Relaxed),
            handoff_waits: self.handoff_waits.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
        }
    }
}
