//! # Worker Roles
//!
//! Creators and receivers are two independent implementations of [`Worker`].
//! What they share (identity, processed counter, simulated work, exit
//! logging) lives in `WorkerCore`, which each role owns by composition.
//!
//! ```text
//!   Creator loop                    Receiver loop
//!   ────────────                    ─────────────
//!   spin (work interval)            note get_request
//!   Record::new(id.count)           pipe.get ──► Cancelled? stop
//!   set_put_request                 set_get_complete, set_get_request
//!   pipe.put ──► Cancelled? stop    spin (work interval)
//!   set_put_complete                set_receiver_stamp(id.count)
//!                                   publish to collector
//! ```
//!
//! A `DoubleStamp` ends only the worker that hit it; it is logged with the
//! full record. Cancellation ends a worker silently.

mod creator;
mod receiver;

use std::hint;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error};

use crate::cancel::CancelToken;
use crate::error::PipeError;
use crate::pipe::Pipe;
use crate::record::Record;

pub use creator::Creator;
pub use receiver::Receiver;

/// Why a worker loop ended.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerExit {
    /// The run was cancelled. Normal termination.
    Cancelled,
    /// A logic error stopped this worker.
    Failed(PipeError),
}

impl WorkerExit {
    /// Returns true if the worker stopped because of a logic error.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// A role that runs an unbounded loop against a shared pipe.
pub trait Worker: Send {
    /// Display name, e.g. `Creator #3`.
    fn name(&self) -> String;

    /// Items this worker has processed so far.
    fn processed(&self) -> u64;

    /// Runs until `cancel` fires or a logic error occurs.
    fn run(&mut self, cancel: &CancelToken) -> WorkerExit;
}

/// Hands out identity numbers for one role.
///
/// The harness owns one per role and passes it to each worker it builds.
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: AtomicUsize,
}

impl IdAllocator {
    /// Creates an allocator starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused id.
    pub fn allocate(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub fn issued(&self) -> usize {
        self.next.load(Ordering::Relaxed)
    }
}

/// Simulated processing time, burned as a CPU-bound busy-wait.
///
/// Each call draws uniformly from `[interval/2, interval + interval/2]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Workload {
    interval: Duration,
}

impl Workload {
    /// Creates a workload centered on `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// A workload that does no simulated work.
    #[must_use]
    pub const fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The base interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Draws one work period.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Duration {
        let half = self.interval / 2;
        rng.gen_range(half..=self.interval + half)
    }

    /// Busy-waits for one drawn work period and returns it.
    ///
    /// Stops early if `cancel` fires; the caller notices at its next pipe
    /// call.
    pub fn spin<R: Rng>(&self, rng: &mut R, cancel: &CancelToken) -> Duration {
        let period = self.draw(rng);
        let start = Instant::now();
        while start.elapsed() < period {
            if cancel.is_cancelled() {
                break;
            }
            hint::spin_loop();
        }
        period
    }
}

/// State every worker carries, whatever its role.
pub(crate) struct WorkerCore {
    id: usize,
    processed: u64,
    pipe: Arc<Pipe<Arc<Record>>>,
    workload: Workload,
    rng: StdRng,
    origin: Instant,
}

impl WorkerCore {
    pub(crate) fn new(
        ids: &IdAllocator,
        pipe: Arc<Pipe<Arc<Record>>>,
        workload: Workload,
        origin: Instant,
    ) -> Self {
        Self {
            id: ids.allocate(),
            processed: 0,
            pipe,
            workload,
            rng: StdRng::from_entropy(),
            origin,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub(crate) fn processed(&self) -> u64 {
        self.processed
    }

    #[inline]
    pub(crate) fn pipe(&self) -> &Pipe<Arc<Record>> {
        &self.pipe
    }

    /// `"<id>.<processed>"`, unique across all workers of one role.
    pub(crate) fn stamp(&self) -> String {
        format!("{}.{}", self.id, self.processed)
    }

    pub(crate) fn count_processed(&mut self) {
        self.processed += 1;
    }

    pub(crate) fn simulate_work(&mut self, cancel: &CancelToken) {
        self.workload.spin(&mut self.rng, cancel);
    }

    /// Turns the error that ended a loop into an exit cause, logging
    /// failures with full record context.
    pub(crate) fn exit(&self, name: &str, err: PipeError) -> WorkerExit {
        if let PipeError::DoubleStamp { record, .. } = &err {
            error!(
                worker = %name,
                record = %record.display(self.origin),
                "{err}; {name} shutting down"
            );
        } else {
            debug!(worker = %name, processed = self.processed, "cancelled, stopping");
            return WorkerExit::Cancelled;
        }
        WorkerExit::Failed(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::Strategy;

    #[test]
    fn test_id_allocator_is_monotonic() {
        let ids = IdAllocator::new();
        assert_eq!(ids.allocate(), 0);
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);
        assert_eq!(ids.issued(), 3);
    }

    #[test]
    fn test_workload_draw_range() {
        let workload = Workload::new(Duration::from_millis(20));
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..1000 {
            let period = workload.draw(&mut rng);
            assert!(period >= Duration::from_millis(10));
            assert!(period <= Duration::from_millis(30));
        }
    }

    #[test]
    fn test_zero_workload_does_not_spin() {
        let workload = Workload::none();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(workload.spin(&mut rng, &CancelToken::new()), Duration::ZERO);
    }

    #[test]
    fn test_spin_stops_on_cancel() {
        let workload = Workload::new(Duration::from_secs(60));
        let mut rng = StdRng::seed_from_u64(3);
        let cancel = CancelToken::new();
        cancel.cancel();

        let start = Instant::now();
        workload.spin(&mut rng, &cancel);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stamp_tracks_processed_count() {
        let ids = IdAllocator::new();
        let _skip = ids.allocate();
        let pipe = Arc::new(Pipe::new(1, Strategy::CountedPermit));
        let mut core = WorkerCore::new(&ids, pipe, Workload::none(), Instant::now());

        assert_eq!(core.stamp(), "1.0");
        core.count_processed();
        core.count_processed();
        assert_eq!(core.stamp(), "1.2");
        assert_eq!(core.processed(), 2);
    }

    #[test]
    fn test_exit_classifies_errors() {
        let ids = IdAllocator::new();
        let pipe = Arc::new(Pipe::new(1, Strategy::LockedSpin));
        let core = WorkerCore::new(&ids, pipe, Workload::none(), Instant::now());

        assert_eq!(core.exit("Creator #0", PipeError::Cancelled), WorkerExit::Cancelled);

        let rec = Record::new("0.0");
        rec.set_receiver_stamp("0.0").unwrap();
        let err = rec.set_receiver_stamp("1.0").unwrap_err();
        assert!(core.exit("Receiver #0", err).is_failure());
    }
}
