//! The consuming role.

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;

use super::{IdAllocator, Worker, WorkerCore, WorkerExit, Workload};
use crate::cancel::CancelToken;
use crate::error::{PipeError, PipeResult};
use crate::pipe::Pipe;
use crate::record::Record;

/// Takes records off the pipe, stamps the get side and publishes them.
///
/// The get-request instant is noted before calling `get` but only committed
/// after the get-complete instant, once the record is in hand.
pub struct Receiver {
    core: WorkerCore,
    results: Sender<Arc<Record>>,
}

impl Receiver {
    /// Creates a receiver with the next id from `ids`.
    ///
    /// Completed records are sent to `results`. `origin` is the shared
    /// run-start instant used when logging records.
    #[must_use]
    pub fn new(
        ids: &IdAllocator,
        pipe: Arc<Pipe<Arc<Record>>>,
        workload: Workload,
        origin: Instant,
        results: Sender<Arc<Record>>,
    ) -> Self {
        Self {
            core: WorkerCore::new(ids, pipe, workload, origin),
            results,
        }
    }

    /// This receiver's identity number.
    #[must_use]
    pub fn id(&self) -> usize {
        self.core.id()
    }

    /// One pass of the loop: get, stamp, work, stamp, publish.
    fn cycle(&mut self, cancel: &CancelToken) -> PipeResult<()> {
        let requested = Instant::now();
        let record = self.core.pipe().get(cancel)?;
        record.set_get_complete(Instant::now())?;
        record.set_get_request(requested)?;

        self.core.simulate_work(cancel);

        record.set_receiver_stamp(self.core.stamp())?;
        self.core.count_processed();

        // A dropped collector means the run is over.
        self.results.send(record).map_err(|_| PipeError::Cancelled)
    }
}

impl Worker for Receiver {
    fn name(&self) -> String {
        format!("Receiver #{}", self.core.id())
    }

    fn processed(&self) -> u64 {
        self.core.processed()
    }

    fn run(&mut self, cancel: &CancelToken) -> WorkerExit {
        loop {
            if let Err(err) = self.cycle(cancel) {
                return self.core.exit(&self.name(), err);
            }
        }
    }
}
