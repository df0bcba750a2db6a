//! The producing role.

use std::sync::Arc;
use std::time::Instant;

use super::{IdAllocator, Worker, WorkerCore, WorkerExit, Workload};
use crate::cancel::CancelToken;
use crate::error::PipeResult;
use crate::pipe::Pipe;
use crate::record::Record;

/// Synthesizes records and puts them on the pipe.
///
/// Each cycle burns one simulated work period before building the record,
/// then stamps the put-request and put-complete instants around `put`.
pub struct Creator {
    core: WorkerCore,
}

impl Creator {
    /// Creates a creator with the next id from `ids`.
    ///
    /// `origin` is the shared run-start instant used when logging records.
    #[must_use]
    pub fn new(
        ids: &IdAllocator,
        pipe: Arc<Pipe<Arc<Record>>>,
        workload: Workload,
        origin: Instant,
    ) -> Self {
        Self {
            core: WorkerCore::new(ids, pipe, workload, origin),
        }
    }

    /// This creator's identity number.
    #[must_use]
    pub fn id(&self) -> usize {
        self.core.id()
    }

    /// One pass of the loop: create, stamp, put, stamp.
    fn cycle(&mut self, cancel: &CancelToken) -> PipeResult<()> {
        self.core.simulate_work(cancel);

        let record = Arc::new(Record::new(self.core.stamp()));
        self.core.count_processed();

        record.set_put_request(Instant::now())?;
        self.core.pipe().put(Arc::clone(&record), cancel)?;
        record.set_put_complete(Instant::now())?;
        Ok(())
    }
}

impl Worker for Creator {
    fn name(&self) -> String {
        format!("Creator #{}", self.core.id())
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::Strategy;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_creator_fills_pipe_then_stops_on_cancel() {
        for strategy in Strategy::ALL {
            let pipe = Arc::new(Pipe::new(4, strategy));
            let ids = IdAllocator::new();
            let origin = Instant::now();
            let cancel = CancelToken::new();

            let mut creator = Creator::new(&ids, Arc::clone(&pipe), Workload::none(), origin);
            assert_eq!(creator.name(), "Creator #0");

            let handle = {
                let cancel = cancel.clone();
                thread::spawn(move || {
                    let exit = creator.run(&cancel);
                    (exit, creator.processed())
                })
            };

            // The fifth put is parked on the full pipe.
            let deadline = Instant::now() + Duration::from_secs(5);
            while pipe.waiting() == 0 {
                assert!(Instant::now() < deadline, "creator never filled the pipe");
                thread::yield_now();
            }
            assert_eq!(pipe.len(), 4);
            cancel.cancel();
            pipe.wake_all();

            let (exit, processed) = handle.join().unwrap();
            assert_eq!(exit, WorkerExit::Cancelled);
            // Four accepted, plus the one that was waiting when cancelled.
            assert_eq!(processed, 5);

            let drain = CancelToken::new();
            for expected in 0..4 {
                let rec = pipe.get(&drain).unwrap();
                assert_eq!(rec.creator_stamp(), format!("0.{expected}"));
                assert!(rec.put_request().is_some());
                assert!(rec.put_complete().is_some());
                assert!(rec.put_request() <= rec.put_complete());
            }
        }
    }
}
