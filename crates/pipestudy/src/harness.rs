//! # Run Orchestration
//!
//! Owns the whole lifetime of one experiment:
//!
//! 1. build the shared pipe and the run-start origin
//! 2. spawn one named thread per creator
//! 3. optionally give creators a head start of one work interval
//! 4. spawn one named thread per receiver
//! 5. sleep for the run duration
//! 6. cancel, wake suspended waiters, join everyone
//! 7. drain the collector into a [`RunReport`]
//!
//! Shutdown is cooperative. No thread is ever interrupted.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::unbounded;
use pipestudy_core::{CancelToken, Creator, IdAllocator, Pipe, Receiver, Record, Worker, WorkerExit};
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::report::RunReport;

/// How one worker finished.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerOutcome {
    /// Display name, e.g. `Receiver #4`.
    pub name: String,
    /// Items the worker processed.
    pub processed: u64,
    /// Why its loop ended.
    pub exit: WorkerExit,
}

/// Spawned worker threads awaiting their join.
type Crew = Vec<(String, JoinHandle<WorkerOutcome>)>;

/// Runs experiments.
pub struct Harness;

impl Harness {
    /// Executes one timed run and collects its results.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if `config` fails validation and
    /// [`HarnessError::Spawn`] if a worker thread cannot be started. Threads
    /// already running are cancelled and joined before a spawn error is
    /// returned.
    pub fn run(config: &RunConfig) -> HarnessResult<RunReport> {
        config.validate()?;

        let pipe: Arc<Pipe<Arc<Record>>> = Arc::new(Pipe::new(config.capacity, config.strategy));
        let cancel = CancelToken::new();
        let (results_tx, results_rx) = unbounded();
        let workload = config.workload();

        info!(
            strategy = %config.strategy,
            capacity = config.capacity,
            creators = config.creators,
            receivers = config.receivers,
            work_interval_ms = config.work_interval_ms,
            run_duration_ms = config.run_duration_ms,
            "run starting"
        );

        let origin = Instant::now();
        let creator_ids = IdAllocator::new();
        let receiver_ids = IdAllocator::new();
        let mut crew: Crew = Vec::with_capacity(config.creators + config.receivers);

        for _ in 0..config.creators {
            let creator = Creator::new(&creator_ids, Arc::clone(&pipe), workload, origin);
            if let Err(err) = Self::launch(&mut crew, creator, &cancel) {
                return Err(Self::abort(&pipe, &cancel, crew, err));
            }
        }

        if config.head_start {
            thread::sleep(config.work_interval());
        }

        for _ in 0..config.receivers {
            let receiver = Receiver::new(
                &receiver_ids,
                Arc::clone(&pipe),
                workload,
                origin,
                results_tx.clone(),
            );
            if let Err(err) = Self::launch(&mut crew, receiver, &cancel) {
                return Err(Self::abort(&pipe, &cancel, crew, err));
            }
        }
        drop(results_tx);

        thread::sleep(config.run_duration());

        cancel.cancel();
        pipe.wake_all();
        let workers = Self::join(crew);
        let elapsed = origin.elapsed();

        let records: Vec<Arc<Record>> = results_rx.try_iter().collect();
        let failures = workers.iter().filter(|w| w.exit.is_failure()).count();

        info!(
            records = records.len(),
            elapsed_ms = elapsed.as_millis(),
            failures,
            "run finished"
        );

        Ok(RunReport {
            config: config.clone(),
            elapsed,
            records,
            workers,
            stats: pipe.stats(),
            left_in_pipe: pipe.len(),
        })
    }

    /// Spawns `worker` on a thread named after it.
    fn launch<W>(crew: &mut Crew, mut worker: W, cancel: &CancelToken) -> io::Result<()>
    where
        W: Worker + 'static,
    {
        let name = worker.name();
        let cancel = cancel.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            debug!(worker = %worker.name(), "started");
            let exit = worker.run(&cancel);
            WorkerOutcome {
                name: worker.name(),
                processed: worker.processed(),
                exit,
            }
        })?;

        crew.push((name, handle));
        Ok(())
    }

    /// Stops a partially launched run after a spawn failure.
    fn abort(pipe: &Pipe<Arc<Record>>, cancel: &CancelToken, crew: Crew, err: io::Error) -> HarnessError {
        error!(error = %err, launched = crew.len(), "worker spawn failed, aborting run");
        cancel.cancel();
        pipe.wake_all();
        Self::join(crew);
        HarnessError::Spawn(err)
    }

    fn join(crew: Crew) -> Vec<WorkerOutcome> {
        crew.into_iter()
            .filter_map(|(name, handle)| match handle.join() {
                Ok(outcome) => Some(outcome),
                Err(_) => {
                    error!(worker = %name, "worker thread panicked");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipestudy_core::Strategy;

    fn quick(strategy: Strategy) -> RunConfig {
        RunConfig {
            capacity: 4,
            strategy,
            creators: 3,
            receivers: 2,
            work_interval_ms: 1,
            run_duration_ms: 150,
            head_start: true,
        }
    }

    #[test]
    fn test_run_rejects_invalid_config() {
        let config = RunConfig { capacity: 0, ..quick(Strategy::LockedSpin) };
        assert!(matches!(Harness::run(&config), Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_every_worker_reports_cancelled() {
        for strategy in Strategy::ALL {
            let report = Harness::run(&quick(strategy)).unwrap();

            assert_eq!(report.workers.len(), 5);
            assert!(report.workers.iter().all(|w| w.exit == WorkerExit::Cancelled));
            assert!(report.failures().next().is_none());
        }
    }

    #[test]
    fn test_worker_names_per_role() {
        let report = Harness::run(&quick(Strategy::CountedPermit)).unwrap();
        let names: Vec<&str> = report.workers.iter().map(|w| w.name.as_str()).collect();

        assert_eq!(
            names,
            ["Creator #0", "Creator #1", "Creator #2", "Receiver #0", "Receiver #1"]
        );
    }
}
