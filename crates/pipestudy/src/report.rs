//! # Run Report
//!
//! Aggregate timing over the records a run collected, plus the console
//! rendering printed at the end of a run.
//!
//! For every complete record:
//!
//! ```text
//!   put_request ──► put_complete ······► get_complete
//!        │  creator wait  │  in buffer      ▲
//!        │                                  │
//!        │              get_request ────────┘ receiver wait
//!        └──────────── turnaround ──────────┘
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pipestudy_core::{PipeStats, Record, WorkerExit};

use crate::config::RunConfig;
use crate::harness::WorkerOutcome;

/// Everything a finished run produced.
#[derive(Clone, Debug)]
pub struct RunReport {
    /// Parameters the run used.
    pub config: RunConfig,
    /// Wall time from run start until every worker was joined.
    pub elapsed: Duration,
    /// Records the receivers published.
    pub records: Vec<Arc<Record>>,
    /// How each worker ended, creators first.
    pub workers: Vec<WorkerOutcome>,
    /// Wait counters of the shared pipe.
    pub stats: PipeStats,
    /// Items still resident in the pipe at shutdown.
    pub left_in_pipe: usize,
}

impl RunReport {
    /// Aggregate timing, or `None` when no complete record was collected.
    #[must_use]
    pub fn summary(&self) -> Option<Summary> {
        Summary::from_records(&self.records, self.elapsed)
    }

    /// Workers that stopped on a logic error.
    pub fn failures(&self) -> impl Iterator<Item = &WorkerOutcome> {
        self.workers.iter().filter(|w| w.exit.is_failure())
    }
}

/// Means over every complete record of a run, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Summary {
    /// Complete records included.
    pub count: usize,
    /// Records per second over the execution time.
    pub throughput: f64,
    /// Mean `get_complete - put_request`.
    pub mean_turnaround_ms: f64,
    /// Mean `put_complete - put_request`.
    pub mean_creator_wait_ms: f64,
    /// Mean `get_complete - get_request`.
    pub mean_receiver_wait_ms: f64,
    /// Mean `get_complete - put_complete`.
    pub mean_in_buffer_ms: f64,
}

/// Instants of one complete record.
struct Span {
    put_request: Instant,
    put_complete: Instant,
    get_request: Instant,
    get_complete: Instant,
}

impl Span {
    fn of(record: &Record) -> Option<Self> {
        Some(Self {
            put_request: record.put_request()?,
            put_complete: record.put_complete()?,
            get_request: record.get_request()?,
            get_complete: record.get_complete()?,
        })
    }
}

impl Summary {
    /// Aggregates `records` over an execution time of `elapsed`.
    ///
    /// Records missing any instant are skipped. Returns `None` if none
    /// remain.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_records(records: &[Arc<Record>], elapsed: Duration) -> Option<Self> {
        let mut count = 0usize;
        let mut turnaround = Duration::ZERO;
        let mut creator_wait = Duration::ZERO;
        let mut receiver_wait = Duration::ZERO;
        let mut in_buffer = Duration::ZERO;

        for span in records.iter().filter_map(|r| Span::of(r)) {
            count += 1;
            turnaround += span.get_complete.saturating_duration_since(span.put_request);
            creator_wait += span.put_complete.saturating_duration_since(span.put_request);
            receiver_wait += span.get_complete.saturating_duration_since(span.get_request);
            // put_complete is stamped after the put returns and can trail get_complete.
            in_buffer += span.get_complete.saturating_duration_since(span.put_complete);
        }

        if count == 0 {
            return None;
        }

        let mean_ms = |total: Duration| total.as_secs_f64() * 1000.0 / count as f64;
        let secs = elapsed.as_secs_f64();

        Some(Self {
            count,
            throughput: if secs > 0.0 { count as f64 / secs } else { 0.0 },
            mean_turnaround_ms: mean_ms(turnaround),
            mean_creator_wait_ms: mean_ms(creator_wait),
            mean_receiver_wait_ms: mean_ms(receiver_wait),
            mean_in_buffer_ms: mean_ms(in_buffer),
        })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = &self.config;

        writeln!(f, "╔══════════════════════════════════════════════════════════════════╗")?;
        writeln!(f, "║                    PIPESTUDY RUN RESULTS                         ║")?;
        writeln!(f, "╚══════════════════════════════════════════════════════════════════╝")?;
        writeln!(f)?;

        writeln!(f, "┌─ PARAMETERS ─────────────────────────────────────────────────────┐")?;
        writeln!(f, "│ Strategy:           {}", config.strategy)?;
        writeln!(f, "│ Buffer Capacity:    {}", config.capacity)?;
        writeln!(f, "│ Creators:           {}", config.creators)?;
        writeln!(f, "│ Receivers:          {}", config.receivers)?;
        writeln!(f, "│ Work Interval:      {} ms", config.work_interval_ms)?;
        writeln!(f, "│ Run Duration:       {} ms", config.run_duration_ms)?;
        writeln!(f, "│ Creator Head Start: {}", if config.head_start { "yes" } else { "no" })?;
        writeln!(f, "└──────────────────────────────────────────────────────────────────┘")?;
        writeln!(f)?;

        writeln!(f, "┌─ RESULTS ────────────────────────────────────────────────────────┐")?;
        match self.summary() {
            Some(summary) => {
                writeln!(
                    f,
                    "│ Records:            {} in {:.3} s",
                    summary.count,
                    self.elapsed.as_secs_f64()
                )?;
                writeln!(f, "│ Throughput:         {:.2} records/s", summary.throughput)?;
                writeln!(f, "│ Turnaround:         {:.3} ms", summary.mean_turnaround_ms)?;
                writeln!(f, "│ Creator Wait:       {:.3} ms", summary.mean_creator_wait_ms)?;
                writeln!(f, "│ Receiver Wait:      {:.3} ms", summary.mean_receiver_wait_ms)?;
                writeln!(f, "│ Time In Buffer:     {:.3} ms", summary.mean_in_buffer_ms)?;
            }
            None => {
                writeln!(f, "│ No results, something must have gone wrong.")?;
            }
        }
        writeln!(f, "└──────────────────────────────────────────────────────────────────┘")?;
        writeln!(f)?;

        writeln!(f, "┌─ PIPE ───────────────────────────────────────────────────────────┐")?;
        writeln!(f, "│ Puts / Gets:        {} / {}", self.stats.puts, self.stats.gets)?;
        writeln!(f, "│ Left In Pipe:       {}", self.left_in_pipe)?;
        writeln!(f, "│ Spin Polls:         {}", self.stats.spin_polls)?;
        writeln!(f, "│ Blocking Waits:     {}", self.stats.blocking_waits)?;
        writeln!(f, "│ Handoff Waits:      {}", self.stats.handoff_waits)?;
        writeln!(f, "└──────────────────────────────────────────────────────────────────┘")?;

        let mut failures = self.failures().peekable();
        if failures.peek().is_some() {
            writeln!(f)?;
            writeln!(f, "┌─ FAILURES ───────────────────────────────────────────────────────┐")?;
            for worker in failures {
                if let WorkerExit::Failed(err) = &worker.exit {
                    writeln!(f, "│ {:<19} {err}", format!("{}:", worker.name))?;
                }
            }
            writeln!(f, "└──────────────────────────────────────────────────────────────────┘")?;
        }

        Ok(())
    }
}
