//! # PIPESTUDY Core Engine
//!
//! A fixed-capacity shared buffer ("the pipe") hammered by many producer
//! threads (creators) and many consumer threads (receivers), instrumented so
//! every item carries the instants it was requested and handed over on both
//! sides.
//!
//! ## Strategies
//!
//! ```text
//!   LOCKED-SPIN                          COUNTED-PERMIT
//!   ┌───────────────┐                    ┌───────────────┐
//!   │ producer lock │── spin while full  │ producer pool │── suspend (N permits)
//!   └───────┬───────┘                    └───────┬───────┘
//!           ▼                                    ▼
//!   ┌───────────────────────┐            ┌───────────────────────┐
//!   │ slots[in], in = in+1%N│            │ fetch-add claim of `in`│
//!   └───────┬───────────────┘            └───────┬───────────────┘
//!           ▼                                    ▼
//!   ┌───────────────┐                    ┌───────────────┐
//!   │ consumer lock │── spin while empty │ consumer pool │── suspend (0 permits)
//!   └───────────────┘                    └───────────────┘
//! ```
//!
//! Locked-Spin is the deliberately bad baseline: a producer spins on a full
//! buffer *while holding the producer lock*. Counted-Permit suspends on a
//! full or empty buffer. Its only busy-wait is the short slot handoff between
//! overlapping peers, reported separately as `PipeStats::handoff_waits`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pipestudy_core::{CancelToken, Pipe, Strategy};
//!
//! let pipe = Pipe::new(20, Strategy::CountedPermit);
//! let cancel = CancelToken::new();
//! pipe.put(42, &cancel)?;
//! assert_eq!(pipe.get(&cancel)?, 42);
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cancel;
pub mod error;
pub mod pipe;
pub mod record;
pub mod worker;

pub use cancel::CancelToken;
pub use error::{PipeError, PipeResult, StampField};
pub use pipe::{ParseStrategyError, Pipe, PipeStats, Strategy};
pub use record::{Record, RecordDisplay};
pub use worker::{Creator, IdAllocator, Receiver, Worker, WorkerExit, Workload};
