//! # PIPESTUDY Harness
//!
//! Runs one timed experiment against a shared pipe and reports how long
//! records spent waiting on each side of it.
//!
//! ```text
//!   ┌──────────┐  spawn   ┌───────────┐   head start   ┌────────────┐
//!   │ RunConfig│ ───────► │ creators  │ ─────────────► │ receivers  │
//!   └──────────┘          └─────┬─────┘                └─────┬──────┘
//!                               │ put          Pipe          │ get
//!                               └──────────► [■■■□□] ────────┘
//!                                                            │ publish
//!   ┌──────────┐   join   ┌───────────┐  cancel + wake  ┌────▼──────┐
//!   │ RunReport│ ◄─────── │  Harness  │ ◄────────────── │ collector │
//!   └──────────┘          └───────────┘                 └───────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pipestudy::{Harness, RunConfig};
//!
//! let report = Harness::run(&RunConfig::default())?;
//! println!("{report}");
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod harness;
pub mod report;

pub use config::RunConfig;
pub use error::{HarnessError, HarnessResult};
pub use harness::{Harness, WorkerOutcome};
pub use report::{RunReport, Summary};
