//! # PIPESTUDY Runner
//!
//! Runs one experiment and prints its report.
//!
//! ```text
//! pipestudy --strategy locked-spin --capacity 5 --duration-ms 3000
//! pipestudy --config runs/slow.toml --creators 20
//! RUST_LOG=debug pipestudy
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pipestudy::{Harness, HarnessResult, RunConfig};
use pipestudy_core::Strategy;
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Bounded buffer synchronization experiment.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML file with run parameters; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of slots in the pipe
    #[arg(long)]
    capacity: Option<usize>,

    /// Synchronization strategy: locked-spin or counted-permit
    #[arg(short, long)]
    strategy: Option<Strategy>,

    /// Number of creator threads
    #[arg(long)]
    creators: Option<usize>,

    /// Number of receiver threads
    #[arg(long)]
    receivers: Option<usize>,

    /// Base simulated work per item in milliseconds
    #[arg(long)]
    work_interval_ms: Option<u64>,

    /// Run length in milliseconds
    #[arg(short, long)]
    duration_ms: Option<u64>,

    /// Start receivers at the same time as creators
    #[arg(long)]
    no_head_start: bool,
}

impl Args {
    fn into_config(self) -> HarnessResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_toml_file(path)?,
            None => RunConfig::default(),
        };

        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(creators) = self.creators {
            config.creators = creators;
        }
        if let Some(receivers) = self.receivers {
            config.receivers = receivers;
        }
        if let Some(interval) = self.work_interval_ms {
            config.work_interval_ms = interval;
        }
        if let Some(duration) = self.duration_ms {
            config.run_duration_ms = duration;
        }
        if self.no_head_start {
            config.head_start = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match Harness::run(&config) {
        Ok(report) => {
            println!("{report}");
            if report.failures().next().is_some() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
