//! # Harness Error Types
//!
//! Everything that can stop a run before it produces a report.

use std::io;

use thiserror::Error;

/// Errors raised while configuring or launching a run.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// A run parameter is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] io::Error),

    /// A config file is not valid TOML for a run.
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// The OS refused to start a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
