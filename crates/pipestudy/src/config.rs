//! # Run Configuration
//!
//! Parameters of one experiment. Loaded from an optional TOML file, then
//! overridden field by field from the command line.
//!
//! ```toml
//! capacity = 20
//! strategy = "locked-spin"
//! creators = 10
//! receivers = 10
//! work_interval_ms = 20
//! run_duration_ms = 10000
//! head_start = true
//! ```
//!
//! Missing keys take their defaults. Unknown keys are rejected.

use std::fs;
use std::path::Path;
use std::time::Duration;

use pipestudy_core::{Strategy, Workload};
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// Parameters of one timed run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of slots in the pipe.
    pub capacity: usize,
    /// Synchronization strategy.
    pub strategy: Strategy,
    /// Number of creator threads.
    pub creators: usize,
    /// Number of receiver threads.
    pub receivers: usize,
    /// Base simulated work per item, in milliseconds. 0 means no work.
    pub work_interval_ms: u64,
    /// How long workers run before cancellation, in milliseconds.
    pub run_duration_ms: u64,
    /// Start creators one work interval before receivers.
    pub head_start: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            strategy: Strategy::CountedPermit,
            creators: 10,
            receivers: 10,
            work_interval_ms: 20,
            run_duration_ms: 10_000,
            head_start: true,
        }
    }
}

impl RunConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Toml`] on malformed input and
    /// [`HarnessError::Config`] if a value is out of range.
    pub fn from_toml_str(text: &str) -> HarnessResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`RunConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks that the run can actually take place.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] naming the first offending field.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.capacity == 0 {
            return Err(HarnessError::Config("capacity must be at least 1".into()));
        }
        if self.creators == 0 {
            return Err(HarnessError::Config("at least one creator is required".into()));
        }
        if self.receivers == 0 {
            return Err(HarnessError::Config("at least one receiver is required".into()));
        }
        if self.run_duration_ms == 0 {
            return Err(HarnessError::Config("run duration must be non-zero".into()));
        }
        Ok(())
    }

    /// Base work interval.
    #[inline]
    #[must_use]
    pub const fn work_interval(&self) -> Duration {
        Duration::from_millis(self.work_interval_ms)
    }

    /// Time workers run before cancellation.
    #[inline]
    #[must_use]
    pub const fn run_duration(&self) -> Duration {
        Duration::from_millis(self.run_duration_ms)
    }

    /// Simulated work every worker of this run performs.
    #[must_use]
    pub const fn workload(&self) -> Workload {
        Workload::new(self.work_interval())
    }
}
