//! # The Pipe
//!
//! A fixed-capacity circular buffer shared by every creator and receiver of a
//! run. All access goes through `put`/`get`, which delegate to the strategy
//! chosen at construction. The strategy never changes afterwards.
//!
//! ## Invariants
//!
//! - `0 <= len() <= capacity()` at all times
//! - both cursors stay in `[0, capacity())`
//! - every item put is returned by exactly one `get`
//! - a single producer feeding a single consumer sees FIFO order
//!
//! Neither call ever fails because the buffer is full or empty. Callers wait,
//! by spinning or by suspending, until they can proceed or are cancelled.

mod counted_permit;
mod locked_spin;
mod permit;
mod ring;
mod stats;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::CancelToken;
use crate::error::PipeResult;

use counted_permit::CountedPermit;
use locked_spin::LockedSpin;
use ring::SlotRing;
use stats::WaitCounters;

pub use stats::PipeStats;

/// Access strategy selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Per-role lock plus busy-wait on the occupancy counter.
    LockedSpin,
    /// Producer/consumer permit pools plus atomic slot claims.
    #[default]
    CountedPermit,
}

impl Strategy {
    /// Both strategies, in the order they are usually compared.
    pub const ALL: [Self; 2] = [Self::LockedSpin, Self::CountedPermit];

    /// Selector name as used in config files and on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LockedSpin => "locked-spin",
            Self::CountedPermit => "counted-permit",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a strategy name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown strategy `{0}` (expected `locked-spin` or `counted-permit`)")]
pub struct ParseStrategyError(String);

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseStrategyError(s.to_string()))
    }
}

/// The concrete synchronization engine, fixed at construction.
enum Engine {
    LockedSpin(LockedSpin),
    CountedPermit(CountedPermit),
}

/// Shared bounded buffer.
///
/// Share it between threads with `Arc<Pipe<T>>`.
///
/// ## Usage
///
/// ```rust,ignore
/// let pipe = Arc::new(Pipe::new(20, Strategy::LockedSpin));
/// let cancel = CancelToken::new();
///
/// pipe.put(item, &cancel)?;          // waits while full
/// let item = pipe.get(&cancel)?;     // waits while empty
/// ```
pub struct Pipe<T> {
    ring: SlotRing<T>,
    engine: Engine,
    counters: WaitCounters,
}

impl<T> Pipe<T> {
    /// Creates an empty pipe with the given capacity and strategy.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize, strategy: Strategy) -> Self {
        let ring = SlotRing::new(capacity);
        let engine = match strategy {
            Strategy::LockedSpin => Engine::LockedSpin(LockedSpin::new()),
            Strategy::CountedPermit => Engine::CountedPermit(CountedPermit::new(capacity)),
        };

        Self {
            ring,
            engine,
            counters: WaitCounters::default(),
        }
    }

    /// Places an item in the buffer, waiting while it is full.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Cancelled`](crate::PipeError::Cancelled) if
    /// `cancel` fires before the item is accepted. The item is dropped and
    /// the buffer is left untouched.
    pub fn put(&self, item: T, cancel: &CancelToken) -> PipeResult<()> {
        let accepted = match &self.engine {
            Engine::LockedSpin(engine) => engine.put(&self.ring, &self.counters, item, cancel),
            Engine::CountedPermit(engine) => engine.put(&self.ring, &self.counters, item, cancel),
        };
        accepted?;
        self.counters.add_put();
        Ok(())
    }

    /// Removes the oldest available item, waiting while the buffer is empty.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Cancelled`](crate::PipeError::Cancelled) if
    /// `cancel` fires before an item is handed over.
    pub fn get(&self, cancel: &CancelToken) -> PipeResult<T> {
        let item = match &self.engine {
            Engine::LockedSpin(engine) => engine.get(&self.ring, &self.counters, cancel),
            Engine::CountedPermit(engine) => engine.get(&self.ring, &self.counters, cancel),
        }?;
        self.counters.add_get();
        Ok(item)
    }

    /// Wakes every suspended waiter so it re-checks its cancellation token.
    ///
    /// Spinning waiters poll their token on their own and need no wake-up.
    pub fn wake_all(&self) {
        if let Engine::CountedPermit(engine) = &self.engine {
            engine.wake_all();
        }
    }

    /// The strategy this pipe was built with.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self.engine {
            Engine::LockedSpin(_) => Strategy::LockedSpin,
            Engine::CountedPermit(_) => Strategy::CountedPermit,
        }
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Current occupancy.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.occupancy()
    }

    /// Returns true if no item is resident.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current `(in, out)` cursor positions.
    #[inline]
    #[must_use]
    pub fn cursors(&self) -> (usize, usize) {
        self.ring.cursors()
    }

    /// Callers currently parked on a full or empty buffer, spinning or
    /// suspended. Callers queued behind a Locked-Spin role lock are not
    /// counted.
    #[inline]
    #[must_use]
    pub fn waiting(&self) -> usize {
        self.counters.waiting()
    }

    /// Snapshot of the wait counters.
    #[must_use]
    pub fn stats(&self) -> PipeStats {
        self.counters.snapshot()
    }
}

impl<T> fmt::Debug for Pipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("strategy", &self.strategy())
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("cursors", &self.cursors())
            .field("waiting", &self.waiting())
            .finish()
    }
}
