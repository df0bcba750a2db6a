//! # Counting Permit Pool
//!
//! A blocking counting semaphore whose acquire honors a [`CancelToken`].
//! Waiters suspend on a condvar; they never spin.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use super::stats::WaitCounters;
use crate::cancel::CancelToken;
use crate::error::{PipeError, PipeResult};

/// Upper bound on how long a suspended waiter goes without re-checking its
/// cancellation token. `wake_all` cuts this short.
const CANCEL_RECHECK: Duration = Duration::from_millis(5);

/// How an acquire was satisfied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Acquired {
    /// A permit was available on arrival.
    Immediately,
    /// The caller had to suspend at least once.
    AfterWaiting,
}

pub(crate) struct PermitPool {
    permits: Mutex<usize>,
    available: Condvar,
}

impl PermitPool {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Takes one permit, suspending until one is released.
    ///
    /// While suspended the caller is counted in `counters`' waiting gauge.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::Cancelled`] if the token is cancelled on entry or
    /// while suspended. No permit is consumed in that case.
    pub(crate) fn acquire(
        &self,
        counters: &WaitCounters,
        cancel: &CancelToken,
    ) -> PipeResult<Acquired> {
        let mut permits = self.permits.lock();

        if cancel.is_cancelled() {
            return Err(PipeError::Cancelled);
        }
        if *permits > 0 {
            *permits -= 1;
            return Ok(Acquired::Immediately);
        }

        counters.enter_wait();
        let outcome = loop {
            self.available.wait_for(&mut permits, CANCEL_RECHECK);
            if cancel.is_cancelled() {
                break Err(PipeError::Cancelled);
            }
            if *permits > 0 {
                *permits -= 1;
                break Ok(Acquired::AfterWaiting);
            }
        };
        counters.leave_wait();
        outcome
    }

    /// Returns one permit to the pool and wakes one waiter.
    pub(crate) fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }

    /// Wakes every suspended waiter so it re-checks its token.
    pub(crate) fn wake_all(&self) {
        let _permits = self.permits.lock();
        self.available.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn available(&self) -> usize {
        *self.permits.lock()
    }
}
