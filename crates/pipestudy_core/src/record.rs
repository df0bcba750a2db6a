//! # Write-Once Records
//!
//! A [`Record`] is the unit of work that travels through the pipe. Every
//! timing field can be set exactly once, so after a run each measurement is
//! known to have been written by the one worker that owned that side of the
//! record.
//!
//! ```text
//!   Creator                      Pipe                      Receiver
//!   ───────                      ────                      ────────
//!   new(creator_stamp)
//!   set_put_request ──► put ───────────► get ◄── (prospective get_request)
//!   set_put_complete                         set_get_complete
//!                                            set_get_request
//!                                            set_receiver_stamp
//! ```
//!
//! Fields use [`OnceLock`], so setters take `&self` and a record can be shared
//! as `Arc<Record>` between its creator and its receiver without a lock. The
//! two sides only ever touch disjoint fields.

use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::error::{PipeError, PipeResult, StampField};

/// A stamped unit of work whose fields are each assigned at most once.
#[derive(Clone, Debug)]
pub struct Record {
    creator_stamp: String,
    receiver_stamp: OnceLock<String>,
    put_request: OnceLock<Instant>,
    put_complete: OnceLock<Instant>,
    get_request: OnceLock<Instant>,
    get_complete: OnceLock<Instant>,
}

impl Record {
    /// Creates a record carrying its creator's identity stamp.
    ///
    /// The creator stamp is fixed for the lifetime of the record.
    #[must_use]
    pub fn new(creator_stamp: impl Into<String>) -> Self {
        Self {
            creator_stamp: creator_stamp.into(),
            receiver_stamp: OnceLock::new(),
            put_request: OnceLock::new(),
            put_complete: OnceLock::new(),
            get_request: OnceLock::new(),
            get_complete: OnceLock::new(),
        }
    }

    /// Stamp of the creator that built this record (`"<id>.<sequence>"`).
    #[inline]
    #[must_use]
    pub fn creator_stamp(&self) -> &str {
        &self.creator_stamp
    }

    /// Stamp of the receiver that consumed this record, or `""` if unset.
    #[inline]
    #[must_use]
    pub fn receiver_stamp(&self) -> &str {
        self.receiver_stamp.get().map_or("", String::as_str)
    }

    /// Instant the creator requested pipe access.
    #[inline]
    #[must_use]
    pub fn put_request(&self) -> Option<Instant> {
        self.put_request.get().copied()
    }

    /// Instant the pipe accepted the record.
    #[inline]
    #[must_use]
    pub fn put_complete(&self) -> Option<Instant> {
        self.put_complete.get().copied()
    }

    /// Instant the receiver requested pipe access.
    #[inline]
    #[must_use]
    pub fn get_request(&self) -> Option<Instant> {
        self.get_request.get().copied()
    }

    /// Instant the pipe handed the record to the receiver.
    #[inline]
    #[must_use]
    pub fn get_complete(&self) -> Option<Instant> {
        self.get_complete.get().copied()
    }

    /// Returns true once all five settable fields have been assigned.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.receiver_stamp.get().is_some()
            && self.put_request.get().is_some()
            && self.put_complete.get().is_some()
            && self.get_request.get().is_some()
            && self.get_complete.get().is_some()
    }

    /// Sets the receiver identity stamp.
    ///
    /// An empty stamp is the unset value: it is accepted, leaves the field
    /// unset and does not use up the one assignment.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::DoubleStamp`] if a receiver already stamped this
    /// record, which means the pipe handed the same item out twice.
    pub fn set_receiver_stamp(&self, stamp: impl Into<String>) -> PipeResult<()> {
        let stamp = stamp.into();
        if stamp.is_empty() {
            return if self.receiver_stamp.get().is_some() {
                Err(self.double_stamp(StampField::ReceiverStamp))
            } else {
                Ok(())
            };
        }
        self.receiver_stamp
            .set(stamp)
            .map_err(|_| self.double_stamp(StampField::ReceiverStamp))
    }

    /// Sets the put-request instant.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::DoubleStamp`] if the field was already set.
    pub fn set_put_request(&self, at: Instant) -> PipeResult<()> {
        self.stamp_instant(&self.put_request, StampField::PutRequest, at)
    }

    /// Sets the put-complete instant.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::DoubleStamp`] if the field was already set.
    pub fn set_put_complete(&self, at: Instant) -> PipeResult<()> {
        self.stamp_instant(&self.put_complete, StampField::PutComplete, at)
    }

    /// Sets the get-request instant.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::DoubleStamp`] if the field was already set.
    pub fn set_get_request(&self, at: Instant) -> PipeResult<()> {
        self.stamp_instant(&self.get_request, StampField::GetRequest, at)
    }

    /// Sets the get-complete instant.
    ///
    /// # Errors
    ///
    /// Returns [`PipeError::DoubleStamp`] if the field was already set.
    pub fn set_get_complete(&self, at: Instant) -> PipeResult<()> {
        self.stamp_instant(&self.get_complete, StampField::GetComplete, at)
    }

    /// Renders every stamp and instant relative to a shared run-start origin.
    #[must_use]
    pub fn display(&self, origin: Instant) -> RecordDisplay<'_> {
        RecordDisplay {
            record: self,
            origin,
        }
    }

    fn stamp_instant(
        &self,
        slot: &OnceLock<Instant>,
        field: StampField,
        at: Instant,
    ) -> PipeResult<()> {
        slot.set(at).map_err(|_| self.double_stamp(field))
    }

    fn double_stamp(&self, field: StampField) -> PipeError {
        PipeError::DoubleStamp {
            field,
            record: Box::new(self.clone()),
        }
    }
}

/// Two records are the same item when both identity stamps match.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.creator_stamp == other.creator_stamp
            && self.receiver_stamp() == other.receiver_stamp()
    }
}

impl Eq for Record {}

/// Diagnostic rendering of a [`Record`] with instants shown as milliseconds
/// since the run origin. Unset instants render as `-`.
pub struct RecordDisplay<'a> {
    record: &'a Record,
    origin: Instant,
}

impl RecordDisplay<'_> {
    fn offset(&self, at: Option<Instant>) -> Option<Duration> {
        at.map(|instant| instant.saturating_duration_since(self.origin))
    }
}

impl fmt::Display for RecordDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.record;
        let receiver = if r.receiver_stamp().is_empty() {
            "-"
        } else {
            r.receiver_stamp()
        };

        write!(f, "creator={} receiver={}", r.creator_stamp(), receiver)?;
        for (label, at) in [
            ("put_request", r.put_request()),
            ("put_complete", r.put_complete()),
            ("get_request", r.get_request()),
            ("get_complete", r.get_complete()),
        ] {
            match self.offset(at) {
                Some(offset) => write!(f, " {label}={:.3}ms", offset.as_secs_f64() * 1000.0)?,
                None => write!(f, " {label}=-")?,
            }
        }
        Ok(())
    }
}
