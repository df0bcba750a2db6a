//! # Pipe Error Types
//!
//! The two conditions a worker loop can observe.

use std::fmt;

use thiserror::Error;

use crate::record::Record;

/// Which write-once field of a [`Record`] was involved in a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StampField {
    /// The receiver identity stamp.
    ReceiverStamp,
    /// Instant the creator asked the pipe to accept the record.
    PutRequest,
    /// Instant the pipe accepted the record.
    PutComplete,
    /// Instant the receiver asked the pipe for a record.
    GetRequest,
    /// Instant the pipe handed the record to the receiver.
    GetComplete,
}

impl StampField {
    /// Field name as it appears in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ReceiverStamp => "receiver_stamp",
            Self::PutRequest => "put_request",
            Self::PutComplete => "put_complete",
            Self::GetRequest => "get_request",
            Self::GetComplete => "get_complete",
        }
    }
}

impl fmt::Display for StampField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by the pipe and by record stamping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipeError {
    /// The caller's cancellation token fired while it was waiting.
    ///
    /// This is a normal termination cause, not a failure.
    #[error("cancelled while waiting for pipe access")]
    Cancelled,

    /// A write-once record field was assigned a second time.
    #[error("attempted to set {field} on a record more than once")]
    DoubleStamp {
        /// The field that was already set.
        field: StampField,
        /// Snapshot of the offending record at the time of the failure.
        record: Box<Record>,
    },
}

impl PipeError {
    /// Returns true for the cooperative shutdown signal.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for pipe and record operations.
pub type PipeResult<T> = Result<T, PipeError>;
