//! Validation error types.
//!
//! These errors describe bad user input: a station code that cannot be
//! resolved, or a notification target in the wrong format. They are
//! distinct from upstream/API errors and map to HTTP 4xx responses.

use super::Channel;

/// A user input problem, detected before any upstream call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No station code was supplied
    #[error("station code must not be empty")]
    Empty,

    /// Input longer than a CRS code
    #[error("station code too long: {len} characters (expected 3)")]
    TooLong { len: usize },

    /// Input of the right length that is not three letters
    #[error("malformed station code: {0}")]
    Malformed(String),

    /// Well-formed code that is not in the station list
    #[error("unknown station code: {0}")]
    UnknownStation(String),

    /// Notification recipient in the wrong format for its channel
    #[error("invalid {channel} recipient: {recipient}")]
    InvalidRecipient { channel: Channel, recipient: String },
}
