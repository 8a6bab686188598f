//! The normalized train service record.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::time::ClockTime;

/// Which side of the station board to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Arrivals,
    Departures,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Arrivals => f.write_str("arrivals"),
            Direction::Departures => f.write_str("departures"),
        }
    }
}

/// One scheduled rail service at a station.
///
/// Every required field is non-empty once a record has been produced by
/// [`map_record`](crate::darwin::map_record). `platform` and `status` are
/// `None` when unknown, never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainService {
    /// Booked time at this station, "HH:MM".
    pub scheduled_time: String,

    /// Estimated time at this station, "HH:MM". Equal to `scheduled_time`
    /// when no clock estimate was given.
    pub expected_time: String,

    /// Platform, when allocated.
    pub platform: Option<String>,

    /// Train operating company name.
    pub operator: String,

    /// Origin station name(s).
    pub origin: String,

    /// Destination station name(s).
    pub destination: String,

    /// Darwin service ID (unique within one board).
    pub service_id: String,

    /// Textual status such as "On time", "Delayed" or "Cancelled".
    pub status: Option<String>,
}

/// Interpretation of a service's free-text status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    OnTime,
    Delayed,
    Cancelled,
    /// Anything else ("No report", "Starts here", ...).
    Other,
}

impl StatusKind {
    /// Classify a status string. Matching ignores case and surrounding
    /// whitespace.
    pub fn classify(status: &str) -> Self {
        let status = status.trim();
        if status.eq_ignore_ascii_case("on time") {
            StatusKind::OnTime
        } else if status.eq_ignore_ascii_case("delayed") {
            StatusKind::Delayed
        } else if status.eq_ignore_ascii_case("cancelled") {
            StatusKind::Cancelled
        } else {
            StatusKind::Other
        }
    }
}

impl TrainService {
    /// The classified status, if a status is present.
    pub fn status_kind(&self) -> Option<StatusKind> {
        self.status.as_deref().map(StatusKind::classify)
    }

    /// Whether the service is cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.status_kind() == Some(StatusKind::Cancelled)
    }

    /// Minutes between scheduled and expected time, positive when late.
    ///
    /// Returns `None` if either time is not a valid "HH:MM" string.
    pub fn delay_minutes(&self) -> Option<i64> {
        if self.expected_time == self.scheduled_time {
            return Some(0);
        }
        let scheduled = ClockTime::parse_hhmm(&self.scheduled_time).ok()?;
        let expected = ClockTime::parse_hhmm(&self.expected_time).ok()?;
        Some(expected.minutes_since(scheduled))
    }
}
