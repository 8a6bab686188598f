//! Board clock times.
//!
//! Darwin provides times as "HH:MM" strings with no date attached. Boards
//! only ever span a few hours, so comparing two times needs a rollover
//! rule rather than a calendar: a scheduled 23:55 with an estimate of 00:10
//! is fifteen minutes late, not twenty-three hours early.

use std::fmt;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Threshold for detecting midnight rollover between two board times.
///
/// If one time appears more than 6 hours before the other, we assume the
/// pair straddles midnight.
const ROLLOVER_THRESHOLD_HOURS: i64 = 6;

/// A wall-clock time of day as shown on a departure board.
///
/// # Examples
///
/// ```
/// use station_board::domain::ClockTime;
///
/// let scheduled = ClockTime::parse_hhmm("23:55").unwrap();
/// let expected = ClockTime::parse_hhmm("00:10").unwrap();
/// assert_eq!(expected.minutes_since(scheduled), 15);
/// assert_eq!(expected.to_string(), "00:10");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    /// Minutes after midnight, 0..1440.
    minutes: u16,
}

impl ClockTime {
    /// Create a time from hour and minute components.
    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, TimeError> {
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        Ok(Self {
            minutes: (hour * 60 + minute) as u16,
        })
    }

    /// Parse a time from "HH:MM" format.
    ///
    /// # Examples
    ///
    /// ```
    /// use station_board::domain::ClockTime;
    ///
    /// assert!(ClockTime::parse_hhmm("00:00").is_ok());
    /// assert!(ClockTime::parse_hhmm("23:59").is_ok());
    ///
    /// assert!(ClockTime::parse_hhmm("1430").is_err());
    /// assert!(ClockTime::parse_hhmm("14:3").is_err());
    /// assert!(ClockTime::parse_hhmm("25:00").is_err());
    /// assert!(ClockTime::parse_hhmm("On time").is_err());
    /// ```
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        // Must be exactly 5 characters: HH:MM
        if s.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }

        let bytes = s.as_bytes();

        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;

        Self::from_hm(hour, minute)
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        u32::from(self.minutes / 60)
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        u32::from(self.minutes % 60)
    }

    /// Signed minutes from `earlier` to `self`, assuming the two times are
    /// within six hours of each other modulo midnight.
    ///
    /// Positive when `self` is later (e.g. an expected time after the
    /// scheduled one), negative when it is earlier.
    pub fn minutes_since(&self, earlier: ClockTime) -> i64 {
        let diff = i64::from(self.minutes) - i64::from(earlier.minutes);
        let threshold = ROLLOVER_THRESHOLD_HOURS * 60;

        if diff < -threshold {
            // e.g. 00:10 vs 23:55: crossed midnight going forwards
            diff + MINUTES_PER_DAY
        } else if diff > MINUTES_PER_DAY - threshold {
            // e.g. 23:58 vs 00:05: running early across midnight
            diff - MINUTES_PER_DAY
        } else {
            diff
        }
    }
}

impl fmt::Debug for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClockTime({:02}:{:02})", self.hour(), self.minute())
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

/// Parse two ASCII digits into a number.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}
