//! Known stations and station code validation.
//!
//! Provides the CRS code → station name table (bundled with the binary or
//! loaded from a file) and the validator that turns user input into a
//! known [`Crs`](crate::domain::Crs).

mod error;
mod names;
mod validator;

pub use error::StationError;
pub use names::{StationDto, StationMatch, StationNames};
pub use validator::StationCodeValidator;
