//! Station board orchestration.
//!
//! [`TrainDataService`] ties the station validator, a [`RailDataClient`](crate::darwin::RailDataClient)
//! and the record mapper together, and derives delay summaries from the
//! mapped services.

mod delays;
mod error;
mod service;

pub use delays::{check_service_delays, is_delayed};
pub use error::BoardError;
pub use service::{BoardConfig, BoardResult, SkippedRecord, StationStatus, TrainDataService};
