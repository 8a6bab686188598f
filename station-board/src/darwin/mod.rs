//! Darwin LDB (Live Departure Boards) client.
//!
//! This module provides an HTTP client for the National Rail Darwin API,
//! which provides real-time arrival and departure information, plus the
//! mapping from its board entries to [`TrainService`](crate::domain::TrainService).
//!
//! Key characteristics of Darwin:
//! - Service IDs are **ephemeral** - only valid while the service appears
//!   on a board
//! - Times are in "HH:MM" format (UK local time)
//! - Estimates are either a time or a word such as "On time" or "Delayed"

mod client;
mod convert;
mod error;
mod mock;
mod types;

pub use client::{DEFAULT_BASE_URL, DarwinClient, DarwinConfig, MAX_ROWS, RailDataClient};
pub use convert::{ConversionError, map_record};
pub use error::DarwinError;
pub use mock::MockDarwinClient;
pub use types::{RawService, ServiceItem, ServiceLocation, StationBoard};
