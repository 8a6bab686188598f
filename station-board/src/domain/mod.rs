//! Domain types for the station board.
//!
//! This module contains the value types shared by the upstream client, the
//! board service and the notification layer. Types enforce their invariants
//! at construction time where they can.

mod channel;
mod error;
mod service;
mod station;
mod time;

pub use channel::{Channel, Priority};
pub use error::ValidationError;
pub use service::{Direction, StatusKind, TrainService};
pub use station::{Crs, InvalidCrs};
pub use time::{ClockTime, TimeError};
