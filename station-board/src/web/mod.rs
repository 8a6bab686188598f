//! Web layer for the station board service.
//!
//! Provides JSON endpoints for station boards, delay checks and
//! notifications.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
