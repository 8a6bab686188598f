//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::domain::{Channel, TrainService};
use crate::notify::{ChannelStatus, NotificationResult, Recipient};
use crate::stations::StationMatch;

/// Query for station search.
#[derive(Debug, Deserialize)]
pub struct StationSearchRequest {
    /// Name or CRS fragment
    #[serde(default)]
    pub q: String,

    /// Maximum results (default 10, capped at 50)
    pub limit: Option<usize>,
}

/// Response for station search.
#[derive(Debug, Serialize)]
pub struct StationSearchResponse {
    pub stations: Vec<StationMatch>,
}

/// Query for `/station/{crs}/delays`.
#[derive(Debug, Deserialize)]
pub struct DelaysQuery {
    /// Minutes late before a service is reported (default 5)
    pub threshold: Option<i64>,
}

/// Request to send a delay alert for a station's late departures.
#[derive(Debug, Deserialize)]
pub struct AlertRequest {
    /// Minutes late before a departure triggers an alert (default 5)
    pub threshold_mins: Option<i64>,

    /// Who to tell, and on which channel
    pub recipients: Vec<Recipient>,
}

/// Outcome of an alert request.
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Departures that triggered alerts
    pub delayed: Vec<TrainService>,

    /// One result per departure per recipient
    pub results: Vec<NotificationResult>,
}

/// Request to send a one-off test notification.
#[derive(Debug, Deserialize)]
pub struct TestNotificationRequest {
    pub channel: Channel,
    pub recipient: String,

    /// Defaults to "Test Notification"
    pub subject: Option<String>,
    pub message: String,
}

/// Response for channel status.
#[derive(Debug, Serialize)]
pub struct NotificationStatusResponse {
    pub channels: Vec<ChannelStatus>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error kind, e.g. "ValidationError"
    pub error: &'static str,

    /// Human-readable detail
    pub message: String,
}

/// One-line description of a service for alert text.
pub fn service_summary(service: &TrainService) -> String {
    format!(
        "{} {} to {} ({})",
        service.scheduled_time, service.origin, service.destination, service.operator
    )
}
