//! Darwin API response DTOs.
//!
//! These types map directly to the Darwin LDB JSON API responses.
//! They use `Option` liberally because Darwin omits fields rather than
//! sending null values in many cases.

use serde::{Deserialize, Serialize};

/// Response from `GetArrBoardWithDetails` or `GetDepBoardWithDetails`.
///
/// Service entries are kept as [`RawService`] so that one malformed entry
/// cannot fail deserialization of the whole board.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationBoard {
    /// Train services at this station. Absent when the board is empty.
    pub train_services: Option<Vec<RawService>>,
}

/// One service entry exactly as the upstream sent it.
///
/// The schema belongs to Darwin; the client passes these through untouched
/// and [`map_record`](super::map_record) interprets them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawService(pub serde_json::Value);

impl RawService {
    /// The `serviceID` field, if present and a string.
    pub fn service_id(&self) -> Option<&str> {
        self.0.get("serviceID").and_then(|v| v.as_str())
    }
}

impl From<serde_json::Value> for RawService {
    fn from(value: serde_json::Value) -> Self {
        RawService(value)
    }
}

/// Typed view of a board entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    /// Ephemeral Darwin service ID. Only valid while on departure board.
    #[serde(rename = "serviceID")]
    pub service_id: Option<String>,

    /// Scheduled time of arrival at this station.
    pub sta: Option<String>,

    /// Estimated time of arrival at this station.
    pub eta: Option<String>,

    /// Scheduled time of departure from this station.
    pub std: Option<String>,

    /// Estimated time of departure from this station.
    /// May be "On time", "Delayed", "Cancelled", or a time like "10:15".
    pub etd: Option<String>,

    /// Platform number/letter.
    pub platform: Option<String>,

    /// Train operating company name.
    pub operator: Option<String>,

    /// Whether this service is cancelled.
    pub is_cancelled: Option<bool>,

    /// Origin station(s).
    pub origin: Option<Vec<ServiceLocation>>,

    /// Destination station(s).
    pub destination: Option<Vec<ServiceLocation>>,
}

/// Origin or destination location.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLocation {
    /// Human-readable station name.
    pub location_name: Option<String>,
}
