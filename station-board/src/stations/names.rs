//! Station name lookup.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::Crs;

use super::error::StationError;

/// Station list bundled with the binary.
const EMBEDDED_STATIONS: &str = include_str!("../../data/stations.json");

/// Wrapper for a stations document, in the Knowledgebase feed's shape.
#[derive(Debug, Deserialize)]
struct StationsDocument {
    stations: Vec<StationDto>,
}

/// Minimal DTO for station data - we only need CRS and name.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    pub crs_code: String,
    pub name: String,
}

/// A station returned by [`StationNames::search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationMatch {
    pub crs: Crs,
    pub name: String,
}

/// The known-station table: CRS → station name.
///
/// Immutable once loaded, so it can be shared freely behind an `Arc`.
#[derive(Debug, Clone)]
pub struct StationNames {
    by_crs: HashMap<Crs, String>,
}

impl StationNames {
    /// Load the station list bundled with the binary.
    pub fn embedded() -> Result<Self, StationError> {
        Self::from_json(EMBEDDED_STATIONS)
    }

    /// Load a station list from a JSON file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| StationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Parse a `{"stations": [{"crsCode": .., "name": ..}]}` document.
    ///
    /// Entries with invalid CRS codes are dropped; an empty result is an
    /// error since every lookup would then fail.
    pub fn from_json(json: &str) -> Result<Self, StationError> {
        let doc: StationsDocument = serde_json::from_str(json).map_err(|e| StationError::Json {
            message: e.to_string(),
        })?;
        let by_crs = build_map(doc.stations);
        if by_crs.is_empty() {
            return Err(StationError::Empty);
        }
        Ok(Self { by_crs })
    }

    /// Build a lookup directly from DTOs.
    pub fn from_stations(stations: Vec<StationDto>) -> Self {
        Self {
            by_crs: build_map(stations),
        }
    }

    /// Look up a station name by CRS code.
    pub fn get(&self, crs: &Crs) -> Option<&str> {
        self.by_crs.get(crs).map(String::as_str)
    }

    /// Whether the code names a known station.
    pub fn contains(&self, crs: &Crs) -> bool {
        self.by_crs.contains_key(crs)
    }

    /// Get the number of stations in the lookup.
    pub fn len(&self) -> usize {
        self.by_crs.len()
    }

    /// Check if the lookup is empty.
    pub fn is_empty(&self) -> bool {
        self.by_crs.is_empty()
    }

    /// Search stations by code or name.
    ///
    /// An exact code match ranks first, then names starting with the query,
    /// then names containing it. Ties are ordered by name.
    pub fn search(&self, query: &str, limit: usize) -> Vec<StationMatch> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(u8, &Crs, &String)> = self
            .by_crs
            .iter()
            .filter_map(|(crs, name)| {
                let lower = name.to_lowercase();
                let rank = if crs.as_str().eq_ignore_ascii_case(&query) {
                    0
                } else if lower.starts_with(&query) {
                    1
                } else if lower.contains(&query) {
                    2
                } else {
                    return None;
                };
                Some((rank, crs, name))
            })
            .collect();

        ranked.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.2.cmp(b.2)));

        ranked
            .into_iter()
            .take(limit)
            .map(|(_, crs, name)| StationMatch {
                crs: *crs,
                name: name.clone(),
            })
            .collect()
    }
}

/// Build the CRS → name map from station DTOs.
fn build_map(stations: Vec<StationDto>) -> HashMap<Crs, String> {
    stations
        .into_iter()
        .filter_map(|s| {
            // Feeds are inconsistent about case; codes are stored uppercase
            let crs_upper = s.crs_code.to_uppercase();
            Crs::parse(&crs_upper).ok().map(|crs| (crs, s.name))
        })
        .collect()
}
