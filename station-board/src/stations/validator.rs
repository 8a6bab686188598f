//! Station code validation.

use std::sync::Arc;

use crate::domain::{Crs, ValidationError};

use super::names::StationNames;

/// Length of a CRS code.
const CRS_LEN: usize = 3;

/// Resolves raw user input to a known CRS code.
#[derive(Debug, Clone)]
pub struct StationCodeValidator {
    stations: Arc<StationNames>,
}

impl StationCodeValidator {
    pub fn new(stations: Arc<StationNames>) -> Self {
        Self { stations }
    }

    /// The station table this validator checks against.
    pub fn stations(&self) -> &StationNames {
        &self.stations
    }

    /// Validate and normalize a station code.
    ///
    /// Input is trimmed and matched case-insensitively. Fails if it is
    /// empty, longer than a CRS code, not three letters, or not a known
    /// station.
    pub fn validate(&self, raw: &str) -> Result<Crs, ValidationError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::Empty);
        }

        let len = trimmed.chars().count();
        if len > CRS_LEN {
            return Err(ValidationError::TooLong { len });
        }

        let crs = Crs::parse_normalized(trimmed)
            .map_err(|_| ValidationError::Malformed(trimmed.to_string()))?;

        if !self.stations.contains(&crs) {
            return Err(ValidationError::UnknownStation(crs.to_string()));
        }

        Ok(crs)
    }
}
