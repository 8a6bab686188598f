//! Board lookups: validate, fetch, map.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::darwin::{RailDataClient, map_record};
use crate::domain::{Crs, Direction, TrainService};
use crate::stations::StationCodeValidator;

use super::delays::{check_service_delays, is_delayed};
use super::error::BoardError;

/// Tunables for board lookups.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    /// Minutes late before a departure counts as delayed in station status
    /// when its status text does not decide.
    pub status_threshold_mins: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            status_threshold_mins: 0,
        }
    }
}

/// A board entry that could not be mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRecord {
    /// Upstream service ID, when the entry had one.
    pub service_id: Option<String>,
    pub reason: String,
}

/// Mapped services plus diagnostics for the entries that were dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardResult {
    pub crs: Crs,
    pub services: Vec<TrainService>,
    pub skipped: Vec<SkippedRecord>,
}

/// Delay summary for a station's departures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationStatus {
    pub crs_code: Crs,
    pub total: usize,
    pub delayed_departures: usize,
    /// "operational" or "delays"
    pub status: &'static str,
    pub services: Vec<TrainService>,
}

/// Station board facade over a [`RailDataClient`].
#[derive(Clone)]
pub struct TrainDataService {
    validator: StationCodeValidator,
    client: Arc<dyn RailDataClient>,
    config: BoardConfig,
}

impl TrainDataService {
    pub fn new(
        validator: StationCodeValidator,
        client: Arc<dyn RailDataClient>,
        config: BoardConfig,
    ) -> Self {
        Self {
            validator,
            client,
            config,
        }
    }

    pub fn validator(&self) -> &StationCodeValidator {
        &self.validator
    }

    pub fn config(&self) -> BoardConfig {
        self.config
    }

    /// Arrivals at a station.
    pub async fn get_arrivals(&self, raw_crs: &str) -> Result<BoardResult, BoardError> {
        self.get_board(raw_crs, Direction::Arrivals).await
    }

    /// Departures from a station.
    pub async fn get_departures(&self, raw_crs: &str) -> Result<BoardResult, BoardError> {
        self.get_board(raw_crs, Direction::Departures).await
    }

    /// Validate the code, fetch the board and map every entry.
    ///
    /// Entries that fail mapping, or repeat a service ID already on the
    /// board, are skipped and reported in [`BoardResult::skipped`]; the rest
    /// keep upstream order.
    pub async fn get_board(
        &self,
        raw_crs: &str,
        direction: Direction,
    ) -> Result<BoardResult, BoardError> {
        let crs = self.validator.validate(raw_crs)?;
        let raw = self.client.fetch_services(&crs, direction).await?;

        let mut result = BoardResult {
            crs,
            services: Vec::with_capacity(raw.len()),
            skipped: Vec::new(),
        };

        let mut seen = HashSet::with_capacity(raw.len());

        for record in &raw {
            match map_record(record, direction) {
                Ok(service) if !seen.insert(service.service_id.clone()) => {
                    warn!(
                        crs = %crs,
                        %direction,
                        service_id = %service.service_id,
                        "Skipping duplicate service"
                    );
                    result.skipped.push(SkippedRecord {
                        reason: format!("duplicate serviceID: {}", service.service_id),
                        service_id: Some(service.service_id),
                    });
                }
                Ok(service) => result.services.push(service),
                Err(e) => {
                    warn!(
                        crs = %crs,
                        %direction,
                        service_id = record.service_id().unwrap_or("<none>"),
                        error = %e,
                        "Skipping unmappable service"
                    );
                    result.skipped.push(SkippedRecord {
                        service_id: record.service_id().map(str::to_string),
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            crs = %crs,
            %direction,
            mapped = result.services.len(),
            skipped = result.skipped.len(),
            "Board mapped"
        );

        Ok(result)
    }

    /// Departures with a count of those delayed.
    pub async fn get_station_status(&self, raw_crs: &str) -> Result<StationStatus, BoardError> {
        let board = self.get_departures(raw_crs).await?;

        let delayed_departures = board
            .services
            .iter()
            .filter(|s| is_delayed(s, self.config.status_threshold_mins))
            .count();

        Ok(StationStatus {
            crs_code: board.crs,
            total: board.services.len(),
            delayed_departures,
            status: if delayed_departures == 0 {
                "operational"
            } else {
                "delays"
            },
            services: board.services,
        })
    }

    /// Departures delayed beyond `threshold_mins`.
    pub async fn get_delayed_departures(
        &self,
        raw_crs: &str,
        threshold_mins: i64,
    ) -> Result<Vec<TrainService>, BoardError> {
        let board = self.get_departures(raw_crs).await?;
        Ok(self.check_service_delays(&board.services, threshold_mins))
    }

    /// See [`check_service_delays`](super::check_service_delays).
    pub fn check_service_delays(
        &self,
        services: &[TrainService],
        threshold_mins: i64,
    ) -> Vec<TrainService> {
        check_service_delays(services, threshold_mins)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::darwin::{MockDarwinClient, RawService};
    use crate::stations::StationNames;
    use proptest::prelude::*;
    use serde_json::json;

    fn valid(i: usize) -> RawService {
        RawService(json!({
            "serviceID": format!("ok{i}"),
            "std": format!("{:02}:{:02}", (i / 60) % 24, i % 60),
            "operator": "Northern",
            "origin": [{"locationName": "Leeds"}],
            "destination": [{"locationName": "York"}]
        }))
    }

    fn invalid(i: usize) -> RawService {
        RawService(json!({"serviceID": format!("bad{i}"), "std": "10:00"}))
    }

    proptest! {
        /// A board of N valid and M invalid entries yields exactly N services
        #[test]
        fn mixed_batch_keeps_valid(n in 0usize..15, m in 0usize..15) {
            let mut raw: Vec<RawService> = (0..n).map(valid).collect();
            raw.extend((0..m).map(invalid));

            let client = MockDarwinClient::new().with_board(
                Crs::parse("LDS").unwrap(),
                Direction::Departures,
                raw,
            );
            let svc = TrainDataService::new(
                StationCodeValidator::new(Arc::new(StationNames::embedded().unwrap())),
                Arc::new(client),
                BoardConfig::default(),
            );

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let board = rt.block_on(svc.get_departures("LDS")).unwrap();

            prop_assert_eq!(board.services.len(), n);
            prop_assert_eq!(board.skipped.len(), m);
        }
    }
}
