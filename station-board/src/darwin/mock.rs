//! Mock Darwin client for testing without API access.
//!
//! Serves canned station boards, either built in code or loaded from
//! `{CRS}.json` files in the same shape as a live board response.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::domain::{Crs, Direction};

use super::client::RailDataClient;
use super::error::DarwinError;
use super::types::{RawService, StationBoard};

/// In-memory [`RailDataClient`].
///
/// Stations without a board answer with an empty list, as Darwin does for a
/// quiet station. Clones share the call counter.
#[derive(Debug, Clone, Default)]
pub struct MockDarwinClient {
    boards: HashMap<(Crs, Direction), Vec<RawService>>,
    failure: Option<u16>,
    calls: Arc<AtomicUsize>,
}

impl MockDarwinClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `services` for one station and direction.
    pub fn with_board(
        mut self,
        crs: Crs,
        direction: Direction,
        services: impl IntoIterator<Item = RawService>,
    ) -> Self {
        self.boards
            .insert((crs, direction), services.into_iter().collect());
        self
    }

    /// Serve the same services in both directions.
    pub fn with_station(self, crs: Crs, services: Vec<RawService>) -> Self {
        self.with_board(crs, Direction::Arrivals, services.clone())
            .with_board(crs, Direction::Departures, services)
    }

    /// Fail every call with this upstream status.
    pub fn failing_with(mut self, status: u16) -> Self {
        self.failure = Some(status);
        self
    }

    /// Load boards from a directory of `{CRS}.json` files.
    ///
    /// Each file is used for both arrivals and departures; entries carry
    /// both `sta`/`eta` and `std`/`etd` where needed.
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self, DarwinError> {
        let data_dir = data_dir.as_ref();
        let mut client = Self::new();

        let entries = std::fs::read_dir(data_dir).map_err(|e| {
            DarwinError::NotConfigured(format!(
                "failed to read mock data directory {}: {e}",
                data_dir.display()
            ))
        })?;

        for entry in entries {
            let path = entry
                .map_err(|e| DarwinError::NotConfigured(format!("failed to read entry: {e}")))?
                .path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            // "PAD.json" -> "PAD"
            let crs = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Crs::parse(s).ok())
                .ok_or_else(|| {
                    DarwinError::NotConfigured(format!("invalid CRS filename: {}", path.display()))
                })?;

            let json = std::fs::read_to_string(&path).map_err(|e| {
                DarwinError::NotConfigured(format!("failed to read {}: {e}", path.display()))
            })?;

            let board: StationBoard = serde_json::from_str(&json).map_err(|e| DarwinError::Json {
                message: format!("{}: {e}", path.display()),
                body: None,
            })?;

            client = client.with_station(crs, board.train_services.unwrap_or_default());
        }

        if client.boards.is_empty() {
            return Err(DarwinError::NotConfigured(format!(
                "no mock board files found in {}",
                data_dir.display()
            )));
        }

        Ok(client)
    }

    /// Number of `fetch_services` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stations with at least one loaded board.
    pub fn available_stations(&self) -> Vec<Crs> {
        let mut stations: Vec<Crs> = self.boards.keys().map(|(crs, _)| *crs).collect();
        stations.sort();
        stations.dedup();
        stations
    }
}

#[async_trait]
impl RailDataClient for MockDarwinClient {
    async fn fetch_services(
        &self,
        crs: &Crs,
        direction: Direction,
    ) -> Result<Vec<RawService>, DarwinError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(status) = self.failure {
            return Err(DarwinError::from_status(status, format!("mock failure for {crs}")));
        }

        Ok(self
            .boards
            .get(&(*crs, direction))
            .cloned()
            .unwrap_or_default())
    }
}
