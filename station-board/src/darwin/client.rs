//! Darwin LDB HTTP client.
//!
//! Fetches arrival and departure boards from the Live Departure Boards web
//! service and hands back the service entries untouched. Interpretation of
//! those entries is left to [`map_record`](super::map_record).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

use crate::domain::{Crs, Direction};

use super::error::DarwinError;
use super::types::{RawService, StationBoard};

/// Default base URL for Darwin LDB API.
pub const DEFAULT_BASE_URL: &str =
    "https://api1.raildata.org.uk/1010-live-departure-board-dep1_2/LDBWS";

/// API version path segment.
const API_VERSION_PATH: &str = "/api/20220120";

/// Darwin caps boards with details at ten rows.
pub const MAX_ROWS: u8 = 10;

/// Default board window in minutes.
const DEFAULT_TIME_WINDOW: u16 = 120;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Source of raw board entries for a station.
///
/// [`DarwinClient`] talks to the real API; [`MockDarwinClient`](super::MockDarwinClient)
/// serves canned boards.
#[async_trait]
pub trait RailDataClient: Send + Sync {
    /// Fetch the board for a station in one direction.
    ///
    /// The CRS is sent as given. A board with no services is an empty list.
    async fn fetch_services(
        &self,
        crs: &Crs,
        direction: Direction,
    ) -> Result<Vec<RawService>, DarwinError>;
}

/// Configuration for the Darwin client.
#[derive(Debug, Clone)]
pub struct DarwinConfig {
    /// Consumer key, sent as `x-apikey`
    pub consumer_key: String,
    /// Consumer secret; when set, requests use basic auth instead
    pub consumer_secret: Option<String>,
    /// Base URL for the API (defaults to production Darwin)
    pub base_url: String,
    /// Rows per board, at most [`MAX_ROWS`]
    pub num_rows: u8,
    /// Minutes offset from now
    pub time_offset: i16,
    /// Minutes window for results
    pub time_window: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl DarwinConfig {
    /// Create a new config with the given consumer key.
    pub fn new(consumer_key: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            num_rows: MAX_ROWS,
            time_offset: 0,
            time_window: DEFAULT_TIME_WINDOW,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Use basic auth with this secret.
    pub fn with_consumer_secret(mut self, secret: impl Into<String>) -> Self {
        self.consumer_secret = Some(secret.into());
        self
    }

    /// Set a custom base URL. A trailing API version path is dropped, so
    /// both `.../LDBWS` and `.../LDBWS/api/20220120` work.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        let url = url.trim_end_matches('/');
        self.base_url = url.strip_suffix(API_VERSION_PATH).unwrap_or(url).to_string();
        self
    }

    /// Set rows per board. Values above [`MAX_ROWS`] are clamped.
    pub fn with_num_rows(mut self, rows: u8) -> Self {
        self.num_rows = rows.min(MAX_ROWS);
        self
    }

    /// Set the board time window.
    pub fn with_time_window(mut self, offset: i16, window: u16) -> Self {
        self.time_offset = offset;
        self.time_window = window;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Darwin LDB API client.
#[derive(Debug, Clone)]
pub struct DarwinClient {
    http: reqwest::Client,
    base_url: String,
    basic_auth: Option<(String, String)>,
    num_rows: u8,
    time_offset: i16,
    time_window: u16,
}

impl DarwinClient {
    /// Create a new Darwin client with the given configuration.
    pub fn new(config: DarwinConfig) -> Result<Self, DarwinError> {
        let mut headers = HeaderMap::new();

        let basic_auth = match config.consumer_secret {
            Some(secret) => Some((config.consumer_key, secret)),
            None => {
                let api_key = HeaderValue::from_str(&config.consumer_key).map_err(|_| {
                    DarwinError::NotConfigured("invalid API key format".to_string())
                })?;
                headers.insert("x-apikey", api_key);
                None
            }
        };

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            basic_auth,
            num_rows: config.num_rows.min(MAX_ROWS),
            time_offset: config.time_offset,
            time_window: config.time_window,
        })
    }

    fn board_url(&self, crs: &Crs, direction: Direction) -> String {
        let operation = match direction {
            Direction::Arrivals => "GetArrBoardWithDetails",
            Direction::Departures => "GetDepBoardWithDetails",
        };
        format!(
            "{}{}/{}/{}",
            self.base_url,
            API_VERSION_PATH,
            operation,
            crs.as_str()
        )
    }

    /// Get the full board response.
    pub async fn get_board(
        &self,
        crs: &Crs,
        direction: Direction,
    ) -> Result<StationBoard, DarwinError> {
        let url = self.board_url(crs, direction);

        let mut request = self.http.get(&url).query(&[
            ("numRows", self.num_rows.to_string()),
            ("timeOffset", self.time_offset.to_string()),
            ("timeWindow", self.time_window.to_string()),
        ]);
        if let Some((user, secret)) = &self.basic_auth {
            request = request.basic_auth(user, Some(secret));
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = DarwinError::from(e);
                warn!(
                    method = "GET",
                    url = %url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Darwin request failed"
                );
                return Err(err);
            }
        };

        let status = response.status();
        info!(
            method = "GET",
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Darwin request"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DarwinError::from_status(status.as_u16(), body));
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| DarwinError::Json {
            message: e.to_string(),
            body: Some(body.chars().take(500).collect()),
        })
    }
}

#[async_trait]
impl RailDataClient for DarwinClient {
    async fn fetch_services(
        &self,
        crs: &Crs,
        direction: Direction,
    ) -> Result<Vec<RawService>, DarwinError> {
        let board = self.get_board(crs, direction).await?;
        let services = board.train_services.unwrap_or_default();
        debug!(crs = %crs, %direction, count = services.len(), "Fetched board");
        Ok(services)
    }
}
