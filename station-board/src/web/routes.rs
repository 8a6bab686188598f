//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, Path, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::board::{BoardError, StationStatus};
use crate::config::CorsOrigins;
use crate::darwin::DarwinError;
use crate::domain::{TrainService, ValidationError};
use crate::notify::{NotificationMessage, NotificationResult};

use super::dto::*;
use super::state::AppState;

/// Delay threshold for `/delays` and alerts when the caller gives none.
const DEFAULT_DELAY_THRESHOLD_MINS: i64 = 5;

/// Station search result cap.
const MAX_SEARCH_RESULTS: usize = 50;

/// Create the application router.
pub fn create_router(state: AppState, cors: &CorsOrigins) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/station/:crs/arrivals", get(arrivals))
        .route("/station/:crs/departures", get(departures))
        .route("/station/:crs/status", get(station_status))
        .route("/station/:crs/delays", get(delayed_departures))
        .route("/station/:crs/alerts", post(send_alerts))
        .route("/api/stations/search", get(search_stations))
        .route("/notifications/status", get(notification_status))
        .route("/notifications/test", post(test_notification))
        .fallback(not_found)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(cors: &CorsOrigins) -> CorsLayer {
    let origin = match cors {
        CorsOrigins::Any => AllowOrigin::any(),
        CorsOrigins::List(origins) => AllowOrigin::list(origins.iter().filter_map(|o| {
            HeaderValue::from_str(o)
                .inspect_err(|_| warn!(origin = %o, "Ignoring invalid CORS origin"))
                .ok()
        })),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn arrivals(
    State(state): State<AppState>,
    Path(crs): Path<String>,
) -> Result<Json<Vec<TrainService>>, AppError> {
    let board = state.board.get_arrivals(&crs).await?;
    Ok(Json(board.services))
}

async fn departures(
    State(state): State<AppState>,
    Path(crs): Path<String>,
) -> Result<Json<Vec<TrainService>>, AppError> {
    let board = state.board.get_departures(&crs).await?;
    Ok(Json(board.services))
}

async fn station_status(
    State(state): State<AppState>,
    Path(crs): Path<String>,
) -> Result<Json<StationStatus>, AppError> {
    Ok(Json(state.board.get_station_status(&crs).await?))
}

async fn delayed_departures(
    State(state): State<AppState>,
    Path(crs): Path<String>,
    AppQuery(query): AppQuery<DelaysQuery>,
) -> Result<Json<Vec<TrainService>>, AppError> {
    let threshold = query.threshold.unwrap_or(DEFAULT_DELAY_THRESHOLD_MINS);
    Ok(Json(
        state.board.get_delayed_departures(&crs, threshold).await?,
    ))
}

/// Alert every recipient about each delayed departure. Services that are
/// cancelled, or late with no minute count, get a disruption alert instead.
async fn send_alerts(
    State(state): State<AppState>,
    Path(crs): Path<String>,
    AppJson(req): AppJson<AlertRequest>,
) -> Result<Json<AlertResponse>, AppError> {
    let threshold = req.threshold_mins.unwrap_or(DEFAULT_DELAY_THRESHOLD_MINS);
    let board = state.board.get_departures(&crs).await?;
    let delayed = state.board.check_service_delays(&board.services, threshold);

    let station_name = state
        .stations()
        .get(&board.crs)
        .unwrap_or(board.crs.as_str())
        .to_string();

    let mut results = Vec::new();
    for service in &delayed {
        let summary = service_summary(service);
        let sent = match service.delay_minutes() {
            Some(delay) if delay > 0 && !service.is_cancelled() => {
                state
                    .notifications
                    .send_delay_alert(&station_name, &summary, delay, &req.recipients)
                    .await
            }
            _ => {
                let status = service.status.as_deref().unwrap_or("Delayed");
                state
                    .notifications
                    .send_disruption_alert(
                        &station_name,
                        &format!("{summary}: {status}"),
                        &req.recipients,
                    )
                    .await
            }
        };
        results.extend(sent);
    }

    info!(
        crs = %board.crs,
        delayed = delayed.len(),
        sent = results.iter().filter(|r| r.success).count(),
        failed = results.iter().filter(|r| !r.success).count(),
        "Delay alerts processed"
    );

    Ok(Json(AlertResponse { delayed, results }))
}

/// Search stations by name or CRS code.
async fn search_stations(
    State(state): State<AppState>,
    AppQuery(req): AppQuery<StationSearchRequest>,
) -> Json<StationSearchResponse> {
    let limit = req.limit.unwrap_or(10).min(MAX_SEARCH_RESULTS);
    Json(StationSearchResponse {
        stations: state.stations().search(&req.q, limit),
    })
}

async fn notification_status(State(state): State<AppState>) -> Json<NotificationStatusResponse> {
    Json(NotificationStatusResponse {
        channels: state.notifications.status(),
    })
}

async fn test_notification(
    State(state): State<AppState>,
    AppJson(req): AppJson<TestNotificationRequest>,
) -> Json<NotificationResult> {
    let subject = req
        .subject
        .unwrap_or_else(|| "Test Notification".to_string());
    let message = NotificationMessage::new(req.channel, req.recipient, subject, req.message)
        .with_metadata("notification_type", "test");

    Json(state.notifications.send(req.channel, &message).await)
}

async fn not_found() -> AppError {
    AppError::NotFound {
        message: "no such route".to_string(),
    }
}

/// JSON body extractor whose rejections are [`AppError`]s.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
struct AppJson<T>(T);

/// Query string extractor whose rejections are [`AppError`]s.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
struct AppQuery<T>(T);

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    /// Body or query string did not deserialize
    BadRequest { message: String },
    Upstream(DarwinError),
    NotFound { message: String },
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<BoardError> for AppError {
    fn from(e: BoardError) -> Self {
        match e {
            BoardError::Validation(e) => AppError::Validation(e),
            BoardError::Upstream(e) => AppError::Upstream(e),
        }
    }
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) | AppError::BadRequest { .. } => {
                (StatusCode::BAD_REQUEST, "ValidationError")
            }
            AppError::Upstream(DarwinError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "APITimeoutError")
            }
            AppError::Upstream(DarwinError::RateLimited) => {
                (StatusCode::TOO_MANY_REQUESTS, "APIRateLimitError")
            }
            AppError::Upstream(_) => (StatusCode::BAD_GATEWAY, "ExternalAPIError"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NotFound"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_kind();
        let message = match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Upstream(e) => e.to_string(),
            AppError::BadRequest { message } | AppError::NotFound { message } => message,
        };

        if status.is_server_error() {
            error!(%status, %message, "Request failed");
        } else {
            warn!(%status, %message, "Request rejected");
        }

        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        let cases = [
            (DarwinError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (DarwinError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (DarwinError::Unauthorized, StatusCode::BAD_GATEWAY),
            (
                DarwinError::ApiError {
                    status: 503,
                    message: "down".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::Upstream(err).status_and_kind().0, status);
        }
    }

    #[test]
    fn validation_is_bad_request() {
        let err = AppError::from(BoardError::Validation(ValidationError::UnknownStation(
            "XXX".to_string(),
        )));
        assert_eq!(
            err.status_and_kind(),
            (StatusCode::BAD_REQUEST, "ValidationError")
        );
    }
}
