use std::sync::Arc;

use tracing::{info, warn};

use station_board::board::TrainDataService;
use station_board::config::AppConfig;
use station_board::darwin::{DarwinClient, MockDarwinClient, RailDataClient};
use station_board::logging;
use station_board::notify::NotificationDispatcher;
use station_board::stations::{StationCodeValidator, StationNames};
use station_board::web::{AppState, create_router};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };
    logging::init(config.log_level);

    // Load the station table
    let stations = match &config.stations_file {
        Some(path) => StationNames::load(path).expect("Failed to load station list"),
        None => StationNames::embedded().expect("Bundled station list is invalid"),
    };
    info!(stations = stations.len(), "Loaded station names");
    let validator = StationCodeValidator::new(Arc::new(stations));

    // Pick the board source
    let client: Arc<dyn RailDataClient> = match &config.mock_boards_dir {
        Some(dir) => {
            let mock = MockDarwinClient::from_dir(dir).expect("Failed to load mock boards");
            info!(dir = %dir.display(), stations = mock.available_stations().len(), "Serving mock boards");
            Arc::new(mock)
        }
        None => {
            if config.darwin.consumer_key.is_empty() {
                warn!("CONSUMER_KEY not set. Darwin API calls will fail.");
            }
            Arc::new(DarwinClient::new(config.darwin.clone()).expect("Failed to create Darwin client"))
        }
    };

    let board = TrainDataService::new(validator, client, config.board);
    let notifications = NotificationDispatcher::from_config(&config.notify);

    let state = AppState::new(board, notifications);
    let app = create_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind listen address");
    info!(addr = %config.bind_addr, "Station board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
