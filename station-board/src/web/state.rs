//! Application state for the web layer.

use std::sync::Arc;

use crate::board::TrainDataService;
use crate::notify::NotificationDispatcher;
use crate::stations::StationNames;

/// Shared application state.
///
/// Contains all the services needed to handle requests.
#[derive(Clone)]
pub struct AppState {
    /// Station boards
    pub board: Arc<TrainDataService>,

    /// Outbound notifications
    pub notifications: Arc<NotificationDispatcher>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(board: TrainDataService, notifications: NotificationDispatcher) -> Self {
        Self {
            board: Arc::new(board),
            notifications: Arc::new(notifications),
        }
    }

    /// The known-station table.
    pub fn stations(&self) -> &StationNames {
        self.board.validator().stations()
    }
}
