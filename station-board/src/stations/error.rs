//! Station list error types.

use std::path::PathBuf;

/// Errors that can occur while loading the station list.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Station file could not be read
    #[error("failed to read station list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse station list JSON
    #[error("JSON parse error: {message}")]
    Json { message: String },

    /// The list parsed but held no usable station codes
    #[error("station list contains no valid CRS codes")]
    Empty,
}
