//! Board service errors.

use crate::darwin::DarwinError;
use crate::domain::ValidationError;

/// Errors from a board lookup.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// Station code rejected before any upstream call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Upstream call failed; no partial list is returned
    #[error("upstream error: {0}")]
    Upstream(#[from] DarwinError),
}
