//! Notification delivery errors.
//!
//! These never escape the dispatcher: every one is folded into a failed
//! [`NotificationResult`](super::NotificationResult).

use crate::domain::Channel;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notifier is disabled")]
    Disabled,

    #[error("no {0} notifier configured")]
    NotConfigured(Channel),

    #[error("{channel} notification timed out after {secs}s")]
    Timeout { channel: Channel, secs: u64 },

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} error {status}: {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("invalid credentials: {0}")]
    Credentials(String),
}
