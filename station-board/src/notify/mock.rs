//! In-memory notifier for tests and local runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::{Channel, ValidationError};

use super::error::NotifyError;
use super::message::NotificationMessage;

/// Records messages instead of sending them.
///
/// Clones share the sent-message log, so a test can keep a handle after
/// passing the notifier to a dispatcher.
#[derive(Debug, Clone)]
pub struct MockNotifier {
    channel: Channel,
    should_fail: bool,
    sent: Arc<Mutex<Vec<NotificationMessage>>>,
    enabled: Arc<AtomicBool>,
}

impl MockNotifier {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            should_fail: false,
            sent: Arc::new(Mutex::new(Vec::new())),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A notifier whose every send fails.
    pub fn failing(channel: Channel) -> Self {
        Self {
            should_fail: true,
            ..Self::new(channel)
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Any non-blank recipient is accepted.
    pub fn validate_recipient(&self, recipient: &str) -> Result<(), ValidationError> {
        if recipient.trim().is_empty() {
            Err(ValidationError::InvalidRecipient {
                channel: self.channel,
                recipient: recipient.to_string(),
            })
        } else {
            Ok(())
        }
    }

    pub async fn deliver(&self, message: &NotificationMessage) -> Result<String, NotifyError> {
        if self.should_fail {
            return Err(NotifyError::Provider {
                provider: "mock",
                status: 500,
                message: "mock failure".to_string(),
            });
        }

        let mut sent = self.sent.lock().unwrap_or_else(|e| e.into_inner());
        sent.push(message.clone());
        Ok(format!("mock_{}", sent.len()))
    }

    /// Messages delivered so far.
    pub fn sent_messages(&self) -> Vec<NotificationMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn clear_sent_messages(&self) {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
