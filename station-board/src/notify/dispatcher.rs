//! Fan-out of notifications to configured channels.

use std::collections::BTreeMap;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::domain::{Channel, ValidationError};

use super::email::{EmailConfig, EmailNotifier};
use super::error::NotifyError;
use super::message::{NotificationMessage, NotificationResult, Recipient, delay_alert, disruption_alert};
use super::mock::MockNotifier;
use super::push::{PushConfig, PushNotifier};
use super::sms::{SmsConfig, SmsNotifier};

/// Default per-send timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// One delivery backend.
#[derive(Debug)]
pub enum Notifier {
    Email(EmailNotifier),
    Sms(SmsNotifier),
    Push(PushNotifier),
    Mock(MockNotifier),
}

impl Notifier {
    pub fn channel(&self) -> Channel {
        match self {
            Notifier::Email(_) => Channel::Email,
            Notifier::Sms(_) => Channel::Sms,
            Notifier::Push(_) => Channel::Push,
            Notifier::Mock(m) => m.channel(),
        }
    }

    /// Short name of the backing service.
    pub fn provider(&self) -> &'static str {
        match self {
            Notifier::Email(_) => "smtp",
            Notifier::Sms(_) => "twilio",
            Notifier::Push(_) => "fcm",
            Notifier::Mock(_) => "mock",
        }
    }

    pub fn is_enabled(&self) -> bool {
        match self {
            Notifier::Email(n) => n.is_enabled(),
            Notifier::Sms(n) => n.is_enabled(),
            Notifier::Push(n) => n.is_enabled(),
            Notifier::Mock(n) => n.is_enabled(),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        match self {
            Notifier::Email(n) => n.set_enabled(enabled),
            Notifier::Sms(n) => n.set_enabled(enabled),
            Notifier::Push(n) => n.set_enabled(enabled),
            Notifier::Mock(n) => n.set_enabled(enabled),
        }
    }

    pub fn validate_recipient(&self, recipient: &str) -> Result<(), ValidationError> {
        match self {
            Notifier::Email(n) => n.validate_recipient(recipient),
            Notifier::Sms(n) => n.validate_recipient(recipient),
            Notifier::Push(n) => n.validate_recipient(recipient),
            Notifier::Mock(n) => n.validate_recipient(recipient),
        }
    }

    /// Deliver without checking preconditions.
    pub async fn send(&self, message: &NotificationMessage) -> NotificationResult {
        let delivered = match self {
            Notifier::Email(n) => n.deliver(message).await,
            Notifier::Sms(n) => n.deliver(message).await,
            Notifier::Push(n) => n.deliver(message).await,
            Notifier::Mock(n) => n.deliver(message).await,
        };

        match delivered {
            Ok(id) => NotificationResult::ok(self.channel(), id),
            Err(e) => NotificationResult::failed(self.channel(), e.to_string()),
        }
    }

    /// Deliver if the notifier is enabled and the recipient is valid.
    pub async fn send_if_enabled(&self, message: &NotificationMessage) -> NotificationResult {
        if !self.is_enabled() {
            return NotificationResult::failed(self.channel(), NotifyError::Disabled.to_string());
        }
        if let Err(e) = self.validate_recipient(&message.recipient) {
            return NotificationResult::failed(self.channel(), e.to_string());
        }
        self.send(message).await
    }
}

/// Channel backends to build, from configuration.
#[derive(Debug, Clone, Default)]
pub struct NotifyConfig {
    pub email: Option<EmailConfig>,
    pub sms: Option<SmsConfig>,
    pub push: Option<PushConfig>,
    /// Use in-memory notifiers for every channel
    pub use_mock: bool,
    pub timeout_secs: Option<u64>,
}

/// Health of one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub channel: Channel,
    pub enabled: bool,
    /// Configured and enabled
    pub healthy: bool,
    pub provider: &'static str,
}

/// Routes messages to one notifier per channel.
#[derive(Debug)]
pub struct NotificationDispatcher {
    notifiers: BTreeMap<Channel, Notifier>,
    timeout: Duration,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

impl NotificationDispatcher {
    /// A dispatcher with no channels configured.
    pub fn new(timeout: Duration) -> Self {
        Self {
            notifiers: BTreeMap::new(),
            timeout,
        }
    }

    /// Register a notifier, replacing any for the same channel.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifiers.insert(notifier.channel(), notifier);
        self
    }

    /// Mock notifiers on every channel.
    pub fn mock(timeout: Duration) -> Self {
        Channel::ALL
            .into_iter()
            .fold(Self::new(timeout), |d, channel| {
                d.with_notifier(Notifier::Mock(MockNotifier::new(channel)))
            })
    }

    /// Build notifiers for every channel with complete settings.
    ///
    /// A channel without settings, or whose notifier fails to build, is
    /// left unconfigured and logged. Must be called from within a tokio
    /// runtime when email is configured.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));

        if config.use_mock {
            info!("Using mock notifiers for all channels");
            return Self::mock(timeout);
        }

        let mut dispatcher = Self::new(timeout);

        match &config.email {
            Some(cfg) => match EmailNotifier::new(cfg.clone()) {
                Ok(n) => dispatcher = dispatcher.with_notifier(Notifier::Email(n)),
                Err(e) => error!(error = %e, "Failed to initialize email notifier"),
            },
            None => warn!("SMTP settings incomplete - email notifications disabled"),
        }

        match &config.sms {
            Some(cfg) => match SmsNotifier::new(cfg.clone()) {
                Ok(n) => dispatcher = dispatcher.with_notifier(Notifier::Sms(n)),
                Err(e) => error!(error = %e, "Failed to initialize SMS notifier"),
            },
            None => warn!("Twilio settings incomplete - SMS notifications disabled"),
        }

        match &config.push {
            Some(cfg) => match PushNotifier::new(cfg.clone()) {
                Ok(n) => dispatcher = dispatcher.with_notifier(Notifier::Push(n)),
                Err(e) => error!(error = %e, "Failed to initialize push notifier"),
            },
            None => warn!("FIREBASE_CREDENTIALS_PATH not set - push notifications disabled"),
        }

        dispatcher
    }

    pub fn notifier(&self, channel: Channel) -> Option<&Notifier> {
        self.notifiers.get(&channel)
    }

    /// Send one message on one channel.
    ///
    /// Never fails: every problem, including a timeout, comes back as an
    /// unsuccessful result.
    pub async fn send(&self, channel: Channel, message: &NotificationMessage) -> NotificationResult {
        let result = match self.notifiers.get(&channel) {
            None => NotificationResult::failed(channel, NotifyError::NotConfigured(channel).to_string()),
            Some(notifier) => {
                let message = if message.channel == channel {
                    message.clone()
                } else {
                    message.readdressed(channel, message.recipient.clone())
                };
                match tokio::time::timeout(self.timeout, notifier.send_if_enabled(&message)).await {
                    Ok(result) => result,
                    Err(_) => NotificationResult::failed(
                        channel,
                        NotifyError::Timeout {
                            channel,
                            secs: self.timeout.as_secs(),
                        }
                        .to_string(),
                    ),
                }
            }
        };

        if result.success {
            info!(
                %channel,
                recipient = %message.recipient,
                message_id = result.message_id.as_deref().unwrap_or(""),
                "Notification sent"
            );
        } else {
            error!(
                %channel,
                recipient = %message.recipient,
                error = result.error.as_deref().unwrap_or(""),
                "Notification failed"
            );
        }

        result
    }

    /// Send the same message to each recipient on its channel.
    ///
    /// All sends run concurrently; results come back in recipient order.
    pub async fn dispatch(
        &self,
        message: &NotificationMessage,
        recipients: &[Recipient],
    ) -> Vec<NotificationResult> {
        join_all(recipients.iter().map(|r| {
            let msg = message.readdressed(r.channel, r.address.clone());
            async move { self.send(r.channel, &msg).await }
        }))
        .await
    }

    /// Alert each recipient that a service is running late.
    pub async fn send_delay_alert(
        &self,
        station_name: &str,
        service_details: &str,
        delay_minutes: i64,
        recipients: &[Recipient],
    ) -> Vec<NotificationResult> {
        join_all(recipients.iter().map(|r| {
            let msg = delay_alert(r.channel, &r.address, station_name, service_details, delay_minutes);
            async move { self.send(r.channel, &msg).await }
        }))
        .await
    }

    /// Alert each recipient to a disruption at a station.
    pub async fn send_disruption_alert(
        &self,
        station_name: &str,
        details: &str,
        recipients: &[Recipient],
    ) -> Vec<NotificationResult> {
        join_all(recipients.iter().map(|r| {
            let msg = disruption_alert(r.channel, &r.address, station_name, details);
            async move { self.send(r.channel, &msg).await }
        }))
        .await
    }

    /// Status of every channel, configured or not.
    pub fn status(&self) -> Vec<ChannelStatus> {
        Channel::ALL
            .into_iter()
            .map(|channel| match self.notifiers.get(&channel) {
                Some(n) => ChannelStatus {
                    channel,
                    enabled: n.is_enabled(),
                    healthy: n.is_enabled(),
                    provider: n.provider(),
                },
                None => ChannelStatus {
                    channel,
                    enabled: false,
                    healthy: false,
                    provider: "none",
                },
            })
            .collect()
    }

    /// Turn a channel on or off. Returns false if it has no notifier.
    pub fn set_enabled(&self, channel: Channel, enabled: bool) -> bool {
        match self.notifiers.get(&channel) {
            Some(n) => {
                n.set_enabled(enabled);
                info!(%channel, enabled, "Notifier toggled");
                true
            }
            None => {
                warn!(%channel, "No notifier to toggle");
                false
            }
        }
    }
}
