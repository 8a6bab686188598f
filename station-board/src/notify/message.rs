//! Notification payloads and per-channel outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{Channel, Priority};

/// A message addressed to one recipient on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Email address, phone number or device token, depending on channel.
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub channel: Channel,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl NotificationMessage {
    pub fn new(
        channel: Channel,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            channel,
            priority: Priority::default(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Copy of this message readdressed to another channel and recipient.
    pub fn readdressed(&self, channel: Channel, recipient: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            channel,
            ..self.clone()
        }
    }
}

/// Outcome of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub channel: Channel,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn ok(channel: Channel, message_id: impl Into<String>) -> Self {
        Self {
            channel,
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failed(channel: Channel, error: impl Into<String>) -> Self {
        Self {
            channel,
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Where to deliver on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub channel: Channel,
    pub address: String,
}

impl Recipient {
    pub fn new(channel: Channel, address: impl Into<String>) -> Self {
        Self {
            channel,
            address: address.into(),
        }
    }
}

/// Delay alert for one channel, worded for that channel.
pub fn delay_alert(
    channel: Channel,
    recipient: &str,
    station_name: &str,
    service_details: &str,
    delay_minutes: i64,
) -> NotificationMessage {
    let (subject, body) = match channel {
        Channel::Email => (
            format!("Train Delay Alert - {station_name}"),
            format!(
                "Train Delay Notification\n\n\
                 Station: {station_name}\n\
                 Service: {service_details}\n\
                 Delay: {delay_minutes} minutes\n\n\
                 This is an automated notification from the station board service."
            ),
        ),
        Channel::Sms => (
            format!("Train Delay - {station_name}"),
            format!("Service: {service_details}\nDelay: {delay_minutes} min"),
        ),
        Channel::Push => (
            format!("Train Delay - {station_name}"),
            format!("{service_details} is delayed by {delay_minutes} minutes"),
        ),
    };

    NotificationMessage::new(channel, recipient, subject, body)
        .with_priority(Priority::High)
        .with_metadata("notification_type", "train_delay")
        .with_metadata("station_name", station_name)
        .with_metadata("delay_minutes", delay_minutes.to_string())
        .with_metadata("service_details", service_details)
}

/// Disruption alert for one channel, worded for that channel.
pub fn disruption_alert(
    channel: Channel,
    recipient: &str,
    station_name: &str,
    details: &str,
) -> NotificationMessage {
    let (subject, body) = match channel {
        Channel::Email => (
            format!("Service Disruption Alert - {station_name}"),
            format!(
                "Service Disruption Notification\n\n\
                 Station: {station_name}\n\
                 Disruption: {details}\n\n\
                 This is an automated notification from the station board service."
            ),
        ),
        Channel::Sms => (
            format!("Service Disruption - {station_name}"),
            format!("Disruption: {details}"),
        ),
        Channel::Push => (
            format!("Service Disruption - {station_name}"),
            details.to_string(),
        ),
    };

    NotificationMessage::new(channel, recipient, subject, body)
        .with_priority(Priority::Urgent)
        .with_metadata("notification_type", "service_disruption")
        .with_metadata("station_name", station_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readdressed_keeps_content() {
        let msg = NotificationMessage::new(Channel::Email, "a@example.com", "Subj", "Body")
            .with_priority(Priority::High)
            .with_metadata("k", "v");
        let sms = msg.readdressed(Channel::Sms, "+447700900123");

        assert_eq!(sms.channel, Channel::Sms);
        assert_eq!(sms.recipient, "+447700900123");
        assert_eq!(sms.subject, "Subj");
        assert_eq!(sms.priority, Priority::High);
        assert_eq!(sms.metadata.get("k").map(String::as_str), Some("v"));
    }

    #[test]
    fn result_constructors() {
        let ok = NotificationResult::ok(Channel::Push, "id-1");
        assert!(ok.success);
        assert_eq!(ok.message_id.as_deref(), Some("id-1"));
        assert_eq!(ok.error, None);

        let failed = NotificationResult::failed(Channel::Sms, "boom");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn delay_alert_wording_per_channel() {
        let email = delay_alert(Channel::Email, "a@example.com", "York", "10:32 to London Kings Cross", 12);
        assert_eq!(email.subject, "Train Delay Alert - York");
        assert!(email.body.contains("Delay: 12 minutes"));
        assert_eq!(email.priority, Priority::High);

        let sms = delay_alert(Channel::Sms, "+447700900123", "York", "10:32 to London Kings Cross", 12);
        assert_eq!(sms.body, "Service: 10:32 to London Kings Cross\nDelay: 12 min");

        let push = delay_alert(Channel::Push, "tok", "York", "10:32 to London Kings Cross", 12);
        assert_eq!(push.body, "10:32 to London Kings Cross is delayed by 12 minutes");
        assert_eq!(push.metadata["delay_minutes"], "12");
    }

    #[test]
    fn disruption_alert_is_urgent() {
        let msg = disruption_alert(Channel::Sms, "+447700900123", "Leeds", "Signal failure");
        assert_eq!(msg.priority, Priority::Urgent);
        assert_eq!(msg.subject, "Service Disruption - Leeds");
        assert_eq!(msg.metadata["notification_type"], "service_disruption");
    }

    #[test]
    fn message_deserializes_with_defaults() {
        let msg: NotificationMessage = serde_json::from_str(
            r#"{"recipient": "x", "subject": "s", "body": "b", "channel": "EMAIL"}"#,
        )
        .unwrap();
        assert_eq!(msg.channel, Channel::Email);
        assert_eq!(msg.priority, Priority::Normal);
        assert!(msg.metadata.is_empty());
    }
}
