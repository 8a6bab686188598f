//! SMS delivery through the Twilio REST API.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{Channel, ValidationError};

use super::error::NotifyError;
use super::message::NotificationMessage;

const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Twilio's maximum message body length.
const MAX_BODY_CHARS: usize = 1600;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{10,15}$").expect("phone pattern is valid"));

/// Twilio account settings.
#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending number in E.164 form
    pub from_number: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl SmsConfig {
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            from_number: from_number.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
        }
    }

    /// Point at another API host (for testing).
    pub fn with_api_base(mut self, url: impl Into<String>) -> Self {
        self.api_base = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioError {
    code: Option<u32>,
    message: Option<String>,
}

/// Sends text messages from one Twilio number.
#[derive(Debug)]
pub struct SmsNotifier {
    http: reqwest::Client,
    config: SmsConfig,
    enabled: AtomicBool,
}

impl SmsNotifier {
    pub fn new(config: SmsConfig) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            enabled: AtomicBool::new(true),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn validate_recipient(&self, recipient: &str) -> Result<(), ValidationError> {
        validate_phone(recipient)
    }

    /// Send one message, returning the Twilio message SID.
    pub async fn deliver(&self, message: &NotificationMessage) -> Result<String, NotifyError> {
        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        );
        let to = clean_phone(&message.recipient);
        let body = sms_body(message);

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to.as_str()),
                ("From", self.config.from_number.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TwilioError>(&text) {
                Ok(TwilioError {
                    code: Some(code),
                    message: Some(msg),
                }) => format!("{code}: {msg}"),
                _ => text,
            };
            return Err(NotifyError::Provider {
                provider: "Twilio",
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = response.json().await?;
        Ok(resource.sid)
    }
}

/// Drop everything but digits and `+`.
fn clean_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Check a phone number, ignoring spaces and punctuation.
pub fn validate_phone(recipient: &str) -> Result<(), ValidationError> {
    if PHONE_PATTERN.is_match(&clean_phone(recipient)) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRecipient {
            channel: Channel::Sms,
            recipient: recipient.to_string(),
        })
    }
}

/// SMS has no subject line, so it leads the body.
fn sms_body(message: &NotificationMessage) -> String {
    let text = if message.subject.is_empty() {
        message.body.clone()
    } else {
        format!("{}\n\n{}", message.subject, message.body)
    };

    if text.chars().count() > MAX_BODY_CHARS {
        let mut truncated: String = text.chars().take(MAX_BODY_CHARS - 3).collect();
        truncated.push_str("...");
        truncated
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn phone_validation() {
        assert!(validate_phone("+447700900123").is_ok());
        assert!(validate_phone("+44 7700 900-123").is_ok());
        assert!(validate_phone("(+1) 415 555 0100").is_ok());

        for bad in ["07700900123", "+123", "+1234567890123456", "not-a-number", ""] {
            assert!(
                matches!(
                    validate_phone(bad),
                    Err(ValidationError::InvalidRecipient {
                        channel: Channel::Sms,
                        ..
                    })
                ),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn body_truncated_to_limit() {
        let msg = NotificationMessage::new(Channel::Sms, "+447700900123", "Subject", "x".repeat(2000));
        let body = sms_body(&msg);
        assert_eq!(body.chars().count(), MAX_BODY_CHARS);
        assert!(body.starts_with("Subject\n\nxxx"));
        assert!(body.ends_with("..."));
    }

    #[test]
    fn body_without_subject() {
        let msg = NotificationMessage::new(Channel::Sms, "+447700900123", "", "Just this");
        assert_eq!(sms_body(&msg), "Just this");
    }

    #[tokio::test]
    async fn sends_via_twilio() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/2010-04-01/Accounts/AC123/Messages.json")
                    .header("authorization", "Basic QUMxMjM6dG9rZW4=")
                    .x_www_form_urlencoded_tuple("To", "+447700900123")
                    .x_www_form_urlencoded_tuple("From", "+447700900000")
                    .x_www_form_urlencoded_tuple("Body", "Hello\n\nWorld");
                then.status(201)
                    .json_body(json!({"sid": "SM42", "status": "queued"}));
            })
            .await;

        let notifier = SmsNotifier::new(
            SmsConfig::new("AC123", "token", "+447700900000").with_api_base(server.base_url()),
        )
        .unwrap();

        let msg = NotificationMessage::new(Channel::Sms, "+44 7700 900123", "Hello", "World");
        let sid = notifier.deliver(&msg).await.unwrap();

        mock.assert_async().await;
        assert_eq!(sid, "SM42");
    }

    #[tokio::test]
    async fn twilio_error_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(400).json_body(json!({
                    "code": 21211,
                    "message": "The 'To' number is not a valid phone number.",
                    "status": 400
                }));
            })
            .await;

        let notifier = SmsNotifier::new(
            SmsConfig::new("AC123", "token", "+447700900000").with_api_base(server.base_url()),
        )
        .unwrap();

        let msg = NotificationMessage::new(Channel::Sms, "+447700900123", "Hi", "There");
        let err = notifier.deliver(&msg).await.unwrap_err();
        match err {
            NotifyError::Provider { status, message, .. } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("21211"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
