//! Email delivery over SMTP.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::stub::AsyncStubTransport;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regex::Regex;

use crate::domain::{Channel, ValidationError};

use super::error::NotifyError;
use super::message::NotificationMessage;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern is valid")
});

/// SMTP settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Upgrade with STARTTLS before authenticating
    pub use_tls: bool,
    /// Sender address; the username when unset
    pub from: Option<String>,
    pub timeout_secs: u64,
}

impl EmailConfig {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 587,
            username: username.into(),
            password: password.into(),
            use_tls: true,
            from: None,
            timeout_secs: 30,
        }
    }
}

/// Where built messages go.
enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// Records messages in memory
    Stub(AsyncStubTransport),
}

/// Sends plain-text email through one SMTP relay.
pub struct EmailNotifier {
    transport: EmailTransport,
    from: Mailbox,
    relay: String,
    enabled: AtomicBool,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("relay", &self.relay)
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

impl EmailNotifier {
    /// Build the transport. Must be called from within a tokio runtime,
    /// since the connection pool starts a background task.
    pub fn new(config: EmailConfig) -> Result<Self, NotifyError> {
        let from = parse_sender(config.from.as_deref().unwrap_or(&config.username))?;

        let builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(config.username.clone(), config.password))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            transport: EmailTransport::Smtp(transport),
            from,
            relay: format!("{}:{}", config.host, config.port),
            enabled: AtomicBool::new(true),
        })
    }

    /// Deliver into an in-memory stub instead of a relay. Clones of `stub`
    /// share its message log.
    pub fn with_stub(from: &str, stub: AsyncStubTransport) -> Result<Self, NotifyError> {
        Ok(Self {
            transport: EmailTransport::Stub(stub),
            from: parse_sender(from)?,
            relay: "stub".to_string(),
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
        validate_email(recipient)
    }

    /// Send one message, returning the server's reply as the message ID.
    /// The stub transport numbers messages instead.
    pub async fn deliver(&self, message: &NotificationMessage) -> Result<String, NotifyError> {
        let to = message
            .recipient
            .trim()
            .parse::<Mailbox>()
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        match &self.transport {
            EmailTransport::Smtp(transport) => {
                let response = transport.send(email).await?;
                Ok(response
                    .first_line()
                    .map(str::to_string)
                    .unwrap_or_else(|| response.code().to_string()))
            }
            EmailTransport::Stub(stub) => {
                stub.send(email)
                    .await
                    .map_err(|e| NotifyError::Message(e.to_string()))?;
                Ok(format!("stub_{}", stub.messages().await.len()))
            }
        }
    }
}

fn parse_sender(address: &str) -> Result<Mailbox, NotifyError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| NotifyError::Credentials(format!("invalid sender address: {e}")))
}

/// Check an email address against the accepted pattern.
pub fn validate_email(recipient: &str) -> Result<(), ValidationError> {
    if EMAIL_PATTERN.is_match(recipient.trim()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRecipient {
            channel: Channel::Email,
            recipient: recipient.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        for ok in [
            "user@example.com",
            "first.last+tag@mail.example.co.uk",
            " padded@example.org ",
        ] {
            assert!(validate_email(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn rejects_bad_addresses() {
        for bad in ["", "user", "user@", "@example.com", "user@example", "a b@example.com"] {
            assert!(
                matches!(
                    validate_email(bad),
                    Err(ValidationError::InvalidRecipient {
                        channel: Channel::Email,
                        ..
                    })
                ),
                "{bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn builds_without_connecting() {
        let mut config = EmailConfig::new("smtp.example.com", "alerts@example.com", "secret");
        config.use_tls = false;
        let notifier = EmailNotifier::new(config).unwrap();

        assert!(notifier.is_enabled());
        notifier.set_enabled(false);
        assert!(!notifier.is_enabled());
    }

    #[tokio::test]
    async fn delivers_built_message() {
        let stub = AsyncStubTransport::new_ok();
        let notifier = EmailNotifier::with_stub("alerts@example.com", stub.clone()).unwrap();

        let message = NotificationMessage::new(
            Channel::Email,
            " rider@example.com ",
            "Train Delay Alert - London Euston",
            "The 10:46 to Tring is running 5 minutes late",
        );
        assert_eq!(notifier.deliver(&message).await.unwrap(), "stub_1");

        let sent = stub.messages().await;
        assert_eq!(sent.len(), 1);
        let (envelope, raw) = &sent[0];
        assert_eq!(
            envelope.from().map(ToString::to_string).as_deref(),
            Some("alerts@example.com")
        );
        let to: Vec<String> = envelope.to().iter().map(ToString::to_string).collect();
        assert_eq!(to, vec!["rider@example.com"]);

        assert!(raw.contains("From: alerts@example.com"));
        assert!(raw.contains("To: rider@example.com"));
        assert!(raw.contains("Subject: Train Delay Alert - London Euston"));
        assert!(raw.contains("The 10:46 to Tring is running 5 minutes late"));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let notifier =
            EmailNotifier::with_stub("alerts@example.com", AsyncStubTransport::new_error())
                .unwrap();
        let message = NotificationMessage::new(Channel::Email, "rider@example.com", "s", "b");

        assert!(matches!(
            notifier.deliver(&message).await,
            Err(NotifyError::Message(_))
        ));
    }

    #[test]
    fn bad_sender_is_rejected() {
        let mut config = EmailConfig::new("smtp.example.com", "not an address", "secret");
        config.use_tls = false;
        assert!(matches!(
            EmailNotifier::new(config),
            Err(NotifyError::Credentials(_))
        ));
    }
}
