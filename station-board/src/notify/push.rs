//! Push delivery through Firebase Cloud Messaging (HTTP v1).
//!
//! Access tokens come from the service-account credentials: a signed JWT
//! is exchanged at the account's `token_uri` for a short-lived bearer
//! token, which is reused until shortly before it expires.
//!
//! Besides single devices, a message can go to a topic or to many device
//! tokens at once, and device tokens can be subscribed to topics through the
//! instance ID service.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{Channel, ValidationError};

use super::error::NotifyError;
use super::message::{NotificationMessage, NotificationResult};

const DEFAULT_FCM_BASE: &str = "https://fcm.googleapis.com";

const DEFAULT_IID_BASE: &str = "https://iid.googleapis.com";

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Shortest device token accepted.
const MIN_TOKEN_LEN: usize = 140;

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the access token expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_:-]+$").expect("token pattern is valid"));

static TOPIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.~%-]{1,900}$").expect("topic pattern is valid"));

/// FCM settings.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Path to the service-account JSON file
    pub credentials_path: PathBuf,
    pub fcm_base: String,
    /// Instance ID service, for topic subscriptions
    pub iid_base: String,
    pub timeout_secs: u64,
}

impl PushConfig {
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            fcm_base: DEFAULT_FCM_BASE.to_string(),
            iid_base: DEFAULT_IID_BASE.to_string(),
            timeout_secs: 30,
        }
    }

    /// Point at another FCM host (for testing).
    pub fn with_fcm_base(mut self, url: impl Into<String>) -> Self {
        self.fcm_base = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Point at another instance ID host (for testing).
    pub fn with_iid_base(mut self, url: impl Into<String>) -> Self {
        self.iid_base = url.into().trim_end_matches('/').to_string();
        self
    }
}

/// The fields of a service-account file this notifier reads.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccount {
    project_id: String,
    private_key: String,
    client_email: String,
    token_uri: String,
}

impl ServiceAccount {
    fn load(path: &Path) -> Result<Self, NotifyError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            NotifyError::Credentials(format!("invalid service account {}: {e}", path.display()))
        })
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BatchAddResponse {
    #[serde(default)]
    results: Vec<BatchAddResult>,
}

#[derive(Debug, Deserialize)]
struct BatchAddResult {
    error: Option<String>,
}

/// Per-token outcome of a multicast send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MulticastReport {
    pub success_count: usize,
    pub failure_count: usize,
    /// One result per token, in the order given
    pub responses: Vec<NotificationResult>,
}

/// Outcome of a topic subscription request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub errors: Vec<String>,
}

/// Who an FCM message is addressed to.
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Token(&'a str),
    Topic(&'a str),
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Sends push notifications to device tokens for one Firebase project.
pub struct PushNotifier {
    http: reqwest::Client,
    account: ServiceAccount,
    signing_key: EncodingKey,
    fcm_base: String,
    iid_base: String,
    token: Mutex<Option<AccessToken>>,
    enabled: AtomicBool,
}

impl std::fmt::Debug for PushNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushNotifier")
            .field("project_id", &self.account.project_id)
            .field("client_email", &self.account.client_email)
            .field("fcm_base", &self.fcm_base)
            .finish_non_exhaustive()
    }
}

impl PushNotifier {
    /// Load credentials and prepare the signing key. No network access.
    pub fn new(config: PushConfig) -> Result<Self, NotifyError> {
        let account = ServiceAccount::load(&config.credentials_path)?;
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| NotifyError::Credentials(format!("invalid private key: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            account,
            signing_key,
            fcm_base: config.fcm_base,
            iid_base: config.iid_base,
            token: Mutex::new(None),
            enabled: AtomicBool::new(true),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn validate_recipient(&self, recipient: &str) -> Result<(), ValidationError> {
        validate_device_token(recipient)
    }

    /// Send one message, returning the FCM message name.
    pub async fn deliver(&self, message: &NotificationMessage) -> Result<String, NotifyError> {
        self.send_to(Target::Token(message.recipient.trim()), message).await
    }

    /// Send to every device subscribed to `topic`, ignoring the message's
    /// recipient.
    pub async fn send_to_topic(
        &self,
        message: &NotificationMessage,
        topic: &str,
    ) -> Result<String, NotifyError> {
        let topic = validate_topic(topic)?;
        let name = self.send_to(Target::Topic(topic), message).await?;
        info!(topic, message_id = %name, "Topic push notification sent");
        Ok(name)
    }

    /// Send the same message to each device token concurrently.
    pub async fn send_multicast(
        &self,
        message: &NotificationMessage,
        tokens: &[String],
    ) -> MulticastReport {
        let responses = join_all(tokens.iter().map(|token| async move {
            let token = token.trim();
            if let Err(e) = validate_device_token(token) {
                return NotificationResult::failed(Channel::Push, e.to_string());
            }
            match self.send_to(Target::Token(token), message).await {
                Ok(name) => NotificationResult::ok(Channel::Push, name),
                Err(e) => NotificationResult::failed(Channel::Push, e.to_string()),
            }
        }))
        .await;

        let success_count = responses.iter().filter(|r| r.success).count();
        let failure_count = responses.len() - success_count;
        info!(success_count, failure_count, "Multicast push notification sent");

        MulticastReport {
            success_count,
            failure_count,
            responses,
        }
    }

    /// Subscribe device tokens to `topic`.
    pub async fn subscribe_to_topic(
        &self,
        tokens: &[String],
        topic: &str,
    ) -> Result<SubscriptionReport, NotifyError> {
        let topic = validate_topic(topic)?;
        let access_token = self.access_token().await?;

        let response = self
            .http
            .post(format!("{}/iid/v1:batchAdd", self.iid_base))
            .bearer_auth(&access_token)
            .header("access_token_auth", "true")
            .json(&json!({
                "to": format!("/topics/{topic}"),
                "registration_tokens": tokens,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider {
                provider: "IID",
                status: status.as_u16(),
                message: text,
            });
        }

        let batch: BatchAddResponse = response.json().await?;
        let errors: Vec<String> = batch.results.into_iter().filter_map(|r| r.error).collect();
        let report = SubscriptionReport {
            success_count: tokens.len().saturating_sub(errors.len()),
            failure_count: errors.len(),
            errors,
        };

        if report.failure_count > 0 {
            warn!(topic, failed = report.failure_count, "Some topic subscriptions failed");
        }
        info!(topic, subscribed = report.success_count, "Topic subscription processed");
        Ok(report)
    }

    async fn send_to(
        &self,
        target: Target<'_>,
        message: &NotificationMessage,
    ) -> Result<String, NotifyError> {
        let access_token = self.access_token().await?;
        let url = format!(
            "{}/v1/projects/{}/messages:send",
            self.fcm_base, self.account.project_id
        );

        let mut payload = json!({
            "message": {
                "notification": {
                    "title": message.subject,
                    "body": message.body,
                },
                "data": message.metadata,
            }
        });
        let (key, address) = match target {
            Target::Token(token) => ("token", token),
            Target::Topic(topic) => ("topic", topic),
        };
        payload["message"][key] = json!(address);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&access_token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider {
                provider: "FCM",
                status: status.as_u16(),
                message: text,
            });
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.name)
    }

    /// A valid access token, minting a new one when needed.
    async fn access_token(&self) -> Result<String, NotifyError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now();

        if let Some(token) = cached.as_ref() {
            if token.expires_at > now {
                return Ok(token.value.clone());
            }
        }

        let assertion = self.sign_assertion(now)?;
        let response = self
            .http
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Provider {
                provider: "OAuth2",
                status: status.as_u16(),
                message: text,
            });
        }

        let minted: TokenResponse = response.json().await?;
        debug!(
            client_email = %self.account.client_email,
            expires_in = minted.expires_in,
            "Minted FCM access token"
        );

        let token = AccessToken {
            value: minted.access_token,
            expires_at: now + chrono::Duration::seconds(minted.expires_in - EXPIRY_MARGIN_SECS),
        };
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, NotifyError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| NotifyError::Credentials(format!("failed to sign assertion: {e}")))
    }
}

/// Check an FCM registration token's shape.
pub fn validate_device_token(recipient: &str) -> Result<(), ValidationError> {
    let token = recipient.trim();
    if token.len() >= MIN_TOKEN_LEN && TOKEN_PATTERN.is_match(token) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRecipient {
            channel: Channel::Push,
            recipient: recipient.to_string(),
        })
    }
}

/// Check an FCM topic name, returning it without whitespace or a
/// `/topics/` prefix.
fn validate_topic(topic: &str) -> Result<&str, NotifyError> {
    let topic = topic.trim();
    let topic = topic.strip_prefix("/topics/").unwrap_or(topic);
    if TOPIC_PATTERN.is_match(topic) {
        Ok(topic)
    } else {
        Err(NotifyError::Message(format!("invalid topic name: {topic:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/service_account.json"
    );

    fn device_token() -> String {
        format!("dQw4w9WgXcQ:APA91b{}", "x".repeat(140))
    }

    /// Copy the fixture credentials with `token_uri` pointed at `server`.
    fn credentials_for(server: &MockServer, dir: &tempfile::TempDir) -> PathBuf {
        let mut account: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(FIXTURE).unwrap()).unwrap();
        account["token_uri"] = serde_json::Value::String(server.url("/token"));
        let path = dir.path().join("service_account.json");
        std::fs::write(&path, account.to_string()).unwrap();
        path
    }

    async fn mock_token_endpoint(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(200)
                    .json_body(json!({"access_token": "ya29.test", "expires_in": 3600}));
            })
            .await;
    }

    fn notifier_for(server: &MockServer, dir: &tempfile::TempDir) -> PushNotifier {
        PushNotifier::new(
            PushConfig::new(credentials_for(server, dir))
                .with_fcm_base(server.base_url())
                .with_iid_base(server.base_url()),
        )
        .unwrap()
    }

    #[test]
    fn topic_names() {
        assert_eq!(validate_topic(" york-delays ").unwrap(), "york-delays");
        assert_eq!(validate_topic("/topics/EUS_1.x~%").unwrap(), "EUS_1.x~%");
        assert!(validate_topic("").is_err());
        assert!(validate_topic("no spaces").is_err());
    }

    #[test]
    fn token_validation() {
        assert!(validate_device_token(&device_token()).is_ok());
        assert!(validate_device_token("short-token").is_err());
        let bad_chars = format!("{}!", "a".repeat(150));
        assert!(validate_device_token(&bad_chars).is_err());
    }

    #[test]
    fn missing_credentials_file() {
        let err = PushNotifier::new(PushConfig::new("/nonexistent/creds.json")).unwrap_err();
        assert!(matches!(err, NotifyError::Credentials(_)));
    }

    #[test]
    fn loads_fixture_credentials() {
        let notifier = PushNotifier::new(PushConfig::new(FIXTURE)).unwrap();
        assert_eq!(notifier.project_id(), "station-board-test");
        assert!(notifier.sign_assertion(Utc::now()).is_ok());
    }

    #[tokio::test]
    async fn mints_token_once_and_sends() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();

        let token_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .x_www_form_urlencoded_tuple("grant_type", JWT_BEARER_GRANT)
                    .x_www_form_urlencoded_key_exists("assertion");
                then.status(200).json_body(json!({
                    "access_token": "ya29.test",
                    "expires_in": 3600,
                    "token_type": "Bearer"
                }));
            })
            .await;

        let send_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/projects/station-board-test/messages:send")
                    .header("authorization", "Bearer ya29.test")
                    .json_body_partial(r#"{"message": {"notification": {"title": "Delay"}}}"#);
                then.status(200)
                    .json_body(json!({"name": "projects/station-board-test/messages/0:1"}));
            })
            .await;

        let notifier = PushNotifier::new(
            PushConfig::new(credentials_for(&server, &dir)).with_fcm_base(server.base_url()),
        )
        .unwrap();

        let msg = NotificationMessage::new(Channel::Push, device_token(), "Delay", "10:32 late");
        let first = notifier.deliver(&msg).await.unwrap();
        let second = notifier.deliver(&msg).await.unwrap();

        assert_eq!(first, "projects/station-board-test/messages/0:1");
        assert_eq!(second, first);
        token_mock.assert_hits_async(1).await;
        send_mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn token_exchange_failure() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        server
            .mock_async(|when, then| {
                when.method(POST).path("/token");
                then.status(400).body(r#"{"error": "invalid_grant"}"#);
            })
            .await;

        let notifier = PushNotifier::new(
            PushConfig::new(credentials_for(&server, &dir)).with_fcm_base(server.base_url()),
        )
        .unwrap();

        let msg = NotificationMessage::new(Channel::Push, device_token(), "Delay", "late");
        let err = notifier.deliver(&msg).await.unwrap_err();
        assert!(matches!(
            err,
            NotifyError::Provider {
                provider: "OAuth2",
                status: 400,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn sends_to_topic() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        mock_token_endpoint(&server).await;

        let send_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/projects/station-board-test/messages:send")
                    .json_body_partial(r#"{"message": {"topic": "york-delays"}}"#);
                then.status(200)
                    .json_body(json!({"name": "projects/station-board-test/messages/7"}));
            })
            .await;

        let notifier = notifier_for(&server, &dir);
        let msg = NotificationMessage::new(Channel::Push, "", "Delay", "10:32 late");

        let name = notifier.send_to_topic(&msg, "/topics/york-delays").await.unwrap();
        assert_eq!(name, "projects/station-board-test/messages/7");
        send_mock.assert_async().await;

        let err = notifier.send_to_topic(&msg, "york delays").await.unwrap_err();
        assert!(matches!(err, NotifyError::Message(_)));
        send_mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn multicast_reports_each_token() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        mock_token_endpoint(&server).await;

        let send_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/projects/station-board-test/messages:send");
                then.status(200)
                    .json_body(json!({"name": "projects/station-board-test/messages/1"}));
            })
            .await;

        let notifier = notifier_for(&server, &dir);
        let msg = NotificationMessage::new(Channel::Push, "", "Delay", "10:32 late");
        let tokens = vec![device_token(), "short".to_string(), device_token()];

        let report = notifier.send_multicast(&msg, &tokens).await;

        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 1);
        let sent: Vec<bool> = report.responses.iter().map(|r| r.success).collect();
        assert_eq!(sent, [true, false, true]);
        assert!(report.responses[1].error.as_deref().unwrap().contains("short"));
        send_mock.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn subscribes_tokens_to_topic() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().unwrap();
        mock_token_endpoint(&server).await;

        let batch_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/iid/v1:batchAdd")
                    .header("authorization", "Bearer ya29.test")
                    .header("access_token_auth", "true")
                    .json_body_partial(r#"{"to": "/topics/york-delays"}"#);
                then.status(200)
                    .json_body(json!({"results": [{}, {"error": "NOT_FOUND"}]}));
            })
            .await;

        let notifier = notifier_for(&server, &dir);
        let report = notifier
            .subscribe_to_topic(&[device_token(), "stale".to_string()], "york-delays")
            .await
            .unwrap();

        assert_eq!(
            report,
            SubscriptionReport {
                success_count: 1,
                failure_count: 1,
                errors: vec!["NOT_FOUND".to_string()],
            }
        );
        batch_mock.assert_async().await;
    }
}
