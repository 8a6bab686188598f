//! Environment-driven settings.
//!
//! Everything is read through a lookup function so tests can supply a map
//! instead of touching the process environment.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::board::BoardConfig;
use crate::darwin::{DarwinConfig, MAX_ROWS};
use crate::notify::{EmailConfig, NotifyConfig, PushConfig, SmsConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SMTP_PORT: u16 = 587;

/// Configuration errors. Missing optional settings are never errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Log verbosity, in the names operators already use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    /// The matching `tracing` filter directive.
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            // tracing has no level above error
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" => Ok(LogLevel::Critical),
            _ => Err("expected one of DEBUG, INFO, WARNING, ERROR, CRITICAL".to_string()),
        }
    }
}

/// Which origins may call the API cross-site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl CorsOrigins {
    fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsOrigins::Any
        } else {
            CorsOrigins::List(origins)
        }
    }
}

/// All settings for the server.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub darwin: DarwinConfig,
    pub board: BoardConfig,
    pub notify: NotifyConfig,
    /// Station list override; the bundled list when unset
    pub stations_file: Option<PathBuf>,
    /// Serve canned boards from this directory instead of calling Darwin
    pub mock_boards_dir: Option<PathBuf>,
    pub log_level: LogLevel,
    pub cors_origins: CorsOrigins,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings from a map (for tests).
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Read settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs = parse_or(&get, "REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        let rows: u8 = parse_or(&get, "BOARD_ROWS", MAX_ROWS)?;
        let mut darwin = DarwinConfig::new(get("CONSUMER_KEY").unwrap_or_default())
            .with_num_rows(rows)
            .with_timeout(timeout_secs);
        if let Some(secret) = get("CONSUMER_SECRET") {
            darwin = darwin.with_consumer_secret(secret);
        }
        if let Some(url) = get("LDBWS_BASE_URL") {
            darwin = darwin.with_base_url(url);
        }

        let board = BoardConfig {
            status_threshold_mins: parse_or(&get, "DELAY_THRESHOLD_MINS", 0)?,
        };

        let email = match (get("SMTP_HOST"), get("SMTP_USERNAME"), get("SMTP_PASSWORD")) {
            (Some(host), Some(username), Some(password)) => {
                let mut email = EmailConfig::new(host, username, password);
                email.port = parse_or(&get, "SMTP_PORT", DEFAULT_SMTP_PORT)?;
                email.use_tls = parse_bool_or(&get, "SMTP_USE_TLS", true)?;
                email.from = get("SMTP_FROM");
                email.timeout_secs = timeout_secs;
                Some(email)
            }
            _ => None,
        };

        let sms = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_FROM_NUMBER"),
        ) {
            (Some(sid), Some(token), Some(from)) => {
                let mut sms = SmsConfig::new(sid, token, from);
                sms.timeout_secs = timeout_secs;
                Some(sms)
            }
            _ => None,
        };

        let push = get("FIREBASE_CREDENTIALS_PATH").map(|path| {
            let mut push = PushConfig::new(path);
            push.timeout_secs = timeout_secs;
            push
        });

        let notify = NotifyConfig {
            email,
            sms,
            push,
            use_mock: parse_bool_or(&get, "USE_MOCK_NOTIFIERS", false)?,
            timeout_secs: Some(timeout_secs),
        };

        let log_level = match get("LOG_LEVEL") {
            Some(raw) => raw
                .parse::<LogLevel>()
                .map_err(|e| ConfigError::invalid("LOG_LEVEL", &raw, e))?,
            None => LogLevel::default(),
        };

        let bind_addr = match get("BIND_ADDR") {
            Some(raw) => raw
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::invalid("BIND_ADDR", &raw, e))?,
            None => DEFAULT_BIND_ADDR
                .parse::<SocketAddr>()
                .map_err(|e| ConfigError::invalid("BIND_ADDR", DEFAULT_BIND_ADDR, e))?,
        };

        Ok(Self {
            darwin,
            board,
            notify,
            stations_file: get("STATIONS_FILE").map(PathBuf::from),
            mock_boards_dir: get("MOCK_BOARDS_DIR").map(PathBuf::from),
            log_level,
            cors_origins: CorsOrigins::parse(&get("CORS_ORIGINS").unwrap_or_default()),
            bind_addr,
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => raw.parse().map_err(|e| ConfigError::invalid(var, &raw, e)),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(var, &raw, "expected a boolean")),
        },
        None => Ok(default),
    }
}
