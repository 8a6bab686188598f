//! Darwin client error types.

use std::fmt;

/// Errors from the Darwin HTTP client.
#[derive(Debug)]
pub enum DarwinError {
    /// HTTP request failed (connection refused, DNS, etc.)
    Http(reqwest::Error),

    /// Request did not complete within the configured timeout
    Timeout,

    /// JSON deserialization failed
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    ApiError { status: u16, message: String },

    /// Rate limited by the API
    RateLimited,

    /// Invalid API key or unauthorized
    Unauthorized,

    /// Client could not be built from its configuration
    NotConfigured(String),
}

impl DarwinError {
    /// Classify a non-success upstream status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => DarwinError::Unauthorized,
            429 => DarwinError::RateLimited,
            504 => DarwinError::Timeout,
            _ => DarwinError::ApiError {
                status,
                message: message.into(),
            },
        }
    }

    /// Whether the failure was the upstream taking too long.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DarwinError::Timeout)
    }

    /// Upstream HTTP status, when the API answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            DarwinError::ApiError { status, .. } => Some(*status),
            DarwinError::RateLimited => Some(429),
            DarwinError::Unauthorized => Some(401),
            _ => None,
        }
    }
}

impl fmt::Display for DarwinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DarwinError::Http(e) => write!(f, "HTTP error: {e}"),
            DarwinError::Timeout => write!(f, "request to Darwin API timed out"),
            DarwinError::Json { message, body } => {
                write!(f, "JSON parse error: {message}")?;
                if let Some(body) = body {
                    write!(f, " (body: {body})")?;
                }
                Ok(())
            }
            DarwinError::ApiError { status, message } => {
                write!(f, "API error {status}: {message}")
            }
            DarwinError::RateLimited => write!(f, "rate limited by Darwin API"),
            DarwinError::Unauthorized => write!(f, "unauthorized (invalid API key)"),
            DarwinError::NotConfigured(msg) => write!(f, "not configured: {msg}"),
        }
    }
}

impl std::error::Error for DarwinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DarwinError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DarwinError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DarwinError::Timeout
        } else {
            DarwinError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DarwinError::Timeout;
        assert_eq!(err.to_string(), "request to Darwin API timed out");

        let err = DarwinError::ApiError {
            status: 503,
            message: "Service Unavailable".into(),
        };
        assert_eq!(err.to_string(), "API error 503: Service Unavailable");

        let err = DarwinError::Json {
            message: "expected string".into(),
            body: Some("{}".into()),
        };
        assert!(err.to_string().contains("JSON parse error"));
        assert!(err.to_string().contains("expected string"));
    }

    #[test]
    fn status_codes() {
        assert_eq!(DarwinError::RateLimited.status(), Some(429));
        assert_eq!(DarwinError::Unauthorized.status(), Some(401));
        assert_eq!(
            DarwinError::ApiError {
                status: 500,
                message: String::new()
            }
            .status(),
            Some(500)
        );
        assert_eq!(DarwinError::Timeout.status(), None);
        assert!(DarwinError::Timeout.is_timeout());
    }

    #[test]
    fn classifies_statuses() {
        assert!(matches!(DarwinError::from_status(403, ""), DarwinError::Unauthorized));
        assert!(matches!(DarwinError::from_status(429, ""), DarwinError::RateLimited));
        assert!(DarwinError::from_status(504, "").is_timeout());
        assert_eq!(DarwinError::from_status(503, "down").status(), Some(503));
    }
}
