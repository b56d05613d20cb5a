//! Error types for tap-outbrain
//!
//! This module defines the error hierarchy for the whole crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! The retry layer only needs two questions answered about an error:
//! is it worth retrying ([`Error::is_retryable`]) and did the server say how
//! long to wait ([`Error::rate_limit_hint`]).

use crate::http::wait_from_msec_left;
use std::time::Duration;
use thiserror::Error;

/// The main error type for tap-outbrain
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Login rate limited: {message} (remaining: {remaining})")]
    RateLimitedAuth {
        message: String,
        remaining: String,
        retry_after: Duration,
    },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} (retryable): {body}")]
    RetryableRequest {
        status: u16,
        body: String,
        /// Value of the `rate-limit-msec-left` header, if the server sent one
        msec_left: Option<u64>,
    },

    #[error("HTTP {status}: {body}")]
    NonRetryableRequest { status: u16, body: String },

    #[error("Giving up after {attempts} attempts: {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    // ============================================================================
    // Data Processing Errors
    // ============================================================================
    #[error("Unexpected pagination data: {message}")]
    PaginationData { message: String },

    #[error("Failed to extract records from '{key}': {message}")]
    RecordExtraction { key: String, message: String },

    #[error("Undefined path variable: {variable}")]
    UndefinedVariable { variable: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a pagination data error
    pub fn pagination(message: impl Into<String>) -> Self {
        Self::PaginationData {
            message: message.into(),
        }
    }

    /// Create a record extraction error
    pub fn extraction(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RecordExtraction {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: impl Into<String>, msec_left: Option<u64>) -> Self {
        if is_retryable_status(status) {
            Self::RetryableRequest {
                status,
                body: body.into(),
                msec_left,
            }
        } else {
            Self::NonRetryableRequest {
                status,
                body: body.into(),
            }
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimitedAuth { .. } | Error::RetryableRequest { .. } => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Server-computed wait before the next attempt, if any
    pub fn rate_limit_hint(&self) -> Option<Duration> {
        match self {
            Error::RateLimitedAuth { retry_after, .. } => Some(*retry_after),
            Error::RetryableRequest {
                status: 429,
                msec_left: Some(ms),
                ..
            } => Some(wait_from_msec_left(*ms)),
            _ => None,
        }
    }

    /// Whether every other stream would fail the same way
    pub fn is_fatal_for_sync(&self) -> bool {
        match self {
            Error::Authentication { .. } => true,
            Error::ExhaustedRetries { source, .. } => {
                matches!(**source, Error::RateLimitedAuth { .. })
            }
            _ => false,
        }
    }
}

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Result type alias for tap-outbrain
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("username");
        assert_eq!(err.to_string(), "Missing required config field: username");

        let err = Error::from_status(404, "Not found", None);
        assert_eq!(err.to_string(), "HTTP 404: Not found");
    }

    #[test]
    fn test_status_classification() {
        assert!(Error::from_status(429, "", None).is_retryable());
        assert!(Error::from_status(500, "", None).is_retryable());
        assert!(Error::from_status(503, "", None).is_retryable());

        assert!(!Error::from_status(400, "", None).is_retryable());
        assert!(!Error::from_status(401, "", None).is_retryable());
        assert!(!Error::from_status(404, "", None).is_retryable());
        assert!(!Error::auth("bad credentials").is_retryable());
        assert!(!Error::pagination("missing totalCount").is_retryable());
    }

    #[test]
    fn test_rate_limit_hint() {
        let err = Error::from_status(429, "", Some(125_000));
        assert_eq!(err.rate_limit_hint(), Some(Duration::from_secs(125)));

        // only a 429 carries a usable hint
        let err = Error::from_status(503, "", Some(125_000));
        assert_eq!(err.rate_limit_hint(), None);

        let err = Error::RateLimitedAuth {
            message: "Failed login".to_string(),
            remaining: "0h 0m 30s".to_string(),
            retry_after: Duration::from_secs(30),
        };
        assert!(err.is_retryable());
        assert_eq!(err.rate_limit_hint(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_exhausted_retries_keeps_source() {
        let err = Error::ExhaustedRetries {
            attempts: 8,
            source: Box::new(Error::from_status(502, "bad gateway", None)),
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("8 attempts"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_fatal_for_sync() {
        assert!(Error::auth("bad credentials").is_fatal_for_sync());
        assert!(!Error::from_status(404, "", None).is_fatal_for_sync());
    }
}
