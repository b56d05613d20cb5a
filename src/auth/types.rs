//! Auth types
//!
//! The credential handed out by the [`Authenticator`](super::Authenticator)
//! and the login settings used to obtain it.

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Access tokens are valid for a fixed 30 days after issue
pub const ACCESS_TOKEN_EXPIRE_AFTER_DAYS: i64 = 30;

/// Header carrying the access token, both in the login response body and on
/// authenticated requests
pub const TOKEN_HEADER: &str = "OB-TOKEN-V1";

/// Header on 429 responses with the milliseconds until the limit resets
pub const RATE_LIMIT_MSEC_LEFT_HEADER: &str = "rate-limit-msec-left";

/// Bearer credential plus its issue time
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// The access token (never empty)
    pub token: String,
    /// When the token was issued
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// Create a new credential
    pub fn new(token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            issued_at,
        }
    }

    /// Validity window shared by every credential
    pub fn validity() -> Duration {
        Duration::days(ACCESS_TOKEN_EXPIRE_AFTER_DAYS)
    }

    /// Check if the credential is still usable at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at < Self::validity()
    }

    /// Check if the credential is still usable
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

/// Settings for the login call
#[derive(Clone)]
pub struct LoginConfig {
    /// Full URL of the login endpoint
    pub login_url: String,
    /// Basic auth username
    pub username: String,
    /// Basic auth password
    pub password: String,
    /// Timeout for the login request
    pub timeout: std::time::Duration,
}

impl LoginConfig {
    /// Create login settings for the API rooted at `base_url`
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            login_url: format!("{}/login", base_url.trim_end_matches('/')),
            username: username.into(),
            password: password.into(),
            timeout: std::time::Duration::from_secs(60),
        }
    }
}

impl fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginConfig")
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Render a rate-limit reset time as `"{h}h {m}m {s}s"`
pub fn format_remaining(remaining: std::time::Duration) -> String {
    let secs = remaining.as_secs_f64().round() as u64;
    let (mins, secs) = (secs / 60, secs % 60);
    let (hours, mins) = (mins / 60, mins % 60);
    format!("{hours}h {mins}m {secs}s")
}

#[cfg(test)]
mod type_tests {
    use super::*;

    #[test]
    fn test_credential_within_window() {
        let now = Utc::now();
        let credential = Credential::new("token", now - Duration::days(29));
        assert!(credential.is_valid_at(now));
    }

    #[test]
    fn test_credential_expired_at_window_edge() {
        let now = Utc::now();
        let credential = Credential::new("token", now - Duration::days(30));
        assert!(!credential.is_valid_at(now));
    }

    #[test]
    fn test_credential_debug_redacts_token() {
        let credential = Credential::new("secret-token", Utc::now());
        assert!(!format!("{credential:?}").contains("secret-token"));
    }

    #[test]
    fn test_login_url() {
        let config = LoginConfig::new("https://api.example.com/v0.1/", "user", "hunter2");
        assert_eq!(config.login_url, "https://api.example.com/v0.1/login");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(
            format_remaining(std::time::Duration::from_millis(125_000)),
            "0h 2m 5s"
        );
        assert_eq!(
            format_remaining(std::time::Duration::from_secs(3 * 3600 + 61)),
            "3h 1m 1s"
        );
    }
}
