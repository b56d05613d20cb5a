//! Tap configuration
//!
//! The host hands the tap a JSON mapping; it is resolved once into
//! [`TapConfig`] and from there into per-stream [`StreamSettings`] and the
//! shared API client.

use crate::auth::{Authenticator, LoginConfig, TokenCache};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, DEFAULT_BASE_URL};
use crate::streams::{StreamKind, StreamSettings};
use crate::types::parse_timestamp;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Name of the per-user cache directory holding the access token
pub const INTEGRATION_NAME: &str = "tap-outbrain";

// ============================================================================
// Tap Config
// ============================================================================

/// Complete tap configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Amplify API username
    pub username: String,

    /// Amplify API password
    #[serde(skip_serializing)]
    pub password: String,

    /// Bookmark for partitions with no prior state
    #[serde(
        default = "default_start_date",
        deserialize_with = "deserialize_timestamp"
    )]
    pub start_date: DateTime<Utc>,

    /// Streams that also request archived entities
    #[serde(default)]
    pub include_archived: Vec<StreamKind>,

    /// API root
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Directory for the token cache (defaults to the user cache dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_cache_dir: Option<PathBuf>,
}

fn default_start_date() -> DateTime<Utc> {
    Utc::now() - Duration::days(365)
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid start_date '{raw}'")))
}

impl TapConfig {
    /// Create a config with defaults for everything but the credentials
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            start_date: default_start_date(),
            include_archived: Vec::new(),
            base_url: default_base_url(),
            token_cache_dir: None,
        }
    }

    /// Parse and validate the host's config mapping
    pub fn from_value(value: Value) -> Result<Self> {
        for field in ["username", "password"] {
            if value.get(field).map_or(true, Value::is_null) {
                return Err(Error::missing_field(field));
            }
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the credentials and API root
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::invalid_value("username", "must not be empty"));
        }
        if self.password.is_empty() {
            return Err(Error::invalid_value("password", "must not be empty"));
        }

        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "base_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(())
    }

    /// Settings for one stream
    pub fn stream_settings(&self, kind: StreamKind) -> StreamSettings {
        StreamSettings::include_archived(self.include_archived.contains(&kind))
    }

    /// Token cache in the configured or per-user cache directory
    pub fn token_cache(&self) -> Result<TokenCache> {
        match &self.token_cache_dir {
            Some(dir) => Ok(TokenCache::new(dir)),
            None => TokenCache::for_integration(INTEGRATION_NAME),
        }
    }

    /// Authenticator to share across every stream
    pub fn authenticator(&self) -> Result<Arc<Authenticator>> {
        let login = LoginConfig::new(&self.base_url, &self.username, &self.password);
        Ok(Arc::new(Authenticator::new(login, self.token_cache()?)))
    }

    /// API client with default retry settings
    pub fn http_client(&self) -> Result<HttpClient> {
        let config = HttpClientConfig::builder()
            .base_url(self.base_url.trim_end_matches('/'))
            .build();
        HttpClient::new(config, self.authenticator()?)
    }
}

impl fmt::Debug for TapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TapConfig")
            .field("username", &self.username)
            .field("start_date", &self.start_date)
            .field("include_archived", &self.include_archived)
            .field("base_url", &self.base_url)
            .field("token_cache_dir", &self.token_cache_dir)
            .finish_non_exhaustive()
    }
}
