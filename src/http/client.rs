//! HTTP client with retry and backoff
//!
//! Provides the API client used by every stream:
//! - Authentication through the shared [`Authenticator`]
//! - Automatic retries driven by the [`BackoffController`]
//! - Response body parsing
//! - Error classification for retry decisions

use super::backoff::{Backoff, BackoffConfig, BackoffController};
use crate::auth::{Authenticator, RATE_LIMIT_MSEC_LEFT_HEADER};
use crate::error::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.outbrain.com/amplify/v0.1";

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry schedule
    pub backoff: BackoffConfig,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            backoff: BackoffConfig::default(),
            user_agent: format!("tap-outbrain/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the retry schedule
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters, in order; keys may repeat
    pub query: Vec<(String, String)>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add several query parameters
    #[must_use]
    pub fn queries(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }
}

/// Authenticated API client with retries
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    authenticator: Arc<Authenticator>,
}

impl HttpClient {
    /// Create a new client sharing `authenticator`
    pub fn new(config: HttpClientConfig, authenticator: Arc<Authenticator>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            config,
            authenticator,
        })
    }

    /// Get the shared authenticator
    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a JSON document, retrying per the backoff schedule
    pub async fn get_json(&self, path: &str, config: &RequestConfig) -> Result<Value> {
        let url = self.build_url(path);
        let mut backoff = BackoffController::new(self.config.backoff.clone());

        loop {
            let error = match self.attempt(&url, config).await {
                Ok(body) => {
                    debug!("Request succeeded: GET {url}");
                    return Ok(body);
                }
                Err(e) => e,
            };

            match backoff.next(&error) {
                Backoff::Retry(wait) => {
                    warn!(
                        "Request to {} failed ({}), attempt {}/{}, retrying in {:?}",
                        url,
                        error,
                        backoff.attempts(),
                        backoff.max_tries(),
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Backoff::GiveUp if error.is_retryable() => {
                    return Err(Error::ExhaustedRetries {
                        attempts: backoff.attempts(),
                        source: Box::new(error),
                    });
                }
                Backoff::GiveUp => return Err(error),
            }
        }
    }

    /// One authenticated attempt
    async fn attempt(&self, url: &str, config: &RequestConfig) -> Result<Value> {
        let credential = self.authenticator.credential().await?;

        let mut req = self.client.get(url);
        if !config.query.is_empty() {
            req = req.query(&config.query);
        }

        let request = self.authenticator.attach(req.build()?, &credential)?;
        let response = self.client.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let msec_left = msec_left(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(Error::from_status(status.as_u16(), body, msec_left));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Build full URL from path
    fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .finish_non_exhaustive()
    }
}

/// Read the `rate-limit-msec-left` header
pub(crate) fn msec_left(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RATE_LIMIT_MSEC_LEFT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .map(|ms| ms.max(0.0).ceil() as u64)
}
