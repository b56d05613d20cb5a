//! Authenticator implementation
//!
//! Handles obtaining the access token from the login endpoint, caching it
//! on disk and applying it to outgoing requests.

use super::cache::TokenCache;
use super::types::{
    format_remaining, Credential, LoginConfig, ACCESS_TOKEN_EXPIRE_AFTER_DAYS, TOKEN_HEADER,
};
use crate::error::{Error, Result};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Lowercase form of [`TOKEN_HEADER`] for header maps
const TOKEN_HEADER_NAME: HeaderName = HeaderName::from_static("ob-token-v1");

/// Authenticator shared by every stream of a sync
///
/// Wrap it in an `Arc` and hand clones to each client. Refreshes are
/// serialized: concurrent callers that find the credential expired wait on
/// the write lock and then reuse the token fetched by whoever got there first.
pub struct Authenticator {
    /// Login settings
    config: LoginConfig,
    /// On-disk token store
    cache: TokenCache,
    /// Current credential, if any
    credential: RwLock<Option<Credential>>,
    /// HTTP client for login requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator, seeding it from the token cache
    pub fn new(config: LoginConfig, cache: TokenCache) -> Self {
        Self::with_client(config, cache, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: LoginConfig, cache: TokenCache, http_client: Client) -> Self {
        let credential = match cache.load() {
            Ok(Some(credential)) => {
                info!("Using access token from cache: {}", cache.path().display());
                if !credential.is_valid() {
                    info!(
                        "Cached access token modified more than {} days ago - assuming expired",
                        ACCESS_TOKEN_EXPIRE_AFTER_DAYS
                    );
                }
                Some(credential)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable token cache {}: {e}", cache.path().display());
                None
            }
        };

        Self {
            config,
            cache,
            credential: RwLock::new(credential),
            http_client,
        }
    }

    /// Get a valid credential, refreshing if absent or expired
    pub async fn credential(&self) -> Result<Credential> {
        {
            let cached = self.credential.read().await;
            if let Some(credential) = cached.as_ref().filter(|c| c.is_valid()) {
                return Ok(credential.clone());
            }
        }

        let mut cached = self.credential.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(credential) = cached.as_ref().filter(|c| c.is_valid()) {
            return Ok(credential.clone());
        }

        let credential = self.refresh().await?;
        *cached = Some(credential.clone());
        Ok(credential)
    }

    /// Inject the credential into a built request
    ///
    /// The API ignores `Authorization`, so any such header set by lower
    /// layers is dropped in favour of `OB-TOKEN-V1`.
    pub fn attach(&self, mut request: Request, credential: &Credential) -> Result<Request> {
        let value = HeaderValue::from_str(&credential.token)
            .map_err(|_| Error::auth("Access token is not a valid header value"))?;

        let headers = request.headers_mut();
        headers.remove(AUTHORIZATION);
        headers.insert(TOKEN_HEADER_NAME, value);

        Ok(request)
    }

    /// Log in and persist a fresh token
    ///
    /// Never retried here: a [`Error::RateLimitedAuth`] carries the wait the
    /// caller should honour, anything else is fatal.
    pub async fn refresh(&self) -> Result<Credential> {
        let response = self
            .http_client
            .get(&self.config.login_url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .timeout(self.config.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(login_failure(response).await);
        }

        info!("OAuth authorization attempt was successful.");

        let body: Value = response.json().await?;
        let token = body
            .get(TOKEN_HEADER)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::auth(format!("Login response did not contain {TOKEN_HEADER}")))?;

        match self.cache.save(token) {
            Ok(credential) => Ok(credential),
            Err(e) => {
                warn!(
                    "Failed to write token cache {}: {e}",
                    self.cache.path().display()
                );
                Ok(Credential::new(token, chrono::Utc::now()))
            }
        }
    }

    /// Get the login settings
    pub fn config(&self) -> &LoginConfig {
        &self.config
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Turn a non-2xx login response into the matching error
async fn login_failure(response: Response) -> Error {
    let status = response.status();
    let msec_left = crate::http::msec_left(response.headers());
    let body = response.text().await.unwrap_or_default();
    let message = format!("Failed OAuth login, response was '{body}'");

    if status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(ms) = msec_left {
            let retry_after = crate::http::wait_from_msec_left(ms);
            return Error::RateLimitedAuth {
                message,
                remaining: format_remaining(Duration::from_millis(ms)),
                retry_after,
            };
        }
        return Error::from_status(status.as_u16(), message, None);
    }

    Error::auth(format!("{message} (HTTP {})", status.as_u16()))
}
