//! HTTP client module
//!
//! Provides the authenticated API client with retry and backoff.
//!
//! # Features
//!
//! - **Automatic Retries**: Up to 8 attempts per request
//! - **Rate Limit Hints**: Waits exactly as long as `rate-limit-msec-left` says
//! - **Backoff Fallback**: Jittered exponential backoff for other failures
//! - **Authentication**: Integration with the shared auth module

mod backoff;
mod client;

pub use backoff::{
    wait_from_msec_left, Backoff, BackoffConfig, BackoffController, BackoffMode, MAX_TRIES,
};
pub use client::{
    HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig, DEFAULT_BASE_URL,
};
pub(crate) use client::msec_left;
