// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # tap-outbrain
//!
//! Incremental extraction client for the Outbrain Amplify API.
//!
//! ## Features
//!
//! - **Token Auth**: Basic-auth login, `OB-TOKEN-V1` header, 30-day disk cache
//! - **Rate-Limit Aware Retries**: Honours `rate-limit-msec-left`, otherwise
//!   jittered exponential backoff, at most 8 attempts
//! - **Offset Pagination**: Totals re-read from every page
//! - **Incremental Sync**: Per-partition bookmarks with ordering checks
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_outbrain::{SyncEngine, TapConfig, State, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TapConfig::from_value(serde_json::json!({
//!         "username": "user",
//!         "password": "secret",
//!         "start_date": "2024-01-01"
//!     }))?;
//!
//!     let mut engine = SyncEngine::from_config(&config)?.with_state(State::new());
//!     for message in engine.sync().await? {
//!         // Forward records and state to the host
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                        SyncEngine                          │
//! │   depth-first over marketers → campaigns → reports         │
//! └────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────┬─────────────────┴───┬──────────────┬───────────┐
//! │   Auth    │      HTTP           │   Paginate   │  Streams  │
//! ├───────────┼─────────────────────┼──────────────┼───────────┤
//! │ Login     │ Backoff controller  │ Count field  │ Params    │
//! │ TokenCache│ Rate-limit hints    │ Results      │ Reshape   │
//! │           │                     │ Periodic     │ Context   │
//! └───────────┴─────────────────────┴──────────────┴───────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the tap
pub mod error;

/// Common types and type aliases
pub mod types;

/// Login and token cache
pub mod auth;

/// HTTP client with retry and backoff
pub mod http;

/// Pagination strategies
pub mod pagination;

/// Path templates
pub mod template;

/// Stream definitions
pub mod streams;

/// Replication bookmarks
pub mod state;

/// Main execution engine
pub mod engine;

/// Tap configuration
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::TapConfig;
pub use engine::{Message, SyncConfig, SyncEngine, SyncStats};
pub use state::State;
pub use streams::{StreamKind, StreamSettings};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
