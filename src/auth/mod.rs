//! Authentication module
//!
//! The API authenticates with a token obtained from a basic-auth login call
//! and sent back in the `OB-TOKEN-V1` header. Tokens live for 30 days and are
//! cached on disk so separate runs share them.

mod authenticator;
mod cache;
mod types;

pub use authenticator::Authenticator;
pub use cache::TokenCache;
pub use types::{
    format_remaining, Credential, LoginConfig, ACCESS_TOKEN_EXPIRE_AFTER_DAYS,
    RATE_LIMIT_MSEC_LEFT_HEADER, TOKEN_HEADER,
};
