//! Common types used throughout tap-outbrain
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

// ============================================================================
// Stream Context
// ============================================================================

/// Parent-derived keys threaded into child stream requests
///
/// A context is never modified in place; [`StreamContext::merge`] returns a
/// new context so the parent's copy stays intact while children extend it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamContext(BTreeMap<String, String>);

impl StreamContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a single key
    pub fn with(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), value.into());
        Self(map)
    }

    /// Return a new context containing these keys plus `key`
    #[must_use]
    pub fn merge(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = self.0.clone();
        map.insert(key.into(), value.into());
        Self(map)
    }

    /// Look up a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Check if the context has no keys
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over keys and values in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Stable key identifying this partition in state
    pub fn partition_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StreamContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a replication value returned by the API
///
/// Accepts RFC 3339, naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`
/// (interpreted as UTC) and bare dates (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
