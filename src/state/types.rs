//! State types for tracking sync progress
//!
//! These types are serialized to JSON and handed back by the host between
//! runs. Streams synced once per parent record keep one bookmark per
//! partition, keyed by the partition's context.

use crate::error::Result;
use crate::types::{parse_timestamp, StreamContext};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Complete state for the tap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: HashMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from the host's JSON; `null` means no prior state
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get mutable state for a stream, creating if needed
    pub fn get_stream_mut(&mut self, stream: &str) -> &mut StreamState {
        self.streams.entry(stream.to_string()).or_default()
    }

    /// Raw bookmark for one partition of a stream
    pub fn replication_value(&self, stream: &str, ctx: &StreamContext) -> Option<&str> {
        self.streams.get(stream)?.replication_value(ctx)
    }

    /// Bookmark parsed as a timestamp
    pub fn starting_value(&self, stream: &str, ctx: &StreamContext) -> Option<DateTime<Utc>> {
        self.replication_value(stream, ctx).and_then(parse_timestamp)
    }

    /// Move a partition's bookmark forward to `value`
    ///
    /// Returns `false` and leaves the bookmark alone when `value` is older.
    pub fn advance(&mut self, stream: &str, ctx: &StreamContext, value: &str) -> bool {
        self.get_stream_mut(stream).advance(ctx, value)
    }
}

/// State for a single stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Bookmark for a stream without parent context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<String>,

    /// Per-partition bookmarks (for child streams)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub partitions: BTreeMap<String, PartitionState>,
}

impl StreamState {
    /// Create a new empty stream state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get partition state
    pub fn get_partition(&self, ctx: &StreamContext) -> Option<&PartitionState> {
        self.partitions.get(&ctx.partition_key())
    }

    /// Get mutable partition state, creating if needed
    pub fn get_partition_mut(&mut self, ctx: &StreamContext) -> &mut PartitionState {
        self.partitions
            .entry(ctx.partition_key())
            .or_insert_with(|| PartitionState::new(ctx.clone()))
    }

    /// Raw bookmark for `ctx`
    pub fn replication_value(&self, ctx: &StreamContext) -> Option<&str> {
        if ctx.is_empty() {
            self.replication_key_value.as_deref()
        } else {
            self.get_partition(ctx)?.replication_key_value.as_deref()
        }
    }

    fn advance(&mut self, ctx: &StreamContext, value: &str) -> bool {
        let slot = if ctx.is_empty() {
            &mut self.replication_key_value
        } else {
            &mut self.get_partition_mut(ctx).replication_key_value
        };

        if !is_newer(value, slot.as_deref()) {
            return false;
        }
        *slot = Some(value.to_string());
        true
    }
}

/// State for a single partition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionState {
    /// Context identifying the partition
    pub context: StreamContext,

    /// Bookmark within this partition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key_value: Option<String>,
}

impl PartitionState {
    /// Create an empty partition state
    pub fn new(context: StreamContext) -> Self {
        Self {
            context,
            replication_key_value: None,
        }
    }
}

/// An unreadable current bookmark is always replaced
fn is_newer(candidate: &str, current: Option<&str>) -> bool {
    let Some(current) = current.and_then(parse_timestamp) else {
        return true;
    };
    parse_timestamp(candidate).is_some_and(|candidate| candidate > current)
}
