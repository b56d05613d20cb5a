//! Engine types
//!
//! Message types and configuration for the sync engine.

use crate::streams::StreamKind;
use crate::types::JsonObject;
use serde_json::Value;
use std::collections::BTreeSet;

/// A message emitted during sync
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A single flattened record
    Record {
        /// Stream name
        stream: String,
        /// The record
        record: JsonObject,
    },
    /// State checkpoint
    State {
        /// Stream whose bookmark moved
        stream: String,
        /// Complete state document after the move
        data: Value,
    },
}

impl Message {
    /// Create a record message
    pub fn record(stream: impl Into<String>, record: JsonObject) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
        }
    }

    /// Create a state message
    pub fn state(stream: impl Into<String>, data: Value) -> Self {
        Self::State {
            stream: stream.into(),
            data,
        }
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Stream the message belongs to
    pub fn stream(&self) -> &str {
        match self {
            Self::Record { stream, .. } | Self::State { stream, .. } => stream,
        }
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Abort the whole sync on the first failed partition
    pub fail_fast: bool,
    /// Streams whose records are emitted (`None` = all)
    pub selected: Option<BTreeSet<StreamKind>>,
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fail fast mode
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Only emit records for `streams`
    ///
    /// Parents of selected streams are still read for their context.
    #[must_use]
    pub fn with_streams(mut self, streams: impl IntoIterator<Item = StreamKind>) -> Self {
        self.selected = Some(streams.into_iter().collect());
        self
    }

    /// Whether records of `kind` are emitted
    pub fn is_selected(&self, kind: StreamKind) -> bool {
        self.selected
            .as_ref()
            .map_or(true, |selected| selected.contains(&kind))
    }

    /// Whether `kind` must be read, for itself or for a descendant
    pub fn traverses(&self, kind: StreamKind) -> bool {
        self.selected.as_ref().map_or(true, |selected| {
            selected
                .iter()
                .any(|target| kind.is_ancestor_or_self(*target))
        })
    }
}

/// Statistics from a sync operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Total records emitted
    pub records_synced: usize,
    /// Total pages fetched
    pub pages_fetched: u64,
    /// Distinct streams with at least one completed partition
    pub streams_synced: usize,
    /// Partitions completed without error
    pub partitions_synced: usize,
    /// Partitions aborted by an error
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Add records
    pub fn add_records(&mut self, count: usize) {
        self.records_synced += count;
    }

    /// Add pages
    pub fn add_pages(&mut self, count: u64) {
        self.pages_fetched += count;
    }

    /// Add a partition
    pub fn add_partition(&mut self) {
        self.partitions_synced += 1;
    }

    /// Add an error
    pub fn add_error(&mut self) {
        self.errors += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
