//! Execution engine module
//!
//! Depth-first sync of the stream tree with per-partition bookmarks.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - Walks the stream tree, one partition at a time
//! - `ExtractionClient` - Lazy per-partition record sequences
//! - `SortednessGuard` / `ReplicationCursor` - Incremental bookkeeping
//! - Message types for output (Record, State)
//!
//! A child stream is synced right after the parent record that provides its
//! context, before the parent's next record is handled. A failing partition
//! is logged and skipped; its siblings carry on.

mod extract;
mod guard;
mod types;

pub use extract::{ExtractionClient, RecordStream, StreamRecord};
pub use guard::{ReplicationCursor, SortednessGuard};
pub use types::{Message, SyncConfig, SyncStats};

use crate::config::TapConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::state::State;
use crate::streams::{definition, StreamDefinition, StreamKind, StreamSettings};
use crate::types::StreamContext;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{error, info, warn};

type Definitions = BTreeMap<StreamKind, Box<dyn StreamDefinition>>;

/// Sync engine for orchestrating data extraction
pub struct SyncEngine {
    /// Request side
    extractor: ExtractionClient,
    /// Stream definitions
    streams: Definitions,
    /// Bookmark used when a partition has none
    start_date: Option<DateTime<Utc>>,
    /// Replication bookmarks
    state: State,
    /// Sync configuration
    config: SyncConfig,
    /// Statistics
    stats: SyncStats,
}

impl SyncEngine {
    /// Create a new sync engine with default stream settings
    pub fn new(client: HttpClient) -> Self {
        let streams = StreamKind::ALL
            .into_iter()
            .map(|kind| (kind, definition(kind, StreamSettings::default())))
            .collect();

        Self {
            extractor: ExtractionClient::new(client),
            streams,
            start_date: None,
            state: State::new(),
            config: SyncConfig::default(),
            stats: SyncStats::default(),
        }
    }

    /// Build an engine from the tap configuration
    pub fn from_config(config: &TapConfig) -> Result<Self> {
        let mut engine = Self::new(config.http_client()?).with_start_date(config.start_date);
        for kind in StreamKind::ALL {
            engine = engine.with_stream_settings(kind, config.stream_settings(kind));
        }
        Ok(engine)
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Resume from prior state
    #[must_use]
    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    /// Set the bookmark used for partitions without one
    #[must_use]
    pub fn with_start_date(mut self, start_date: DateTime<Utc>) -> Self {
        self.start_date = Some(start_date);
        self
    }

    /// Replace the settings of one stream
    #[must_use]
    pub fn with_stream_settings(mut self, kind: StreamKind, settings: StreamSettings) -> Self {
        self.streams.insert(kind, definition(kind, settings));
        self
    }

    /// Get the extraction client
    pub fn extractor(&self) -> &ExtractionClient {
        &self.extractor
    }

    /// Get the current state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Take the state out of the engine
    pub fn into_state(self) -> State {
        self.state
    }

    /// Get statistics
    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    /// Sync every root stream and, depth first, its descendants
    ///
    /// Bookmarks move in a working copy of the state that replaces
    /// [`state`](Self::state) only when the messages are returned. On error
    /// the buffered messages are discarded and the state is left as it was
    /// before the call, so the next run fetches those records again.
    pub async fn sync(&mut self) -> Result<Vec<Message>> {
        let start = Instant::now();
        let pages_before = self.extractor.pages_fetched();
        let mut working = self.state.clone();

        let Self {
            extractor,
            streams,
            start_date,
            config,
            stats,
            ..
        } = self;
        let mut run = SyncRun {
            extractor,
            streams,
            start_date: *start_date,
            config,
            state: &mut working,
            stats,
            completed: BTreeSet::new(),
            messages: Vec::new(),
        };

        let mut result = Ok(());
        for root in StreamKind::roots() {
            result = run.sync_stream(root, StreamContext::new()).await;
            if result.is_err() {
                break;
            }
        }

        let completed = run.completed.len();
        let messages = std::mem::take(&mut run.messages);

        self.stats.streams_synced += completed;
        self.stats
            .add_pages(self.extractor.pages_fetched() - pages_before);
        self.stats.set_duration(start.elapsed().as_millis() as u64);

        if let Err(e) = result {
            warn!(
                "Sync failed, discarding {} buffered messages: {e}",
                messages.len()
            );
            return Err(e);
        }

        self.state = working;
        info!(
            "Sync completed: {} records, {} partitions, {} errors in {} ms",
            self.stats.records_synced,
            self.stats.partitions_synced,
            self.stats.errors,
            self.stats.duration_ms
        );
        Ok(messages)
    }
}

/// Borrowed view of the engine for one `sync` call
struct SyncRun<'a> {
    extractor: &'a ExtractionClient,
    streams: &'a Definitions,
    start_date: Option<DateTime<Utc>>,
    config: &'a SyncConfig,
    state: &'a mut State,
    stats: &'a mut SyncStats,
    completed: BTreeSet<StreamKind>,
    messages: Vec<Message>,
}

impl<'a> SyncRun<'a> {
    /// Sync one partition of `kind`, isolating its failure
    fn sync_stream(&mut self, kind: StreamKind, ctx: StreamContext) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if !self.config.traverses(kind) {
                return Ok(());
            }
            let streams = self.streams;
            let Some(stream) = streams.get(&kind) else {
                return Ok(());
            };

            match self.sync_partition(stream.as_ref(), &ctx).await {
                Ok(count) => {
                    self.stats.add_partition();
                    self.completed.insert(kind);
                    info!("{kind} [{ctx}]: synced {count} records");
                    Ok(())
                }
                Err(e) if e.is_fatal_for_sync() || self.config.fail_fast => Err(e),
                Err(e) => {
                    self.stats.add_error();
                    error!("{kind} [{ctx}]: partition aborted: {e}");
                    Ok(())
                }
            }
        })
    }

    async fn sync_partition(
        &mut self,
        stream: &'a dyn StreamDefinition,
        ctx: &StreamContext,
    ) -> Result<usize> {
        let kind = stream.kind();
        let name = stream.name();
        let selected = self.config.is_selected(kind);

        let starting = stream
            .replication_key()
            .and_then(|_| self.state.starting_value(name, ctx).or(self.start_date));
        let cursor = ReplicationCursor::new(starting);
        info!("{kind} [{ctx}]: starting sync from {starting:?}");

        let extractor = self.extractor;
        let mut records = extractor.records(stream, ctx, cursor);

        let mut latest: Option<(DateTime<Utc>, String)> = None;
        let mut sorted = true;
        let mut count = 0;
        let mut failure = None;

        'records: while let Some(item) = records.next().await {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            sorted = record.is_sorted;
            if let (Some(at), Some(raw)) = (record.replicated_at, &record.replication_value) {
                if latest.as_ref().map_or(true, |(max, _)| at > *max) {
                    latest = Some((at, raw.clone()));
                }
            }

            if selected {
                self.messages.push(Message::record(name, record.record));
                self.stats.add_records(1);
                count += 1;
            }

            if let Some(child_ctx) = record.child_context {
                for child in kind.children() {
                    if let Err(e) = self.sync_stream(child, child_ctx.clone()).await {
                        failure = Some(e);
                        break 'records;
                    }
                }
            }
        }
        drop(records);

        // an interrupted partition keeps its progress only while the stream
        // is still known to be in order
        let commit = failure.is_none() || (stream.is_sorted() && sorted);
        if selected && commit {
            if let Some((_, raw)) = latest {
                if self.state.advance(name, ctx, &raw) {
                    let data = serde_json::to_value(&*self.state)?;
                    self.messages.push(Message::state(name, data));
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }
}
