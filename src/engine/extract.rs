//! Per-partition record extraction
//!
//! Drives one stream's paginated requests for one parent context and yields
//! reshaped records lazily, one page at a time.

use super::guard::{ReplicationCursor, SortednessGuard};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use crate::pagination::{PaginationState, Paginator};
use crate::streams::StreamDefinition;
use crate::template;
use crate::types::{parse_timestamp, JsonObject, JsonValue, StreamContext};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, TryStreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// One output record with its bookkeeping
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRecord {
    /// Flattened record
    pub record: JsonObject,
    /// Raw replication-key value, for replicated streams
    pub replication_value: Option<String>,
    /// Replication-key value as a timestamp
    pub replicated_at: Option<DateTime<Utc>>,
    /// Context for child streams
    pub child_context: Option<StreamContext>,
    /// Whether the partition has stayed in replication-key order so far
    pub is_sorted: bool,
}

/// Lazy sequence of records for one partition
pub type RecordStream<'a> = Pin<Box<dyn Stream<Item = Result<StreamRecord>> + Send + 'a>>;

/// Pagination loop state carried between pages
struct PageLoop {
    paginator: Box<dyn Paginator>,
    pagination: PaginationState,
    guard: SortednessGuard<DateTime<Utc>>,
}

/// Issues the requests of each partition sync
pub struct ExtractionClient {
    http: HttpClient,
    pages: AtomicU64,
}

impl ExtractionClient {
    /// Create an extraction client over `http`
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            pages: AtomicU64::new(0),
        }
    }

    /// Underlying API client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Pages fetched over the client's lifetime
    pub fn pages_fetched(&self) -> u64 {
        self.pages.load(Ordering::Relaxed)
    }

    /// Records of `definition` for the partition `ctx`
    ///
    /// Nothing is requested until the returned stream is polled; dropping it
    /// stops pagination.
    pub fn records<'a>(
        &'a self,
        definition: &'a dyn StreamDefinition,
        ctx: &'a StreamContext,
        cursor: ReplicationCursor,
    ) -> RecordStream<'a> {
        self.records_at(definition, ctx, cursor, Utc::now())
    }

    /// Like [`records`](Self::records) with a fixed "now" for report windows
    pub fn records_at<'a>(
        &'a self,
        definition: &'a dyn StreamDefinition,
        ctx: &'a StreamContext,
        cursor: ReplicationCursor,
        now: DateTime<Utc>,
    ) -> RecordStream<'a> {
        let initial = PageLoop {
            paginator: definition.paginator(),
            pagination: PaginationState::new(),
            guard: cursor.guard(),
        };

        let pages = stream::try_unfold(initial, move |mut page_loop| async move {
            if page_loop.pagination.page_state().is_exhausted() {
                return Ok::<_, Error>(None);
            }
            let records = self
                .fetch_page(definition, ctx, cursor, now, &mut page_loop)
                .await?;
            Ok(Some((records, page_loop)))
        });

        Box::pin(
            pages
                .map_ok(|records| stream::iter(records.into_iter().map(Ok::<_, Error>)))
                .try_flatten(),
        )
    }

    async fn fetch_page(
        &self,
        definition: &dyn StreamDefinition,
        ctx: &StreamContext,
        cursor: ReplicationCursor,
        now: DateTime<Utc>,
        page_loop: &mut PageLoop,
    ) -> Result<Vec<StreamRecord>> {
        let path = template::render(definition.path(), ctx)?;
        let request = RequestConfig::new()
            .queries(definition.url_params(ctx, cursor.starting_value(), now)?)
            .queries(page_loop.paginator.page_params(&page_loop.pagination));

        let body = self.http.get_json(&path, &request).await?;
        self.pages.fetch_add(1, Ordering::Relaxed);

        let page = page_loop
            .paginator
            .process_response(&body, &mut page_loop.pagination)?;

        let mut records = Vec::new();
        for raw in extract_records(&body, definition.records_key())? {
            for row in definition.reshape(raw, ctx)? {
                records.push(annotate(definition, ctx, row, &mut page_loop.guard)?);
            }
        }

        debug!(
            "{} [{}] page {}: {} records, more: {}",
            definition.name(),
            ctx,
            page_loop.pagination.pages_fetched,
            records.len(),
            page.has_more()
        );
        Ok(records)
    }
}

/// Pull the record list out of a page body
///
/// A missing or null key is an empty page.
pub(crate) fn extract_records(body: &JsonValue, key: &str) -> Result<Vec<JsonObject>> {
    match body.get(key) {
        None | Some(JsonValue::Null) => Ok(Vec::new()),
        Some(JsonValue::Array(items)) => items
            .iter()
            .map(|item| match item {
                JsonValue::Object(record) => Ok(record.clone()),
                other => Err(Error::extraction(key, format!("record is not an object: {other}"))),
            })
            .collect(),
        Some(other) => Err(Error::extraction(key, format!("expected a list, got {other}"))),
    }
}

fn annotate(
    definition: &dyn StreamDefinition,
    ctx: &StreamContext,
    record: JsonObject,
    guard: &mut SortednessGuard<DateTime<Utc>>,
) -> Result<StreamRecord> {
    let (replication_value, replicated_at) = match definition.replication_key() {
        Some(key) => {
            let raw = match record.get(key) {
                Some(JsonValue::String(raw)) => raw.clone(),
                Some(other) => {
                    return Err(Error::extraction(
                        definition.name(),
                        format!("'{key}' is not a timestamp: {other}"),
                    ))
                }
                None => {
                    return Err(Error::extraction(
                        definition.name(),
                        format!("record has no '{key}'"),
                    ))
                }
            };
            let timestamp = parse_timestamp(&raw).ok_or_else(|| {
                Error::extraction(definition.name(), format!("'{key}' is not a timestamp: {raw}"))
            })?;

            let was_sorted = guard.is_sorted();
            let sorted = guard.observe(timestamp);
            if was_sorted && !sorted && definition.is_sorted() {
                warn!(
                    "{} [{}] is no longer sorted by '{key}' at {raw}",
                    definition.name(),
                    ctx
                );
            }
            (Some(raw), Some(timestamp))
        }
        None => (None, None),
    };

    Ok(StreamRecord {
        child_context: definition.child_context(&record, ctx)?,
        record,
        replication_value,
        replicated_at,
        is_sorted: guard.is_sorted(),
    })
}
