//! Stream definitions for the Amplify API
//!
//! Each stream knows its resource path, the key holding its records, how to
//! page through them, which query parameters to send and how to flatten the
//! nested report payloads into records.

use super::kind::StreamKind;
use crate::error::{Error, Result};
use crate::pagination::{
    CountFieldPaginator, NoPaginator, Paginator, PeriodicContentPaginator, ResultsPaginator,
};
use crate::types::{JsonObject, JsonValue, StreamContext};
use chrono::{DateTime, Utc};

/// Query parameters for one request
pub type QueryParams = Vec<(String, String)>;

/// Per-stream settings resolved from the tap configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSettings {
    /// Request archived campaigns / promoted links too
    pub include_archived: bool,
}

impl StreamSettings {
    /// Settings with archived inclusion set
    pub fn include_archived(include: bool) -> Self {
        Self {
            include_archived: include,
        }
    }
}

/// Static description and request/response shaping of one stream
pub trait StreamDefinition: Send + Sync {
    /// Which stream this is
    fn kind(&self) -> StreamKind;

    /// Stream name
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Resource path template
    fn path(&self) -> &'static str;

    /// Response field holding the list of records
    fn records_key(&self) -> &'static str;

    /// Fields identifying a record
    fn primary_keys(&self) -> &'static [&'static str];

    /// Field tracking incremental progress, if any
    fn replication_key(&self) -> Option<&'static str> {
        None
    }

    /// Whether the API returns records in replication-key order
    fn is_sorted(&self) -> bool {
        false
    }

    /// Fresh paginator for one partition sync
    fn paginator(&self) -> Box<dyn Paginator>;

    /// Resource-specific query parameters (pagination excluded)
    fn url_params(
        &self,
        ctx: &StreamContext,
        starting: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<QueryParams>;

    /// Turn one raw record into zero or more output records
    fn reshape(&self, record: JsonObject, _ctx: &StreamContext) -> Result<Vec<JsonObject>> {
        Ok(vec![record])
    }

    /// Context handed to child streams for this record
    fn child_context(&self, _record: &JsonObject, _ctx: &StreamContext) -> Result<Option<StreamContext>> {
        Ok(None)
    }
}

/// Build the definition for `kind`
pub fn definition(kind: StreamKind, settings: StreamSettings) -> Box<dyn StreamDefinition> {
    match kind {
        StreamKind::Marketers => Box::new(MarketersStream),
        StreamKind::Campaigns => Box::new(CampaignsStream::new(settings)),
        StreamKind::Budgets => Box::new(BudgetsStream),
        StreamKind::PromotedLinks => Box::new(PromotedLinksStream::new(settings)),
        StreamKind::PromotedLinkDailyPerformance => {
            Box::new(PromotedLinkDailyPerformanceStream::new(settings))
        }
        StreamKind::SectionDailyPerformance => {
            Box::new(SectionDailyPerformanceStream::new(settings))
        }
    }
}

/// Whole days elapsed since `starting`, never negative
///
/// The API returns changes made up to N+1 days ago (exclusive), so a
/// partial day is dropped rather than rounded.
pub fn days_to_look_back(starting: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - starting).num_days().max(0)
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_string(), value.to_string())
}

/// Read an identifier field as a string
fn id_of(record: &JsonObject, stream: &str) -> Result<String> {
    match record.get("id") {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::extraction(stream, "record has no usable 'id'")),
    }
}

fn required<'a>(ctx: &'a StreamContext, key: &str) -> Result<&'a str> {
    ctx.get(key).ok_or_else(|| Error::undefined_var(key))
}

/// Move every field of the object at `key` into `record`
fn hoist(record: &mut JsonObject, key: &str, stream: &str) -> Result<()> {
    match record.remove(key) {
        Some(JsonValue::Object(inner)) => {
            record.extend(inner);
            Ok(())
        }
        Some(other) => Err(Error::extraction(
            stream,
            format!("'{key}' is not an object: {other}"),
        )),
        None => Err(Error::extraction(stream, format!("missing '{key}'"))),
    }
}

/// Remove the list at `key` and merge each entry over the remaining record
fn explode(mut record: JsonObject, key: &str, stream: &str) -> Result<Vec<JsonObject>> {
    let entries = match record.remove(key) {
        Some(JsonValue::Array(entries)) => entries,
        Some(other) => {
            return Err(Error::extraction(
                stream,
                format!("'{key}' is not a list: {other}"),
            ))
        }
        None => return Err(Error::extraction(stream, format!("missing '{key}'"))),
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            JsonValue::Object(fields) => {
                let mut merged = record.clone();
                merged.extend(fields);
                Ok(merged)
            }
            other => Err(Error::extraction(
                stream,
                format!("'{key}' entry is not an object: {other}"),
            )),
        })
        .collect()
}

fn report_window(
    starting: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> impl Iterator<Item = (String, String)> {
    starting
        .map(|start| param("from", start.date_naive()))
        .into_iter()
        .chain(std::iter::once(param("to", now.date_naive())))
}

// ============================================================================
// marketers
// ============================================================================

/// `GET /marketers`
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketersStream;

impl StreamDefinition for MarketersStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Marketers
    }

    fn path(&self) -> &'static str {
        "/marketers"
    }

    fn records_key(&self) -> &'static str {
        "marketers"
    }

    fn primary_keys(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(NoPaginator)
    }

    fn url_params(
        &self,
        _ctx: &StreamContext,
        _starting: Option<DateTime<Utc>>,
        _now: DateTime<Utc>,
    ) -> Result<QueryParams> {
        Ok(vec![param("extraFields", "Account")])
    }

    fn child_context(&self, record: &JsonObject, _ctx: &StreamContext) -> Result<Option<StreamContext>> {
        Ok(Some(StreamContext::with("marketerId", id_of(record, self.name())?)))
    }
}

// ============================================================================
// campaigns
// ============================================================================

/// `GET /marketers/{marketerId}/campaigns`, oldest change first
#[derive(Debug, Clone, Copy)]
pub struct CampaignsStream {
    settings: StreamSettings,
}

impl CampaignsStream {
    /// Page size used by the campaigns endpoint
    pub const PAGE_SIZE: u64 = 50;

    /// Create the stream
    pub fn new(settings: StreamSettings) -> Self {
        Self { settings }
    }
}

impl StreamDefinition for CampaignsStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Campaigns
    }

    fn path(&self) -> &'static str {
        "/marketers/{marketerId}/campaigns"
    }

    fn records_key(&self) -> &'static str {
        "campaigns"
    }

    fn primary_keys(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn replication_key(&self) -> Option<&'static str> {
        Some("lastModified")
    }

    fn is_sorted(&self) -> bool {
        true
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(CountFieldPaginator::new(Self::PAGE_SIZE))
    }

    fn url_params(
        &self,
        _ctx: &StreamContext,
        starting: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<QueryParams> {
        let mut params = vec![
            param("includeArchived", self.settings.include_archived),
            param("sort", "+lastModified"),
        ];
        if let Some(starting) = starting {
            params.push(param(
                "daysToLookBackForChanges",
                days_to_look_back(starting, now),
            ));
        }
        Ok(params)
    }

    fn child_context(&self, record: &JsonObject, ctx: &StreamContext) -> Result<Option<StreamContext>> {
        Ok(Some(ctx.merge("campaignId", id_of(record, self.name())?)))
    }
}

// ============================================================================
// budgets
// ============================================================================

/// `GET /marketers/{marketerId}/budgets`
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetsStream;

impl StreamDefinition for BudgetsStream {
    fn kind(&self) -> StreamKind {
        StreamKind::Budgets
    }

    fn path(&self) -> &'static str {
        "/marketers/{marketerId}/budgets"
    }

    fn records_key(&self) -> &'static str {
        "budgets"
    }

    fn primary_keys(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(NoPaginator)
    }

    fn url_params(
        &self,
        _ctx: &StreamContext,
        _starting: Option<DateTime<Utc>>,
        _now: DateTime<Utc>,
    ) -> Result<QueryParams> {
        Ok(Vec::new())
    }
}

// ============================================================================
// promoted_links
// ============================================================================

/// `GET /campaigns/{campaignId}/promotedLinks`
#[derive(Debug, Clone, Copy)]
pub struct PromotedLinksStream {
    settings: StreamSettings,
}

impl PromotedLinksStream {
    /// Page size used by the promoted links endpoint
    pub const PAGE_SIZE: u64 = 500;

    /// Create the stream
    pub fn new(settings: StreamSettings) -> Self {
        Self { settings }
    }
}

impl StreamDefinition for PromotedLinksStream {
    fn kind(&self) -> StreamKind {
        StreamKind::PromotedLinks
    }

    fn path(&self) -> &'static str {
        "/campaigns/{campaignId}/promotedLinks"
    }

    fn records_key(&self) -> &'static str {
        "promotedLinks"
    }

    fn primary_keys(&self) -> &'static [&'static str] {
        &["id"]
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(CountFieldPaginator::new(Self::PAGE_SIZE))
    }

    fn url_params(
        &self,
        _ctx: &StreamContext,
        _starting: Option<DateTime<Utc>>,
        _now: DateTime<Utc>,
    ) -> Result<QueryParams> {
        Ok(vec![
            param("includeArchived", self.settings.include_archived),
            param("sort", "+creationDate"),
            param("extraFields", "ImageURL"),
            param("extraFields", "ImageMetaData"),
        ])
    }

    fn child_context(&self, record: &JsonObject, ctx: &StreamContext) -> Result<Option<StreamContext>> {
        Ok(Some(ctx.merge("promotedLinkId", id_of(record, self.name())?)))
    }
}

// ============================================================================
// promoted_link_daily_performance
// ============================================================================

/// Daily periodic content report for one campaign
///
/// Each promoted link result carries a `results` list with one entry per
/// day; every entry becomes its own record.
#[derive(Debug, Clone, Copy)]
pub struct PromotedLinkDailyPerformanceStream {
    settings: StreamSettings,
}

impl PromotedLinkDailyPerformanceStream {
    /// Up to a week of days per page
    pub const PAGE_SIZE: u64 = 7;

    /// Create the stream
    pub fn new(settings: StreamSettings) -> Self {
        Self { settings }
    }
}

impl StreamDefinition for PromotedLinkDailyPerformanceStream {
    fn kind(&self) -> StreamKind {
        StreamKind::PromotedLinkDailyPerformance
    }

    fn path(&self) -> &'static str {
        "/reports/marketers/{marketerId}/campaigns/{campaignId}/periodicContent"
    }

    fn records_key(&self) -> &'static str {
        "promotedLinkResults"
    }

    fn primary_keys(&self) -> &'static [&'static str] {
        &["promotedLinkId", "date"]
    }

    fn replication_key(&self) -> Option<&'static str> {
        Some("date")
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(PeriodicContentPaginator::new(Self::PAGE_SIZE))
    }

    fn url_params(
        &self,
        _ctx: &StreamContext,
        starting: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<QueryParams> {
        let mut params = vec![param("breakdown", "daily")];
        params.extend(report_window(starting, now));
        params.extend([
            param("includeArchivedCampaigns", self.settings.include_archived),
            param("includeConversionDetails", true),
            param("sort", "+fromDate"),
        ]);
        Ok(params)
    }

    fn reshape(&self, record: JsonObject, _ctx: &StreamContext) -> Result<Vec<JsonObject>> {
        explode(record, "results", self.name())?
            .into_iter()
            .map(|mut row| {
                let date = match row.remove("metadata") {
                    Some(JsonValue::Object(mut metadata)) => metadata
                        .remove("id")
                        .ok_or_else(|| Error::extraction(self.name(), "missing 'metadata.id'"))?,
                    _ => return Err(Error::extraction(self.name(), "missing 'metadata'")),
                };
                row.insert("date".to_string(), date);
                hoist(&mut row, "metrics", self.name())?;
                Ok(row)
            })
            .collect()
    }
}

// ============================================================================
// section_daily_performance
// ============================================================================

/// Daily per-section report for one campaign
///
/// Each result is one day holding a `sections` list; every section becomes a
/// record with its metadata and metrics flattened in.
#[derive(Debug, Clone, Copy)]
pub struct SectionDailyPerformanceStream {
    settings: StreamSettings,
}

impl SectionDailyPerformanceStream {
    /// Page size used by the sections report
    pub const PAGE_SIZE: u64 = 500;

    /// Create the stream
    pub fn new(settings: StreamSettings) -> Self {
        Self { settings }
    }
}

impl StreamDefinition for SectionDailyPerformanceStream {
    fn kind(&self) -> StreamKind {
        StreamKind::SectionDailyPerformance
    }

    fn path(&self) -> &'static str {
        "/reports/marketers/{marketerId}/sections/date"
    }

    fn records_key(&self) -> &'static str {
        "results"
    }

    fn primary_keys(&self) -> &'static [&'static str] {
        &["campaignId", "date", "id"]
    }

    fn replication_key(&self) -> Option<&'static str> {
        Some("date")
    }

    fn is_sorted(&self) -> bool {
        true
    }

    fn paginator(&self) -> Box<dyn Paginator> {
        Box::new(ResultsPaginator::new(Self::PAGE_SIZE))
    }

    fn url_params(
        &self,
        ctx: &StreamContext,
        starting: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<QueryParams> {
        let mut params = vec![param("campaignId", required(ctx, "campaignId")?)];
        params.extend(report_window(starting, now));
        params.extend([
            param("includeArchivedCampaigns", self.settings.include_archived),
            param("includeConversionDetails", true),
        ]);
        Ok(params)
    }

    fn reshape(&self, mut record: JsonObject, ctx: &StreamContext) -> Result<Vec<JsonObject>> {
        // the day lives in the result's metadata, which each section's own
        // metadata overwrites on merge
        let day = record
            .get("metadata")
            .and_then(|metadata| metadata.get("id"))
            .cloned();
        record.remove("totalResults");

        explode(record, "sections", self.name())?
            .into_iter()
            .map(|mut row| {
                hoist(&mut row, "metadata", self.name())?;
                hoist(&mut row, "metrics", self.name())?;
                row.remove("totalResults");
                if !row.contains_key("date") {
                    if let Some(day) = &day {
                        row.insert("date".to_string(), day.clone());
                    }
                }
                if let Some(campaign_id) = ctx.get("campaignId") {
                    row.entry("campaignId")
                        .or_insert_with(|| JsonValue::String(campaign_id.to_string()));
                }
                Ok(row)
            })
            .collect()
    }
}
