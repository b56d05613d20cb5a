//! Tests for stream definitions

use super::*;
use crate::error::Error;
use crate::types::{JsonObject, StreamContext};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_case::test_case;

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn p(key: &str, value: &str) -> (String, String) {
    (key.to_string(), value.to_string())
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap()
}

fn campaign_ctx() -> StreamContext {
    StreamContext::with("marketerId", "m1").merge("campaignId", "c1")
}

// ============================================================================
// StreamKind Tests
// ============================================================================

#[test]
fn test_stream_kind_names_round_trip() {
    for kind in StreamKind::ALL {
        assert_eq!(kind.as_str().parse::<StreamKind>().unwrap(), kind);
        assert_eq!(kind.to_string(), kind.as_str());
    }
    assert!("ads".parse::<StreamKind>().is_err());
}

#[test]
fn test_stream_kind_serde_names() {
    let kind: StreamKind = serde_json::from_value(json!("promoted_link_daily_performance")).unwrap();
    assert_eq!(kind, StreamKind::PromotedLinkDailyPerformance);
    assert_eq!(
        serde_json::to_value(StreamKind::SectionDailyPerformance).unwrap(),
        json!("section_daily_performance")
    );
}

#[test]
fn test_stream_tree() {
    assert_eq!(StreamKind::roots(), vec![StreamKind::Marketers]);
    assert_eq!(
        StreamKind::Marketers.children(),
        vec![StreamKind::Campaigns, StreamKind::Budgets]
    );
    assert_eq!(
        StreamKind::Campaigns.children(),
        vec![
            StreamKind::PromotedLinks,
            StreamKind::PromotedLinkDailyPerformance,
            StreamKind::SectionDailyPerformance,
        ]
    );
    assert!(StreamKind::Budgets.children().is_empty());

    assert!(StreamKind::Marketers.is_ancestor_or_self(StreamKind::SectionDailyPerformance));
    assert!(StreamKind::Campaigns.is_ancestor_or_self(StreamKind::Campaigns));
    assert!(!StreamKind::Budgets.is_ancestor_or_self(StreamKind::Campaigns));
}

// ============================================================================
// Lookback Tests
// ============================================================================

#[test_case(Duration::hours(84), 3 ; "three and a half days floors")]
#[test_case(Duration::hours(23), 0 ; "under a day")]
#[test_case(Duration::days(365), 365 ; "a year")]
#[test_case(Duration::hours(-5), 0 ; "future start clamps to zero")]
fn test_days_to_look_back(elapsed: Duration, expected: i64) {
    assert_eq!(days_to_look_back(now() - elapsed, now()), expected);
}

// ============================================================================
// URL Parameter Tests
// ============================================================================

#[test]
fn test_marketers_params() {
    let stream = definition(StreamKind::Marketers, StreamSettings::default());
    let params = stream.url_params(&StreamContext::new(), None, now()).unwrap();
    assert_eq!(params, vec![p("extraFields", "Account")]);
    assert_eq!(stream.path(), "/marketers");
}

#[test]
fn test_campaigns_params_with_cursor() {
    let stream = CampaignsStream::new(StreamSettings::include_archived(true));
    let starting = now() - Duration::hours(84);
    let params = stream
        .url_params(&StreamContext::with("marketerId", "m1"), Some(starting), now())
        .unwrap();

    assert_eq!(
        params,
        vec![
            p("includeArchived", "true"),
            p("sort", "+lastModified"),
            p("daysToLookBackForChanges", "3"),
        ]
    );
}

#[test]
fn test_campaigns_params_without_cursor() {
    let stream = CampaignsStream::new(StreamSettings::default());
    let params = stream
        .url_params(&StreamContext::with("marketerId", "m1"), None, now())
        .unwrap();
    assert!(params.iter().all(|(k, _)| k != "daysToLookBackForChanges"));
    assert!(params.contains(&p("includeArchived", "false")));
}

#[test]
fn test_promoted_links_repeats_extra_fields() {
    let stream = definition(StreamKind::PromotedLinks, StreamSettings::default());
    let params = stream.url_params(&campaign_ctx(), None, now()).unwrap();
    let extra: Vec<&str> = params
        .iter()
        .filter(|(k, _)| k == "extraFields")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(extra, vec!["ImageURL", "ImageMetaData"]);
}

#[test]
fn test_periodic_content_params() {
    let stream = definition(
        StreamKind::PromotedLinkDailyPerformance,
        StreamSettings::include_archived(true),
    );
    let starting = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
    let params = stream.url_params(&campaign_ctx(), Some(starting), now()).unwrap();

    assert_eq!(
        params,
        vec![
            p("breakdown", "daily"),
            p("from", "2024-03-01"),
            p("to", "2024-03-10"),
            p("includeArchivedCampaigns", "true"),
            p("includeConversionDetails", "true"),
            p("sort", "+fromDate"),
        ]
    );
}

#[test]
fn test_section_params_need_campaign() {
    let stream = definition(StreamKind::SectionDailyPerformance, StreamSettings::default());

    let params = stream.url_params(&campaign_ctx(), None, now()).unwrap();
    assert_eq!(params[0], p("campaignId", "c1"));

    let err = stream
        .url_params(&StreamContext::with("marketerId", "m1"), None, now())
        .unwrap_err();
    assert!(matches!(err, Error::UndefinedVariable { .. }));
}

// ============================================================================
// Child Context Tests
// ============================================================================

#[test]
fn test_child_contexts_merge() {
    let marketers = definition(StreamKind::Marketers, StreamSettings::default());
    let campaigns = definition(StreamKind::Campaigns, StreamSettings::default());
    let links = definition(StreamKind::PromotedLinks, StreamSettings::default());

    let marketer_ctx = marketers
        .child_context(&object(json!({"id": "m1"})), &StreamContext::new())
        .unwrap()
        .unwrap();
    assert_eq!(marketer_ctx, StreamContext::with("marketerId", "m1"));

    let campaign_ctx = campaigns
        .child_context(&object(json!({"id": "c1"})), &marketer_ctx)
        .unwrap()
        .unwrap();
    assert_eq!(campaign_ctx.get("marketerId"), Some("m1"));
    assert_eq!(campaign_ctx.get("campaignId"), Some("c1"));

    let link_ctx = links
        .child_context(&object(json!({"id": 42})), &campaign_ctx)
        .unwrap()
        .unwrap();
    assert_eq!(link_ctx.get("promotedLinkId"), Some("42"));
    // the parent context is left untouched
    assert_eq!(campaign_ctx.get("promotedLinkId"), None);
}

#[test]
fn test_child_context_requires_id() {
    let marketers = definition(StreamKind::Marketers, StreamSettings::default());
    let err = marketers
        .child_context(&object(json!({"name": "no id"})), &StreamContext::new())
        .unwrap_err();
    assert!(matches!(err, Error::RecordExtraction { .. }));

    let budgets = definition(StreamKind::Budgets, StreamSettings::default());
    assert!(budgets
        .child_context(&object(json!({"id": "b1"})), &StreamContext::new())
        .unwrap()
        .is_none());
}

// ============================================================================
// Reshape Tests
// ============================================================================

#[test]
fn test_periodic_content_reshape() {
    let stream = definition(StreamKind::PromotedLinkDailyPerformance, StreamSettings::default());
    let record = object(json!({
        "promotedLinkId": "pl1",
        "totalResults": 2,
        "results": [
            {"metadata": {"id": "2024-03-01", "fromDate": "2024-03-01"}, "metrics": {"clicks": 3, "spend": 1.5}},
            {"metadata": {"id": "2024-03-02", "fromDate": "2024-03-02"}, "metrics": {"clicks": 0, "spend": 0.0}}
        ]
    }));

    let rows = stream.reshape(record, &campaign_ctx()).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(
        serde_json::Value::Object(rows[0].clone()),
        json!({
            "promotedLinkId": "pl1",
            "totalResults": 2,
            "date": "2024-03-01",
            "clicks": 3,
            "spend": 1.5
        })
    );
    assert_eq!(rows[1]["date"], "2024-03-02");
}

#[test]
fn test_periodic_content_reshape_missing_metrics() {
    let stream = definition(StreamKind::PromotedLinkDailyPerformance, StreamSettings::default());
    let record = object(json!({
        "promotedLinkId": "pl1",
        "results": [{"metadata": {"id": "2024-03-01"}}]
    }));
    let err = stream.reshape(record, &campaign_ctx()).unwrap_err();
    assert!(matches!(err, Error::RecordExtraction { .. }));
}

#[test]
fn test_section_reshape() {
    let stream = definition(StreamKind::SectionDailyPerformance, StreamSettings::default());
    let record = object(json!({
        "metadata": {"id": "2024-03-05"},
        "totalResults": 120,
        "sections": [
            {
                "metadata": {"id": "s1", "name": "Sports", "publisherId": "p1"},
                "metrics": {"impressions": 1000, "clicks": 7}
            }
        ]
    }));

    let rows = stream.reshape(record, &campaign_ctx()).unwrap();

    assert_eq!(
        rows,
        vec![object(json!({
            "id": "s1",
            "name": "Sports",
            "publisherId": "p1",
            "impressions": 1000,
            "clicks": 7,
            "date": "2024-03-05",
            "campaignId": "c1"
        }))]
    );
}

#[test]
fn test_section_reshape_empty_sections() {
    let stream = definition(StreamKind::SectionDailyPerformance, StreamSettings::default());
    let record = object(json!({"metadata": {"id": "2024-03-05"}, "totalResults": 0, "sections": []}));
    assert!(stream.reshape(record, &campaign_ctx()).unwrap().is_empty());
}

#[test]
fn test_default_reshape_is_identity() {
    let stream = definition(StreamKind::Budgets, StreamSettings::default());
    let record = object(json!({"id": "b1", "amount": 100}));
    assert_eq!(
        stream.reshape(record.clone(), &StreamContext::new()).unwrap(),
        vec![record]
    );
}

// ============================================================================
// Metadata Tests
// ============================================================================

#[test]
fn test_replication_metadata() {
    let settings = StreamSettings::default();
    let replicated: Vec<(StreamKind, Option<&str>, bool)> = StreamKind::ALL
        .into_iter()
        .map(|kind| {
            let stream = definition(kind, settings);
            (kind, stream.replication_key(), stream.is_sorted())
        })
        .collect();

    assert_eq!(
        replicated,
        vec![
            (StreamKind::Marketers, None, false),
            (StreamKind::Campaigns, Some("lastModified"), true),
            (StreamKind::Budgets, None, false),
            (StreamKind::PromotedLinks, None, false),
            (StreamKind::PromotedLinkDailyPerformance, Some("date"), false),
            (StreamKind::SectionDailyPerformance, Some("date"), true),
        ]
    );
}
