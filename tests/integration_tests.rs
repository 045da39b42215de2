//! Integration tests using mock Parse server
//!
//! Tests the full end-to-end flow: Query → stitched page requests → records

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};
use stitch_query::{
    format_date, parse_date, stitch, Error, FindOptions, MemoryEngine, ParseClient, ParseConfig,
    Query, QueryEngine, QueryStitcher, StitchLimits, StitchOptions, StopReason,
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

// ============================================================================
// Mock backend
// ============================================================================

/// Serves a fixed, createdAt-ordered class honoring `skip`, `limit`
/// and a `createdAt` `$gt` constraint.
struct ParseBackend {
    records: Vec<Value>,
}

impl ParseBackend {
    fn with_count(count: usize) -> Self {
        let start = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let records = (0..count)
            .map(|i| {
                let created = start + Duration::seconds(i as i64);
                json!({
                    "objectId": format!("r{i:06}"),
                    "index": i,
                    "createdAt": format_date(&created),
                })
            })
            .collect();
        Self { records }
    }

    fn created_after(request: &Request) -> Option<DateTime<Utc>> {
        let (_, raw) = request.url.query_pairs().find(|(k, _)| k == "where")?;
        let constraints: Value = serde_json::from_str(&raw).ok()?;
        parse_date(&constraints["createdAt"]["$gt"])
    }

    fn param(request: &Request, name: &str) -> Option<usize> {
        request
            .url
            .query_pairs()
            .find(|(k, _)| k == name)
            .and_then(|(_, v)| v.parse().ok())
    }
}

impl Respond for ParseBackend {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let skip = Self::param(request, "skip").unwrap_or(0);
        let limit = Self::param(request, "limit").unwrap_or(100);
        let after = Self::created_after(request);

        let results: Vec<&Value> = self
            .records
            .iter()
            .filter(|record| match after {
                Some(after) => parse_date(&record["createdAt"]).is_some_and(|d| d > after),
                None => true,
            })
            .skip(skip)
            .take(limit)
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "results": results }))
    }
}

async fn mount_backend(server: &MockServer, class: &str, count: usize) {
    Mock::given(method("GET"))
        .and(path(format!("/parse/classes/{class}")))
        .respond_with(ParseBackend::with_count(count))
        .mount(server)
        .await;
}

fn client_for(server: &MockServer) -> ParseClient {
    ParseClient::new(
        ParseConfig::builder()
            .server_url(format!("{}/parse", server.uri()))
            .application_id("app-id")
            .rest_api_key("rest-key")
            .master_key("master-key")
            .build(),
    )
    .unwrap()
}

fn indices(records: &[stitch_query::Record]) -> Vec<u64> {
    records
        .iter()
        .map(|r| r.get("index").and_then(Value::as_u64).unwrap())
        .collect()
}

// ============================================================================
// Offset stitching
// ============================================================================

#[tokio::test]
async fn test_stitch_concatenates_pages_in_order() {
    let server = MockServer::start().await;
    mount_backend(&server, "Item", 12).await;
    let client = client_for(&server);

    let outcome = QueryStitcher::new(&client)
        .with_limits(StitchLimits::new(5, 10))
        .stitch_with_outcome(Query::new("Item"), &StitchOptions::new())
        .await
        .unwrap();

    assert_eq!(indices(&outcome.records), (0..12).collect::<Vec<_>>());
    assert_eq!(outcome.pages_fetched, 3);
    assert_eq!(outcome.stop_reason, StopReason::Exhausted);

    let skips: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| {
            r.url
                .query_pairs()
                .find(|(k, _)| k == "skip")
                .map_or_else(|| "0".to_string(), |(_, v)| v.into_owned())
        })
        .collect();
    assert_eq!(skips, vec!["0", "5", "10"]);
}

#[tokio::test]
async fn test_stitch_truncates_at_offset_depth() {
    let server = MockServer::start().await;
    mount_backend(&server, "Item", 10_100).await;
    let client = client_for(&server);

    let outcome = QueryStitcher::new(&client)
        .stitch_with_outcome(Query::new("Item"), &StitchOptions::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 10_000);
    assert!(outcome.is_truncated());
    assert_eq!(server.received_requests().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_super_stitch_fetches_everything() {
    let server = MockServer::start().await;
    mount_backend(&server, "Item", 10_100).await;
    let client = client_for(&server);

    let options = StitchOptions::new().with_super_stitch(true);
    let records = stitch(&client, Query::new("Item"), &options)
        .await
        .unwrap();

    assert_eq!(records.len(), 10_100);
    assert_eq!(indices(&records), (0..10_100).collect::<Vec<_>>());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 11);

    let last = &requests[10];
    let pairs: Vec<(String, String)> = last
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(pairs.contains(&("order".to_string(), "createdAt".to_string())));
    assert!(!pairs.iter().any(|(k, _)| k == "skip"));

    let (_, raw_where) = pairs.iter().find(|(k, _)| k == "where").unwrap();
    let constraints: Value = serde_json::from_str(raw_where).unwrap();
    assert_eq!(constraints["createdAt"]["$gt"]["__type"], "Date");
}

#[tokio::test]
async fn test_super_stitch_keeps_caller_constraints() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/parse/classes/Item"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [
            {"objectId": "a", "createdAt": "2024-01-01T00:00:00.000Z"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records = QueryStitcher::new(&client)
        .with_limits(StitchLimits::new(2, 2))
        .stitch(
            Query::new("Item").equal_to("kind", "widget"),
            &StitchOptions::new().with_super_stitch(true),
        )
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let requests = server.received_requests().await.unwrap();
    let (_, raw_where) = requests[0]
        .url
        .query_pairs()
        .find(|(k, _)| k == "where")
        .unwrap();
    let constraints: Value = serde_json::from_str(&raw_where).unwrap();
    assert_eq!(constraints, json!({"kind": "widget"}));
}

// ============================================================================
// Failure propagation
// ============================================================================

#[tokio::test]
async fn test_failure_mid_stitch_discards_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/parse/classes/Item"))
        .and(query_param("skip", "3"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 155,
            "error": "Request limit exceeded"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_backend(&server, "Item", 10).await;

    let client = client_for(&server);
    let err = QueryStitcher::new(&client)
        .with_limits(StitchLimits::new(3, 10))
        .stitch(Query::new("Item"), &StitchOptions::new())
        .await
        .unwrap_err();

    match err {
        Error::Parse { code, message } => {
            assert_eq!(code, 155);
            assert_eq!(message, "Request limit exceeded");
        }
        other => panic!("expected Parse error, got {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/parse/classes/Item"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = stitch(&client, Query::new("Item"), &StitchOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 502, .. }));
}

// ============================================================================
// Options passthrough
// ============================================================================

#[tokio::test]
async fn test_master_key_is_sent_on_every_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/parse/classes/Item"))
        .and(header("X-Parse-Master-Key", "master-key"))
        .respond_with(ParseBackend::with_count(7))
        .expect(4)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let options = StitchOptions::new()
        .with_super_stitch(true)
        .with_option("useMasterKey", true);

    let records = QueryStitcher::new(&client)
        .with_limits(StitchLimits::new(2, 2))
        .stitch(Query::new("Item"), &options)
        .await
        .unwrap();
    assert_eq!(records.len(), 7);
}

// ============================================================================
// Engine parity
// ============================================================================

#[tokio::test]
async fn test_memory_engine_matches_server_results() {
    let server = MockServer::start().await;
    mount_backend(&server, "Item", 23).await;
    let client = client_for(&server);

    let from_server = client
        .find(&Query::new("Item").limit(1000), &FindOptions::new())
        .await
        .unwrap();

    let engine = MemoryEngine::new().with_records("Item", from_server.clone());
    let limits = StitchLimits::new(4, 2);
    let options = StitchOptions::new().with_super_stitch(true);

    let via_memory = QueryStitcher::new(&engine)
        .with_limits(limits)
        .stitch(Query::new("Item"), &options)
        .await
        .unwrap();
    let via_server = QueryStitcher::new(&client)
        .with_limits(limits)
        .stitch(Query::new("Item"), &options)
        .await
        .unwrap();

    assert_eq!(via_memory, via_server);
    assert_eq!(via_server, from_server);
}
