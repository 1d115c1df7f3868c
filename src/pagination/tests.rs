//! Tests for pagination module

use super::*;
use crate::config::FetchConfig;
use crate::error::Error;
use crate::http::{HttpClient, HttpClientConfig};
use crate::query::QuerySpec;
use crate::types::OutputFormat;
use futures::TryStreamExt;
use serde_json::json;
use test_case::test_case;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// PageCursor Tests
// ============================================================================

fn drain_skips(page_size: u32, total: u64) -> Vec<u64> {
    let mut cursor = PageCursor::with_total(page_size, total).unwrap();
    let mut skips = Vec::new();
    while let Some(skip) = cursor.next_skip() {
        skips.push(skip);
        cursor.advance();
    }
    assert!(cursor.is_done());
    skips
}

#[test_case(10, 0 => Vec::<u64>::new(); "empty result set")]
#[test_case(10, 1 => vec![0]; "single record")]
#[test_case(10, 10 => vec![0]; "exactly one full page")]
#[test_case(10, 25 => vec![0, 10, 20]; "partial last page")]
#[test_case(10, 30 => vec![0, 10, 20]; "full last page")]
#[test_case(1, 3 => vec![0, 1, 2]; "page size one")]
#[test_case(10_000, 25_001 => vec![0, 10_000, 20_000]; "default page size")]
fn test_cursor_skips(page_size: u32, total: u64) -> Vec<u64> {
    drain_skips(page_size, total)
}

#[test]
fn test_cursor_page_count_is_ceil() {
    for page_size in 1..=12u32 {
        for total in 0..=50u64 {
            let skips = drain_skips(page_size, total);
            let expected = total.div_ceil(u64::from(page_size));
            assert_eq!(skips.len() as u64, expected, "p={page_size} T={total}");
            assert!(skips.windows(2).all(|w| w[1] == w[0] + u64::from(page_size)));

            let cursor = PageCursor::with_total(page_size, total).unwrap();
            assert_eq!(cursor.expected_pages(), Some(expected));
        }
    }
}

#[test]
fn test_cursor_unknown_total() {
    let cursor = PageCursor::new(10).unwrap();
    assert_eq!(cursor.total(), None);
    assert_eq!(cursor.next_skip(), None);
    assert!(!cursor.is_done());
    assert_eq!(cursor.expected_pages(), None);
}

#[test]
fn test_cursor_zero_page_size() {
    assert!(matches!(
        PageCursor::new(0),
        Err(Error::InvalidConfigValue { .. })
    ));
}

#[test]
fn test_cursor_expected_records() {
    let cursor = PageCursor::with_total(10, 25).unwrap();
    assert_eq!(cursor.expected_records_at(0), Some(10));
    assert_eq!(cursor.expected_records_at(20), Some(5));
    assert_eq!(cursor.expected_records_at(30), Some(0));
}

#[test]
fn test_cursor_advance_counts_pages() {
    let mut cursor = PageCursor::with_total(5, 12).unwrap();
    cursor.advance();
    cursor.advance();
    assert_eq!(cursor.skipped(), 10);
    assert_eq!(cursor.pages_issued(), 2);
    assert_eq!(cursor.next_skip(), Some(10));
}

// ============================================================================
// PagedFetcher Tests
// ============================================================================

fn query_for(server: &MockServer, format: OutputFormat, page_size: u32) -> QuerySpec {
    let config = FetchConfig {
        endpoint: server.uri(),
        dataset_name: "Things".to_string(),
        output_format: format,
        page_size,
        ..Default::default()
    };
    QuerySpec::from_config(&config).unwrap()
}

fn client() -> HttpClient {
    HttpClient::with_config(HttpClientConfig::builder().no_rate_limit().build()).unwrap()
}

async fn mount_probe(server: &MockServer, total: u64) {
    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param("$inlinecount", "allpages"))
        .and(query_param("$top", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "metadata": {"count": total},
            "Things": [{"id": 0}]
        })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, skip: u64, body: &str) {
    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param("$skip", skip.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetcher_probe_total() {
    let server = MockServer::start().await;
    mount_probe(&server, 25).await;

    let client = client();
    let query = query_for(&server, OutputFormat::Jsonl, 10);
    let mut fetcher = PagedFetcher::new(&client, &query).unwrap();

    assert_eq!(fetcher.probe_total().await.unwrap(), 25);
    assert_eq!(fetcher.cursor().total(), Some(25));
}

#[tokio::test]
async fn test_fetcher_pages_in_order() {
    let server = MockServer::start().await;
    mount_probe(&server, 25).await;
    mount_page(&server, 0, "page-0").await;
    mount_page(&server, 10, "page-1").await;
    mount_page(&server, 20, "page-2").await;

    let client = client();
    let query = query_for(&server, OutputFormat::Jsonl, 10);
    let mut fetcher = PagedFetcher::new(&client, &query).unwrap();

    let mut pages = Vec::new();
    while let Some(page) = fetcher.next_page().await.unwrap() {
        pages.push(page);
    }

    let skips: Vec<u64> = pages.iter().map(|p| p.skip).collect();
    let bodies: Vec<&str> = pages.iter().map(|p| p.body.as_str()).collect();
    let expected: Vec<u64> = pages.iter().map(|p| p.expected_records).collect();
    assert_eq!(skips, vec![0, 10, 20]);
    assert_eq!(bodies, vec!["page-0", "page-1", "page-2"]);
    assert_eq!(expected, vec![10, 10, 5]);

    // Exhausted fetchers stay exhausted without further requests.
    assert!(fetcher.next_page().await.unwrap().is_none());
}

#[tokio::test]
async fn test_fetcher_zero_total_issues_no_pages() {
    let server = MockServer::start().await;
    mount_probe(&server, 0).await;

    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param_is_missing("$inlinecount"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client();
    let query = query_for(&server, OutputFormat::Csv, 10);
    let mut fetcher = PagedFetcher::new(&client, &query).unwrap();

    assert!(fetcher.next_page().await.unwrap().is_none());
    assert!(fetcher.cursor().is_done());
}

#[tokio::test]
async fn test_fetcher_stops_by_count_not_by_empty_page() {
    let server = MockServer::start().await;
    mount_probe(&server, 20).await;
    mount_page(&server, 0, "a").await;
    mount_page(&server, 10, "b").await;

    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param("$skip", "20"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client();
    let query = query_for(&server, OutputFormat::Jsonl, 10);
    let pages: Vec<Page> = PagedFetcher::new(&client, &query)
        .unwrap()
        .into_stream()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(pages.len(), 2);
}

#[tokio::test]
async fn test_fetcher_page_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param("$skip", "0"))
        .and(query_param("$top", "50"))
        .and(query_param("$format", "csv"))
        .and(query_param("$metadata", "off"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id\n1\n"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client();
    let query = query_for(&server, OutputFormat::Csv, 50);
    let mut fetcher = PagedFetcher::new(&client, &query).unwrap().with_total(1);

    let page = fetcher.next_page().await.unwrap().unwrap();
    assert_eq!(page.body, "id\n1\n");
}

#[tokio::test]
async fn test_fetcher_fails_on_second_page() {
    let server = MockServer::start().await;
    mount_probe(&server, 25).await;
    mount_page(&server, 0, "first").await;

    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param("$skip", "10"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .and(query_param("$skip", "20"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client();
    let query = query_for(&server, OutputFormat::Jsonl, 10);
    let mut fetcher = PagedFetcher::new(&client, &query).unwrap();

    assert_eq!(fetcher.next_page().await.unwrap().unwrap().body, "first");
    let err = fetcher.next_page().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_probe_without_count_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/Things"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Things": []})))
        .mount(&server)
        .await;

    let client = client();
    let query = query_for(&server, OutputFormat::Json, 10);
    let err = probe_total(&client, &query).await.unwrap_err();

    assert!(matches!(err, Error::Decode { .. }));
}
