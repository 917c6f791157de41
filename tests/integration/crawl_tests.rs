//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the crawl loop end-to-end.

use chrono::Utc;
use futures::{stream, StreamExt};
use loopcrawl::config::{parse_config, Config};
use loopcrawl::crawler::{
    CrawlHandle, CrawlStats, CrawlStatsSnapshot, Crawler, Extractor, FetchResult, Frontier,
    RevisitFilter,
};
use loopcrawl::identity_hash;
use loopcrawl::output::{DisabledIndex, HttpSearchIndex};
use loopcrawl::storage::{PageStore, SqliteStorage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `seed`
fn create_test_config(seed: &str, db_path: &str, extra: &str) -> Config {
    parse_config(&format!(
        r#"
seeds = ["{seed}"]
keywords = ["rust", "backend", "intern"]

[crawler]
frontier-capacity = 4
max-concurrent-fetches = 8
request-timeout-ms = 300

[storage]
database-path = "{db_path}"

{extra}
"#
    ))
    .expect("test config should be valid")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head><title>Test</title></head><body>{}</body></html>", body),
        "text/html",
    )
}

/// Mounts `/` linking to `/page1` and `/page2`, which have no links of their own
async fn mount_small_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<a href="/page1">one</a> <a href="/page2">two</a> rust"#))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html("rust backend"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("intern"))
        .mount(server)
        .await;
}

async fn wait_for(handle: &CrawlHandle, done: impl Fn(&CrawlStatsSnapshot) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done(&handle.stats()) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn test_extracted_links_reach_frontier() {
    let page = FetchResult {
        url: "https://a.test/".to_string(),
        body: br#"<html><body><a href="/b">b</a><a href="https://c.test/">c</a></body></html>"#.to_vec(),
        status: 200,
        content_length: None,
        content_type: Some("text/html".to_string()),
        fetched_at: Utc::now(),
    };

    let extract = Extractor::new(["rust"]).extract(&page).unwrap();

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let filter = RevisitFilter::new(chrono::Duration::hours(6), store, Arc::new(CrawlStats::new()));
    let admitted = filter.admit(&extract.links, Utc::now());

    let frontier = Frontier::new(10);
    let cancel = CancellationToken::new();
    let pushed = frontier
        .push(&cancel, admitted.len(), stream::iter(admitted))
        .await;
    assert_eq!(pushed, 2);

    let queued: Vec<String> = frontier.pop(&cancel, 2).collect().await;
    assert_eq!(queued, vec!["https://a.test/b", "https://c.test/"]);
    assert!(frontier.is_empty());
}

#[tokio::test]
async fn test_full_crawl_stores_and_indexes() {
    let site = MockServer::start().await;
    mount_small_site(&site).await;

    let search = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/pages_index/_doc/[0-9a-f]{64}$"))
        .respond_with(ResponseTemplate::new(201))
        .expect(3)
        .mount(&search)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pages.db");
    let config = create_test_config(
        &format!("{}/", site.uri()),
        db_path.to_str().unwrap(),
        &format!("[index]\naddress = \"{}\"", search.uri()),
    );

    let store = Arc::new(SqliteStorage::new(&db_path).unwrap());
    let index = Arc::new(HttpSearchIndex::new(config.index.as_ref().unwrap()).unwrap());
    let handle = Crawler::new(config, store.clone(), index).unwrap().spawn();

    wait_for(&handle, |s| s.stored >= 3 && s.indexed >= 3).await;
    let snapshot = handle.shutdown().await;

    assert_eq!(snapshot.fetched, 3);
    assert_eq!(snapshot.stored, 3);
    assert_eq!(snapshot.indexed, 3);
    assert_eq!(snapshot.total_errors(), 0);
    assert_eq!(store.count_pages().unwrap(), 3);

    let page1 = store
        .get_by_identity(&identity_hash(&format!("{}/page1", site.uri())))
        .unwrap()
        .expect("page1 should be stored");
    assert_eq!(page1.index, 2);
    assert_eq!(page1.title.as_deref(), Some("Test"));
}

#[tokio::test]
async fn test_second_run_skips_recently_visited_links() {
    let site = MockServer::start().await;
    mount_small_site(&site).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("pages.db");
    let db = db_path.to_str().unwrap();
    let seed = format!("{}/", site.uri());

    let first = Crawler::from_config(create_test_config(&seed, db, ""))
        .unwrap()
        .spawn();
    wait_for(&first, |s| s.stored >= 3).await;
    assert_eq!(first.shutdown().await.fetched, 3);

    let second = Crawler::from_config(create_test_config(&seed, db, ""))
        .unwrap()
        .spawn();
    wait_for(&second, |s| s.links_rejected >= 2).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = second.shutdown().await;

    // Only the seed is fetched again; its links were stored moments ago
    assert_eq!(snapshot.fetched, 1);
    assert_eq!(snapshot.links_rejected, 2);
    assert_eq!(snapshot.links_admitted, 0);
}

#[tokio::test]
async fn test_timed_out_fetch_counts_one_error() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html("slow").set_delay(Duration::from_secs(3)))
        .mount(&site)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let config = create_test_config(&format!("{}/slow", site.uri()), "unused.db", "");
    let handle = Crawler::new(config, store.clone(), Arc::new(DisabledIndex))
        .unwrap()
        .spawn();

    wait_for(&handle, |s| s.fetch_failures >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = handle.shutdown().await;

    assert_eq!(snapshot.fetch_failures, 1);
    assert_eq!(snapshot.fetched, 0);
    assert_eq!(snapshot.extracted, 0);
    assert_eq!(store.count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_non_html_response_is_not_stored() {
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&site)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let config = create_test_config(&format!("{}/report.pdf", site.uri()), "unused.db", "");
    let handle = Crawler::new(config, store.clone(), Arc::new(DisabledIndex))
        .unwrap()
        .spawn();

    wait_for(&handle, |s| s.extract_failures >= 1).await;
    let snapshot = handle.shutdown().await;

    assert_eq!(snapshot.fetched, 1);
    assert_eq!(snapshot.extract_failures, 1);
    assert_eq!(store.count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_shutdown_with_full_frontier_returns() {
    let site = MockServer::start().await;
    let links: String = (0..50)
        .map(|i| format!(r#"<a href="/p{}">p</a>"#, i))
        .collect();
    Mock::given(method("GET"))
        .respond_with(html(&links).set_delay(Duration::from_millis(50)))
        .mount(&site)
        .await;

    let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let config = create_test_config(&format!("{}/", site.uri()), "unused.db", "");
    let handle = Crawler::new(config, store, Arc::new(DisabledIndex))
        .unwrap()
        .spawn();

    wait_for(&handle, |s| s.fetched >= 5).await;
    assert!(handle.frontier_len() <= 4);
    let snapshot = tokio::time::timeout(Duration::from_secs(3), handle.shutdown())
        .await
        .expect("shutdown should not hang");
    assert!(snapshot.fetched >= 5);
}
