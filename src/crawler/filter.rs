//! Revisit filter
//!
//! Decides which discovered links go back into the frontier. A link must be
//! syntactically crawlable, and the page store must not have a visit for its
//! identity inside the freshness window.

use crate::crawler::frontier::Frontier;
use crate::crawler::parser::PageExtract;
use crate::crawler::stats::CrawlStats;
use crate::storage::PageStore;
use crate::url::{check_link_format, identity_hash};
use crate::UrlError;
use chrono::{DateTime, Duration, Utc};
use futures::stream;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Links the filter refuses to judge
#[derive(Debug, Error)]
pub enum FilterError {
    #[error(transparent)]
    InvalidLink(#[from] UrlError),
}

/// Outcome of checking one syntactically valid link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No visit on record
    Unvisited,
    /// Last visit is at least one freshness window old
    Stale { last_updated: DateTime<Utc> },
    /// The store could not be queried; admitted anyway
    StoreUnavailable,
    /// Visited inside the freshness window
    TooRecent { last_updated: DateTime<Utc> },
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Admission::TooRecent { .. })
    }
}

/// The filter stage of the crawl pipeline
pub struct RevisitFilter {
    window: Duration,
    store: Arc<dyn PageStore>,
    stats: Arc<CrawlStats>,
}

impl RevisitFilter {
    pub fn new(window: Duration, store: Arc<dyn PageStore>, stats: Arc<CrawlStats>) -> Self {
        Self {
            window,
            store,
            stats,
        }
    }

    /// Judges a single link against the page store at time `now`
    ///
    /// # Returns
    ///
    /// * `Ok(Admission)` - The link is well formed; see [`Admission::is_accepted`]
    /// * `Err(FilterError)` - The link is empty, fragment-only, or not http(s)
    pub fn evaluate(&self, link: &str, now: DateTime<Utc>) -> Result<Admission, FilterError> {
        check_link_format(link)?;

        let identity = identity_hash(link);
        match self.store.get_by_identity(&identity) {
            Ok(None) => Ok(Admission::Unvisited),
            Ok(Some(visit)) if now - visit.last_updated >= self.window => Ok(Admission::Stale {
                last_updated: visit.last_updated,
            }),
            Ok(Some(visit)) => Ok(Admission::TooRecent {
                last_updated: visit.last_updated,
            }),
            Err(e) => {
                self.stats.record_filter_store_error();
                tracing::warn!(link = %link, identity = %identity, error = %e, "Visit lookup failed, admitting link");
                Ok(Admission::StoreUnavailable)
            }
        }
    }

    /// Returns the accepted subset of `links`, in order
    pub fn admit(&self, links: &[String], now: DateTime<Utc>) -> Vec<String> {
        links
            .iter()
            .filter(|link| match self.evaluate(link, now) {
                Ok(admission) if admission.is_accepted() => {
                    self.stats.record_link_admitted();
                    true
                }
                Ok(_) => {
                    self.stats.record_link_rejected();
                    tracing::trace!("Visited too recently: {}", link);
                    false
                }
                Err(e) => {
                    self.stats.record_link_invalid();
                    tracing::debug!("Dropping link: {}", e);
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// Consumes extracts until cancelled, pushing accepted links into the frontier
    ///
    /// This is the only stage holding a frontier handle for writing, so a
    /// full frontier suspends it and backs the whole loop up. Store lookups
    /// run on the blocking pool, next to the fan-out writers.
    pub async fn run(
        self: Arc<Self>,
        frontier: Arc<Frontier>,
        cancel: CancellationToken,
        mut input: mpsc::Receiver<PageExtract>,
    ) {
        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                page = input.recv() => match page {
                    Some(page) => page,
                    None => break,
                },
            };

            let PageExtract { url, links, .. } = page;
            let filter = Arc::clone(&self);
            let admitted =
                match tokio::task::spawn_blocking(move || filter.admit(&links, Utc::now())).await {
                    Ok(admitted) => admitted,
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Link admission task aborted");
                        continue;
                    }
                };
            if admitted.is_empty() {
                continue;
            }

            let total = admitted.len();
            let pushed = frontier.push(&cancel, total, stream::iter(admitted)).await;
            tracing::debug!("Queued {}/{} links from {}", pushed, total, url);
        }

        tracing::debug!("Filter stage stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Page, SqliteStorage, StorageError, StorageResult, VisitRecord};
    use crate::url::IdentityHash;
    use futures::StreamExt;

    struct FailingStore;

    impl PageStore for FailingStore {
        fn get_by_identity(&self, _identity: &IdentityHash) -> StorageResult<Option<VisitRecord>> {
            Err(StorageError::Database("database is locked".to_string()))
        }

        fn insert(&self, _page: &Page) -> StorageResult<()> {
            Err(StorageError::Database("database is locked".to_string()))
        }

        fn update(&self, _page: &Page) -> StorageResult<bool> {
            Err(StorageError::Database("database is locked".to_string()))
        }

        fn count_pages(&self) -> StorageResult<u64> {
            Ok(0)
        }

        fn top_pages(&self, _limit: usize) -> StorageResult<Vec<VisitRecord>> {
            Ok(vec![])
        }
    }

    fn stored_page(url: &str, updated_at: DateTime<Utc>) -> Page {
        Page {
            identity: identity_hash(url),
            url: url.to_string(),
            title: None,
            content: "text".to_string(),
            index: 0,
            keywords_found: vec![],
            updated_at,
        }
    }

    fn create_filter() -> (RevisitFilter, Arc<SqliteStorage>, Arc<CrawlStats>) {
        let store = Arc::new(SqliteStorage::new_in_memory().unwrap());
        let stats = Arc::new(CrawlStats::new());
        let filter = RevisitFilter::new(Duration::hours(6), store.clone(), Arc::clone(&stats));
        (filter, store, stats)
    }

    #[test]
    fn test_unvisited_link_is_accepted() {
        let (filter, _, _) = create_filter();
        let admission = filter.evaluate("https://a.test/b", Utc::now()).unwrap();
        assert_eq!(admission, Admission::Unvisited);
    }

    #[test]
    fn test_invalid_links_rejected_regardless_of_store() {
        let (filter, _, _) = create_filter();
        let failing = RevisitFilter::new(Duration::hours(6), Arc::new(FailingStore), Arc::new(CrawlStats::new()));

        for link in ["file:///etc/passwd", "javascript:alert(1)", "mailto:a@b.test", "#top", "", "relative/path"] {
            assert!(matches!(
                filter.evaluate(link, Utc::now()),
                Err(FilterError::InvalidLink(UrlError::InvalidFormat(_)))
            ));
            assert!(failing.evaluate(link, Utc::now()).is_err());
        }
    }

    #[test]
    fn test_freshness_boundary() {
        let (filter, store, _) = create_filter();
        let now = Utc::now();
        let window = Duration::hours(6);

        store.insert(&stored_page("https://a.test/old", now - window)).unwrap();
        store
            .insert(&stored_page(
                "https://a.test/recent",
                now - window + Duration::milliseconds(1),
            ))
            .unwrap();

        assert!(filter.evaluate("https://a.test/old", now).unwrap().is_accepted());
        assert!(matches!(
            filter.evaluate("https://a.test/recent", now).unwrap(),
            Admission::TooRecent { .. }
        ));
    }

    #[test]
    fn test_trailing_slash_variant_shares_visit() {
        let (filter, store, _) = create_filter();
        let now = Utc::now();
        store.insert(&stored_page("https://a.test/jobs/", now)).unwrap();

        assert!(!filter.evaluate("https://a.test/jobs", now).unwrap().is_accepted());
    }

    #[test]
    fn test_store_error_fails_open() {
        let stats = Arc::new(CrawlStats::new());
        let filter = RevisitFilter::new(Duration::hours(6), Arc::new(FailingStore), Arc::clone(&stats));

        let admission = filter.evaluate("https://a.test/", Utc::now()).unwrap();
        assert_eq!(admission, Admission::StoreUnavailable);
        assert!(admission.is_accepted());
        assert_eq!(stats.snapshot().filter_store_errors, 1);
    }

    #[test]
    fn test_recently_stored_links_rejected_on_second_pass() {
        let (filter, store, stats) = create_filter();
        let links = vec!["https://a.test/b".to_string(), "https://c.test/".to_string()];
        let first_pass = Utc::now();

        assert_eq!(filter.admit(&links, first_pass), links);
        for link in &links {
            store.upsert(&stored_page(link, first_pass)).unwrap();
        }

        let second_pass = first_pass + Duration::seconds(1);
        assert!(filter.admit(&links, second_pass).is_empty());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.links_admitted, 2);
        assert_eq!(snapshot.links_rejected, 2);
    }

    #[test]
    fn test_admit_keeps_order_and_counts_invalid() {
        let (filter, _, stats) = create_filter();
        let links = vec![
            "https://a.test/b".to_string(),
            "mailto:x@a.test".to_string(),
            "https://c.test/".to_string(),
        ];

        let admitted = filter.admit(&links, Utc::now());
        assert_eq!(admitted, vec!["https://a.test/b", "https://c.test/"]);
        assert_eq!(stats.snapshot().links_invalid, 1);
    }

    #[tokio::test]
    async fn test_run_pushes_admitted_links() {
        let (filter, _, _) = create_filter();
        let frontier = Arc::new(Frontier::new(10));
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);

        let stage = tokio::spawn(Arc::new(filter).run(Arc::clone(&frontier), cancel.clone(), rx));

        tx.send(PageExtract {
            url: "https://a.test/".to_string(),
            text: String::new(),
            title: None,
            links: vec!["https://a.test/b".to_string(), "#top".to_string()],
            keywords: Default::default(),
        })
        .await
        .unwrap();
        drop(tx);
        stage.await.unwrap();

        let queued: Vec<String> = frontier.pop(&cancel, 1).collect().await;
        assert_eq!(queued, vec!["https://a.test/b"]);
        assert!(frontier.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_skips_recent_links_while_store_is_written() {
        let (filter, store, stats) = create_filter();
        let frontier = Arc::new(Frontier::new(10));
        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(1);

        let visited = "https://a.test/seen";
        store.upsert(&stored_page(visited, Utc::now())).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            tokio::task::spawn_blocking(move || {
                for i in 0..50 {
                    store
                        .upsert(&stored_page(&format!("https://w.test/{}", i), Utc::now()))
                        .unwrap();
                }
            })
        };

        let stage = tokio::spawn(Arc::new(filter).run(Arc::clone(&frontier), cancel.clone(), rx));
        tx.send(PageExtract {
            url: "https://a.test/".to_string(),
            text: String::new(),
            title: None,
            links: vec![visited.to_string(), "https://a.test/new".to_string()],
            keywords: Default::default(),
        })
        .await
        .unwrap();
        drop(tx);
        stage.await.unwrap();
        writer.await.unwrap();

        let queued: Vec<String> = frontier.pop(&cancel, 1).collect().await;
        assert_eq!(queued, vec!["https://a.test/new"]);
        assert_eq!(stats.snapshot().links_rejected, 1);
    }
}
