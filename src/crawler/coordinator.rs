//! Crawler coordinator - pipeline orchestration
//!
//! This module wires the crawl stages into a closed loop:
//!
//! ```text
//! Frontier -> Fetcher -> Extractor -> RevisitFilter -> Frontier
//!                            |
//!                            +-> page store / search index (fan-out)
//! ```
//!
//! Every stage runs on its own task, stages are joined by bounded channels,
//! and one cancellation token is observed at every wait point.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::fetcher::{build_http_client, FetchResult, Fetcher};
use crate::crawler::filter::RevisitFilter;
use crate::crawler::frontier::Frontier;
use crate::crawler::parser::{Extractor, PageExtract};
use crate::crawler::stats::{CrawlStats, CrawlStatsSnapshot};
use crate::output::{build_index, SearchIndex};
use crate::storage::{open_storage, Page, PageStore};
use crate::CrawlError;
use chrono::Utc;
use futures::stream;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// A configured crawl, ready to be spawned
pub struct Crawler {
    config: Arc<Config>,
    store: Arc<dyn PageStore>,
    index: Arc<dyn SearchIndex>,
    client: Client,
    stats: Arc<CrawlStats>,
}

impl Crawler {
    /// Creates a crawler over the given collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `store` - Page store consulted by the revisit filter and written by the fan-out
    /// * `index` - Search index receiving every extracted page
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to [`spawn`](Crawler::spawn)
    /// * `Err(CrawlError)` - The HTTP client could not be built
    pub fn new(
        config: Config,
        store: Arc<dyn PageStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Result<Self, CrawlError> {
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config: Arc::new(config),
            store,
            index,
            client,
            stats: Arc::new(CrawlStats::new()),
        })
    }

    /// Opens the configured SQLite store and search index, then creates the crawler
    pub fn from_config(config: Config) -> Result<Self, CrawlError> {
        let store = open_storage(Path::new(&config.storage.database_path))?;
        let index = build_index(config.index.as_ref())?;

        if index.is_enabled() {
            tracing::info!("Search indexing enabled");
        } else {
            tracing::info!("No [index] section configured, search indexing disabled");
        }

        Self::new(config, Arc::new(store), index)
    }

    /// Starts every pipeline stage on the current runtime
    ///
    /// Seeds are pushed into the frontier once, on their own task, so a seed
    /// list larger than the frontier simply waits for the fetcher.
    pub fn spawn(self) -> CrawlHandle {
        let Crawler {
            config,
            store,
            index,
            client,
            stats,
        } = self;
        let settings = &config.crawler;

        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        let frontier = Arc::new(Frontier::new(settings.frontier_capacity));

        let buffer = settings.frontier_capacity.max(1);
        let (fetched_tx, fetched_rx) = mpsc::channel::<FetchResult>(buffer);
        let (extracted_tx, extracted_rx) = mpsc::channel::<PageExtract>(buffer);

        tracing::info!(
            "Starting crawl: {} seeds, {} keywords, frontier capacity {}, {} concurrent fetches",
            config.seeds.len(),
            config.keywords.len(),
            frontier.capacity(),
            settings.max_concurrent_fetches
        );

        let fetcher = Arc::new(Fetcher::new(client, settings, Arc::clone(&stats)));
        tracker.spawn(fetcher.run(
            Arc::clone(&frontier),
            cancel.clone(),
            tracker.clone(),
            fetched_tx,
        ));

        let extract_stage = ExtractStage {
            extractor: Extractor::new(&config.keywords),
            store: Arc::clone(&store),
            index,
            stats: Arc::clone(&stats),
            valuable_threshold: settings.valuable_threshold,
            tracker: tracker.clone(),
        };
        tracker.spawn(extract_stage.run(cancel.clone(), fetched_rx, extracted_tx));

        let filter = Arc::new(RevisitFilter::new(
            settings.freshness_window(),
            store,
            Arc::clone(&stats),
        ));
        tracker.spawn(filter.run(Arc::clone(&frontier), cancel.clone(), extracted_rx));

        tracker.spawn(seed_frontier(
            Arc::clone(&frontier),
            cancel.clone(),
            config.seeds.clone(),
        ));

        tracker.spawn(report_progress(
            settings.clone(),
            Arc::clone(&frontier),
            Arc::clone(&stats),
            cancel.clone(),
        ));

        if let Some(limit) = settings.max_duration() {
            let cancel = cancel.clone();
            tracker.spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        tracing::info!("Crawl duration limit of {:?} reached, stopping", limit);
                        cancel.cancel();
                    }
                }
            });
        }

        CrawlHandle {
            cancel,
            tracker,
            frontier,
            stats,
        }
    }
}

/// Handle to a running crawl
pub struct CrawlHandle {
    cancel: CancellationToken,
    tracker: TaskTracker,
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
}

impl CrawlHandle {
    /// Resolves once the crawl has been asked to stop, by any party
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn stats(&self) -> CrawlStatsSnapshot {
        self.stats.snapshot()
    }

    /// URLs currently waiting in the frontier
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Cancels the crawl and waits for stages and in-flight side effects to drain
    pub async fn shutdown(self) -> CrawlStatsSnapshot {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let snapshot = self.stats.snapshot();
        tracing::info!(
            "Crawl stopped after {:?}: {} fetched, {} errors, {} URLs left in frontier",
            snapshot.elapsed,
            snapshot.fetched,
            snapshot.total_errors(),
            self.frontier_len()
        );
        snapshot
    }
}

/// The extract stage plus the storage/index fan-out it triggers
struct ExtractStage {
    extractor: Extractor,
    store: Arc<dyn PageStore>,
    index: Arc<dyn SearchIndex>,
    stats: Arc<CrawlStats>,
    valuable_threshold: usize,
    tracker: TaskTracker,
}

impl ExtractStage {
    async fn run(
        self,
        cancel: CancellationToken,
        mut input: mpsc::Receiver<FetchResult>,
        out: mpsc::Sender<PageExtract>,
    ) {
        loop {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                fetched = input.recv() => match fetched {
                    Some(fetched) => fetched,
                    None => break,
                },
            };

            let extract = match self.extractor.extract(&fetched) {
                Ok(extract) => extract,
                Err(e) => {
                    self.stats.record_extract_failure();
                    tracing::warn!(url = %fetched.url, error = %e, "Failed to extract page");
                    continue;
                }
            };

            self.stats.record_extracted();
            let score = extract.keywords.score();
            if score > self.valuable_threshold {
                self.stats.record_valuable();
                tracing::info!(
                    url = %extract.url,
                    score,
                    keywords = ?extract.keywords.found_keywords(),
                    "Valuable page found"
                );
            }

            self.fan_out(&extract);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = out.send(extract) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Extract stage stopped");
    }

    /// Persists and indexes a page off the critical path
    fn fan_out(&self, extract: &PageExtract) {
        let page = Arc::new(Page::from_extract(extract, Utc::now()));

        let store = Arc::clone(&self.store);
        let stats = Arc::clone(&self.stats);
        let persisted = Arc::clone(&page);
        self.tracker.spawn(async move {
            let url = persisted.url.clone();
            match tokio::task::spawn_blocking(move || store.upsert(&persisted)).await {
                Ok(Ok(outcome)) => {
                    stats.record_stored();
                    tracing::debug!("Stored {} ({:?})", url, outcome);
                }
                Ok(Err(e)) => {
                    stats.record_store_failure();
                    tracing::warn!(url = %url, error = %e, "Failed to persist page");
                }
                Err(e) => {
                    stats.record_store_failure();
                    tracing::warn!(url = %url, error = %e, "Persist task aborted");
                }
            }
        });

        if !self.index.is_enabled() {
            return;
        }

        let index = Arc::clone(&self.index);
        let stats = Arc::clone(&self.stats);
        self.tracker.spawn(async move {
            match index.upsert(&page.identity, &page).await {
                Ok(()) => stats.record_indexed(),
                Err(e) => {
                    stats.record_index_failure();
                    tracing::warn!(url = %page.url, error = %e, "Failed to index page");
                }
            }
        });
    }
}

async fn seed_frontier(frontier: Arc<Frontier>, cancel: CancellationToken, seeds: Vec<String>) {
    let total = seeds.len();
    let pushed = frontier.push(&cancel, total, stream::iter(seeds)).await;
    tracing::info!("Seeded frontier with {}/{} URLs", pushed, total);
}

async fn report_progress(
    settings: CrawlerConfig,
    frontier: Arc<Frontier>,
    stats: Arc<CrawlStats>,
    cancel: CancellationToken,
) {
    let period = settings.report_interval();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let snapshot = stats.snapshot();
        let rate = snapshot.fetched as f64 / snapshot.elapsed.as_secs_f64().max(1.0);
        tracing::info!(
            "Progress: {} fetched, {} errors, {} in frontier, {} valuable, {:.2} pages/sec",
            snapshot.fetched,
            snapshot.total_errors(),
            frontier.len(),
            snapshot.valuable,
            rate
        );
    }
}
