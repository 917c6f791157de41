//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a browser-like header set
//! - Bounded-concurrency GET requests with a per-request deadline
//! - Optional retry with exponential backoff for transient failures
//! - Error classification and counting

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::crawler::frontier::Frontier;
use crate::crawler::stats::CrawlStats;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The URL as it was requested
    pub url: String,
    /// Raw response body
    pub body: Vec<u8>,
    /// HTTP status code
    pub status: u16,
    /// Content-Length reported by the server
    pub content_length: Option<u64>,
    /// Content-Type header value
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Reasons a URL produced no [`FetchResult`]
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(reqwest::Error),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt may succeed: timeouts, connection errors and 5xx
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) => true,
            FetchError::Request(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status(status) => *status >= 500,
            FetchError::Body(_) | FetchError::TooLarge { .. } | FetchError::Cancelled => false,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use loopcrawl::config::UserAgentConfig;
/// use loopcrawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     value: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    Client::builder()
        .user_agent(config.value.as_str())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// The fetch stage of the crawl pipeline
pub struct Fetcher {
    client: Client,
    permits: Arc<Semaphore>,
    timeout: Duration,
    delay: Duration,
    max_content_bytes: usize,
    max_retries: u32,
    backoff: Duration,
    stats: Arc<CrawlStats>,
}

impl Fetcher {
    pub fn new(client: Client, config: &CrawlerConfig, stats: Arc<CrawlStats>) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
            timeout: config.request_timeout(),
            delay: config.fetch_delay(),
            max_content_bytes: config.max_content_bytes,
            max_retries: config.max_retries,
            backoff: config.retry_backoff(),
            stats,
        }
    }

    /// Number of fetches that could start right now
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Pulls URLs from the frontier until cancelled, fetching each on its own task
    ///
    /// Each task holds a concurrency permit only for the duration of the HTTP
    /// request; the result is handed to `out` after the permit is released.
    /// Spawned tasks are registered on `tracker` so shutdown can wait for them.
    ///
    /// Because a task parks on `out` without its permit, the number of fetched
    /// but undelivered bodies is bounded by extractor throughput rather than by
    /// the frontier capacity. Each parked body is at most `max-content-bytes`.
    ///
    /// Cancellation stops dispatch. A request already on the wire runs until it
    /// completes or times out, and its result is then dropped.
    pub async fn run(
        self: Arc<Self>,
        frontier: Arc<Frontier>,
        cancel: CancellationToken,
        tracker: TaskTracker,
        out: mpsc::Sender<FetchResult>,
    ) {
        let urls = frontier.pop(&cancel, usize::MAX);
        tokio::pin!(urls);

        while let Some(url) = urls.next().await {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let fetcher = Arc::clone(&self);
            let task_cancel = cancel.clone();
            let out = out.clone();
            tracker.spawn(async move {
                let started = Instant::now();
                let result = fetcher.fetch(&url, &task_cancel).await;
                drop(permit);

                match result {
                    Ok(page) => {
                        fetcher.stats.record_fetched();
                        tracing::debug!(
                            url = %page.url,
                            status = page.status,
                            bytes = page.body.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Fetched"
                        );
                        tokio::select! {
                            biased;
                            _ = task_cancel.cancelled() => {}
                            sent = out.send(page) => {
                                if sent.is_err() {
                                    tracing::debug!("Extractor gone, dropping fetch result for {}", url);
                                }
                            }
                        }
                    }
                    Err(FetchError::Cancelled) => {
                        tracing::debug!(url = %url, "Fetch cancelled");
                    }
                    Err(e) => {
                        fetcher.stats.record_fetch_failure();
                        tracing::error!(
                            url = %url,
                            method = "GET",
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            error = %e,
                            "Fetch failed"
                        );
                    }
                }
            });

            if !self.delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.delay) => {}
                }
            }
        }

        tracing::debug!("Fetch stage stopped");
    }

    /// Fetches one URL, retrying transient failures up to the configured limit
    ///
    /// Does not take a concurrency permit; [`Fetcher::run`] does that. An
    /// attempt that has started is not interrupted by `cancel`, but no retry
    /// starts once it fires.
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<FetchResult, FetchError> {
        let mut attempt = 0u32;

        loop {
            match self.fetch_once(url).await {
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    if cancel.is_cancelled() {
                        return Err(FetchError::Cancelled);
                    }
                    let backoff = self.backoff.saturating_mul(1u32 << attempt.min(16));
                    attempt += 1;
                    tracing::debug!(url = %url, attempt, "Retrying in {:?} after: {}", backoff, e);

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchResult, FetchError> {
        match tokio::time::timeout(self.timeout, self.request(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }

    async fn request(&self, url: &str) -> Result<FetchResult, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let content_length = response.content_length();
        let limit = self.max_content_bytes;
        if content_length.is_some_and(|len| len > limit as u64) {
            return Err(FetchError::TooLarge { limit });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(FetchError::Body)? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchResult {
            url: url.to_string(),
            body,
            status: status.as_u16(),
            content_length,
            content_type,
            fetched_at: Utc::now(),
        })
    }
}
