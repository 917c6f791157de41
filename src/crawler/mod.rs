//! Crawler module for the self-feeding crawl pipeline
//!
//! This module contains the core crawling logic, including:
//! - The bounded frontier queue
//! - HTTP fetching with bounded concurrency and retry logic
//! - HTML parsing, link extraction and keyword scoring
//! - The revisit filter that closes the loop back into the frontier
//! - Overall pipeline coordination

mod coordinator;
mod fetcher;
mod filter;
mod frontier;
mod parser;
mod stats;

pub use coordinator::{CrawlHandle, Crawler};
pub use fetcher::{build_http_client, FetchError, FetchResult, Fetcher};
pub use filter::{Admission, FilterError, RevisitFilter};
pub use frontier::Frontier;
pub use parser::{ExtractError, Extractor, PageExtract};
pub use stats::{CrawlStats, CrawlStatsSnapshot};

use crate::config::Config;
use crate::CrawlError;
use std::future::Future;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the page store and search index named in the configuration
/// 2. Spawn the pipeline stages and seed the frontier
/// 3. Run until `stop` resolves or the configured duration limit is reached
/// 4. Drain in-flight work and return the final counters
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `stop` - Resolves when the caller wants the crawl to end (for example on Ctrl-C)
///
/// # Returns
///
/// * `Ok(CrawlStatsSnapshot)` - Crawl ran and shut down cleanly
/// * `Err(CrawlError)` - Storage, index or HTTP client setup failed
pub async fn run_crawl<F>(config: Config, stop: F) -> Result<CrawlStatsSnapshot, CrawlError>
where
    F: Future<Output = ()>,
{
    let handle = Crawler::from_config(config)?.spawn();

    tokio::select! {
        _ = stop => tracing::info!("Stop requested, shutting down"),
        _ = handle.cancelled() => {}
    }

    Ok(handle.shutdown().await)
}
