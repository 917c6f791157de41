//! Statistics generation from the page store and from a finished run
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::crawler::CrawlStatsSnapshot;
use crate::storage::{PageStore, VisitRecord};
use crate::CrawlError;

/// Stored page statistics summary
#[derive(Debug, Clone)]
pub struct StoreStatistics {
    /// Total number of pages in the store
    pub total_pages: u64,

    /// Highest scoring pages, best first
    pub top_pages: Vec<VisitRecord>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `top` - How many of the highest scoring pages to include
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(CrawlError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn PageStore, top: usize) -> Result<StoreStatistics, CrawlError> {
    let total_pages = storage.count_pages()?;
    let top_pages = storage.top_pages(top)?;

    Ok(StoreStatistics {
        total_pages,
        top_pages,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Page Store Statistics ===\n");

    println!("Overview:");
    println!("  Total pages stored: {}", stats.total_pages);
    let valuable = stats.top_pages.iter().filter(|p| p.index > 0).count();
    println!("  Pages with keyword matches (of top {}): {}", stats.top_pages.len(), valuable);
    println!();

    if stats.top_pages.is_empty() {
        return;
    }

    println!("Top Pages by Keyword Index:");
    for page in &stats.top_pages {
        let title = page.title.as_deref().unwrap_or("(untitled)");
        println!("  [{}] {} - {}", page.index, page.url, title);
        if !page.keywords_found.is_empty() {
            println!("      keywords: {}", page.keywords_found.join(", "));
        }
        println!(
            "      last updated: {}",
            page.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();
}

/// Prints the counters of a finished crawl run
pub fn print_run_summary(snapshot: &CrawlStatsSnapshot) {
    println!("=== Crawl Run Summary ===\n");
    println!("  Elapsed: {}s", snapshot.elapsed.as_secs());
    println!("  Fetched: {}", snapshot.fetched);
    println!("  Fetch failures: {}", snapshot.fetch_failures);
    println!("  Extracted: {}", snapshot.extracted);
    println!("  Extract failures: {}", snapshot.extract_failures);
    println!("  Valuable pages: {}", snapshot.valuable);
    println!("  Stored: {}", snapshot.stored);
    println!("  Indexed: {}", snapshot.indexed);
    println!("  Links admitted: {}", snapshot.links_admitted);
    println!("  Links rejected: {}", snapshot.links_rejected);

    let attempts = snapshot.fetched + snapshot.fetch_failures;
    if attempts > 0 {
        let success_rate = (snapshot.fetched as f64 / attempts as f64) * 100.0;
        println!(
            "\nFetch Success Rate: {:.1}% ({} / {} requests)",
            success_rate, snapshot.fetched, attempts
        );
    }
}
