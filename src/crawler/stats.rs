//! Shared crawl counters
//!
//! Every pipeline stage holds an `Arc<CrawlStats>` and bumps its counters with
//! relaxed atomics; readers take a [`CrawlStatsSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Live counters for a crawl run
#[derive(Debug)]
pub struct CrawlStats {
    started: Instant,
    fetched: AtomicU64,
    fetch_failures: AtomicU64,
    extracted: AtomicU64,
    extract_failures: AtomicU64,
    valuable: AtomicU64,
    links_admitted: AtomicU64,
    links_rejected: AtomicU64,
    links_invalid: AtomicU64,
    filter_store_errors: AtomicU64,
    stored: AtomicU64,
    store_failures: AtomicU64,
    indexed: AtomicU64,
    index_failures: AtomicU64,
}

/// Point-in-time copy of [`CrawlStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStatsSnapshot {
    pub elapsed: Duration,
    pub fetched: u64,
    pub fetch_failures: u64,
    pub extracted: u64,
    pub extract_failures: u64,
    pub valuable: u64,
    pub links_admitted: u64,
    pub links_rejected: u64,
    pub links_invalid: u64,
    pub filter_store_errors: u64,
    pub stored: u64,
    pub store_failures: u64,
    pub indexed: u64,
    pub index_failures: u64,
}

impl CrawlStatsSnapshot {
    /// Failures across every stage
    pub fn total_errors(&self) -> u64 {
        self.fetch_failures
            + self.extract_failures
            + self.filter_store_errors
            + self.store_failures
            + self.index_failures
    }
}

macro_rules! counter {
    ($($incr:ident => $field:ident),* $(,)?) => {
        $(
            pub fn $incr(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl CrawlStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            fetched: AtomicU64::new(0),
            fetch_failures: AtomicU64::new(0),
            extracted: AtomicU64::new(0),
            extract_failures: AtomicU64::new(0),
            valuable: AtomicU64::new(0),
            links_admitted: AtomicU64::new(0),
            links_rejected: AtomicU64::new(0),
            links_invalid: AtomicU64::new(0),
            filter_store_errors: AtomicU64::new(0),
            stored: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
            indexed: AtomicU64::new(0),
            index_failures: AtomicU64::new(0),
        }
    }

    counter! {
        record_fetched => fetched,
        record_fetch_failure => fetch_failures,
        record_extracted => extracted,
        record_extract_failure => extract_failures,
        record_valuable => valuable,
        record_link_admitted => links_admitted,
        record_link_rejected => links_rejected,
        record_link_invalid => links_invalid,
        record_filter_store_error => filter_store_errors,
        record_stored => stored,
        record_store_failure => store_failures,
        record_indexed => indexed,
        record_index_failure => index_failures,
    }

    pub fn snapshot(&self) -> CrawlStatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CrawlStatsSnapshot {
            elapsed: self.started.elapsed(),
            fetched: load(&self.fetched),
            fetch_failures: load(&self.fetch_failures),
            extracted: load(&self.extracted),
            extract_failures: load(&self.extract_failures),
            valuable: load(&self.valuable),
            links_admitted: load(&self.links_admitted),
            links_rejected: load(&self.links_rejected),
            links_invalid: load(&self.links_invalid),
            filter_store_errors: load(&self.filter_store_errors),
            stored: load(&self.stored),
            store_failures: load(&self.store_failures),
            indexed: load(&self.indexed),
            index_failures: load(&self.index_failures),
        }
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_new_stats_are_zero() {
        let snapshot = CrawlStats::new().snapshot();
        assert_eq!(snapshot.fetched, 0);
        assert_eq!(snapshot.total_errors(), 0);
    }

    #[test]
    fn test_counters_across_threads() {
        let stats = Arc::new(CrawlStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        stats.record_fetched();
                        stats.record_fetch_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.fetched, 1000);
        assert_eq!(snapshot.fetch_failures, 1000);
        assert_eq!(snapshot.total_errors(), 1000);
    }
}
