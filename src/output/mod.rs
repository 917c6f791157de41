//! Output module for publishing crawled pages and reporting statistics
//!
//! This module handles:
//! - Upserting crawled pages into a search index
//! - Displaying page store and crawl run statistics

mod search_index;
pub mod stats;
mod traits;

pub use search_index::HttpSearchIndex;
pub use stats::{load_statistics, print_run_summary, print_statistics, StoreStatistics};
pub use traits::{DisabledIndex, IndexError, IndexResult, SearchIndex};

use crate::config::IndexConfig;
use std::sync::Arc;

/// Builds the search index for the given configuration
///
/// Without an `[index]` section every page is dropped by a [`DisabledIndex`].
pub fn build_index(config: Option<&IndexConfig>) -> IndexResult<Arc<dyn SearchIndex>> {
    match config {
        Some(index) => Ok(Arc::new(HttpSearchIndex::new(index)?)),
        None => Ok(Arc::new(DisabledIndex)),
    }
}
