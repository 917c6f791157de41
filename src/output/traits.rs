//! Search index traits and error types
//!
//! This module defines the interface the crawl pipeline uses to publish
//! crawled pages to a search index.

use crate::storage::Page;
use crate::url::IdentityHash;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while publishing to the search index
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Index rejected document {id}: HTTP {status}: {body}")]
    Rejected {
        id: IdentityHash,
        status: u16,
        body: String,
    },

    #[error("Invalid index address: {0}")]
    Address(String),
}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// A search index the pipeline upserts crawled pages into
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Creates or replaces the document with the given ID
    async fn upsert(&self, document_id: &IdentityHash, page: &Page) -> IndexResult<()>;

    /// Whether this index actually publishes anything
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Index used when no search backend is configured; accepts and drops every page
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIndex;

#[async_trait]
impl SearchIndex for DisabledIndex {
    async fn upsert(&self, document_id: &IdentityHash, _page: &Page) -> IndexResult<()> {
        tracing::trace!("Indexing disabled, dropping document {}", document_id);
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::identity_hash;
    use chrono::Utc;

    #[tokio::test]
    async fn test_disabled_index_accepts_everything() {
        let page = Page {
            identity: identity_hash("https://example.com/"),
            url: "https://example.com/".to_string(),
            title: None,
            content: String::new(),
            index: 0,
            keywords_found: vec![],
            updated_at: Utc::now(),
        };

        let index = DisabledIndex;
        assert!(!index.is_enabled());
        assert!(index.upsert(&page.identity, &page).await.is_ok());
    }
}
