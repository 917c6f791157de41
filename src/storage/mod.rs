//! Storage module for persisting crawled pages
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Insert-or-update of page records keyed by URL identity
//! - Visit lookups for the revisit filter
//! - Simple queries for crawl statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PageStore, StorageError, StorageResult, Upserted};

use crate::crawler::PageExtract;
use crate::url::{identity_hash, IdentityHash};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A crawled page as persisted and indexed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    #[serde(rename = "url_hash_id")]
    pub identity: IdentityHash,
    pub url: String,
    pub title: Option<String>,
    pub content: String,
    pub index: usize,
    pub keywords_found: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Builds the page record for an extract, stamped with `updated_at`
    pub fn from_extract(extract: &PageExtract, updated_at: DateTime<Utc>) -> Self {
        Self {
            identity: identity_hash(&extract.url),
            url: extract.url.clone(),
            title: extract.title.clone(),
            content: extract.text.clone(),
            index: extract.keywords.score(),
            keywords_found: extract.keywords.found_keywords(),
            updated_at,
        }
    }
}

/// What the store knows about a previous visit
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRecord {
    pub identity: IdentityHash,
    pub url: String,
    pub title: Option<String>,
    pub index: usize,
    pub keywords_found: Vec<String>,
    pub last_updated: DateTime<Utc>,
}
