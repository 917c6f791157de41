//! Storage traits and error types
//!
//! This module defines the page store interface consumed by the revisit filter
//! and the pipeline's persistence fan-out.

use crate::storage::{Page, VisitRecord};
use crate::url::IdentityHash;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid timestamp {value:?}: {message}")]
    Timestamp { value: String, message: String },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What an insert-or-update call ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Updated,
}

/// Trait for page store implementations
///
/// Implementations provide their own synchronization: the crawl pipeline calls
/// into a shared store from many tasks at once without extra locking.
pub trait PageStore: Send + Sync {
    /// Looks up the visit record for an identity hash
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - The URL was visited before
    /// * `Ok(None)` - No record exists for this identity
    fn get_by_identity(&self, identity: &IdentityHash) -> StorageResult<Option<VisitRecord>>;

    /// Inserts a new page record
    fn insert(&self, page: &Page) -> StorageResult<()>;

    /// Updates the record keyed by `page.identity`
    ///
    /// Returns false if no record with that identity exists.
    fn update(&self, page: &Page) -> StorageResult<bool>;

    /// Inserts the page, or updates it if its identity is already stored
    fn upsert(&self, page: &Page) -> StorageResult<Upserted> {
        if self.update(page)? {
            Ok(Upserted::Updated)
        } else {
            self.insert(page)?;
            Ok(Upserted::Inserted)
        }
    }

    /// Counts stored pages
    fn count_pages(&self) -> StorageResult<u64>;

    /// Returns the pages with the highest keyword index, best first
    fn top_pages(&self, limit: usize) -> StorageResult<Vec<VisitRecord>>;
}
