//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PageStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageStore, StorageError, StorageResult, Upserted};
use crate::storage::{Page, VisitRecord};
use crate::url::IdentityHash;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const VISIT_COLUMNS: &str = "identity, url, title, keyword_index, keywords_found, updated_at";

/// SQLite storage backend
///
/// The connection sits behind a mutex so one instance can be shared by every
/// pipeline task.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: String) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Timestamp {
            message: e.to_string(),
            value,
        })
}

/// Raw column values of a visit row, decoded outside the rusqlite closure
struct VisitRow {
    identity: String,
    url: String,
    title: Option<String>,
    index: i64,
    keywords_found: String,
    updated_at: String,
}

impl VisitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            identity: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            index: row.get(3)?,
            keywords_found: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_record(self) -> StorageResult<VisitRecord> {
        Ok(VisitRecord {
            identity: IdentityHash::from_hex(self.identity),
            url: self.url,
            title: self.title,
            index: self.index.max(0) as usize,
            keywords_found: serde_json::from_str(&self.keywords_found)?,
            last_updated: parse_timestamp(self.updated_at)?,
        })
    }
}

impl PageStore for SqliteStorage {
    fn get_by_identity(&self, identity: &IdentityHash) -> StorageResult<Option<VisitRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE identity = ?1", VISIT_COLUMNS),
                params![identity.as_str()],
                VisitRow::from_row,
            )
            .optional()?;

        row.map(VisitRow::into_record).transpose()
    }

    fn insert(&self, page: &Page) -> StorageResult<()> {
        let keywords = serde_json::to_string(&page.keywords_found)?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pages (identity, url, title, content, keyword_index, keywords_found, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                page.identity.as_str(),
                page.url,
                page.title,
                page.content,
                page.index as i64,
                keywords,
                format_timestamp(&page.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update(&self, page: &Page) -> StorageResult<bool> {
        let keywords = serde_json::to_string(&page.keywords_found)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE pages SET url = ?2, title = ?3, content = ?4, keyword_index = ?5,
             keywords_found = ?6, updated_at = ?7
             WHERE identity = ?1",
            params![
                page.identity.as_str(),
                page.url,
                page.title,
                page.content,
                page.index as i64,
                keywords,
                format_timestamp(&page.updated_at),
            ],
        )?;
        Ok(changed > 0)
    }

    fn upsert(&self, page: &Page) -> StorageResult<Upserted> {
        // Probe and write run under one lock; ON CONFLICT covers rows written by other processes
        let keywords = serde_json::to_string(&page.keywords_found)?;
        let conn = self.conn()?;
        let existed: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM pages WHERE identity = ?1)",
                params![page.identity.as_str()],
                |row| row.get(0),
            )?;
        conn.execute(
            "INSERT INTO pages (identity, url, title, content, keyword_index, keywords_found, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(identity) DO UPDATE SET
                url = excluded.url,
                title = excluded.title,
                content = excluded.content,
                keyword_index = excluded.keyword_index,
                keywords_found = excluded.keywords_found,
                updated_at = excluded.updated_at",
            params![
                page.identity.as_str(),
                page.url,
                page.title,
                page.content,
                page.index as i64,
                keywords,
                format_timestamp(&page.updated_at),
            ],
        )?;

        Ok(if existed {
            Upserted::Updated
        } else {
            Upserted::Inserted
        })
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn top_pages(&self, limit: usize) -> StorageResult<Vec<VisitRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM pages ORDER BY keyword_index DESC, updated_at DESC LIMIT ?1",
            VISIT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit as i64], VisitRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(VisitRow::into_record).collect()
    }
}
