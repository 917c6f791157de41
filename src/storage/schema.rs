//! Database schema definitions
//!
//! This module contains the SQL schema for the page store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per crawled URL identity
CREATE TABLE IF NOT EXISTS pages (
    identity TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    title TEXT,
    content TEXT NOT NULL,
    keyword_index INTEGER NOT NULL DEFAULT 0,
    keywords_found TEXT NOT NULL DEFAULT '[]',
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_keyword_index ON pages(keyword_index);
CREATE INDEX IF NOT EXISTS idx_pages_updated_at ON pages(updated_at);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
