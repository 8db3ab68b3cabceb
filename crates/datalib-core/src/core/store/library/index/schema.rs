//! Index schema initialization (SQLite DDL).

use super::super::*;
use super::Index;

pub(super) const EXPECTED_TABLES: [&str; 2] = ["meta", "lookup"];

impl Index {
    pub(super) fn init_schema(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS lookup (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                hash TEXT NOT NULL,
                size INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                accessed_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS lookup_hash ON lookup(hash);
            "#,
        )
        .context("failed to initialize library index schema")?;
        Ok(())
    }
}
