//! Lookup table operations.
//!
//! Each operation comes in two shapes: a standalone method that opens its own
//! connection, and a `_with_conn` variant that runs against a caller-supplied
//! connection or transaction so several statements can share one snapshot.

use super::super::*;
use super::Index;

type RawEntry = (String, String, i64, i64, Option<i64>);

const ENTRY_COLUMNS: &str = "name, hash, size, created_at, accessed_at";

fn raw_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn hydrate((name, hash, size, created_at, accessed_at): RawEntry) -> Result<IndexEntry> {
    let size = u64::try_from(size)
        .map_err(|_| LibraryError::IndexCorrupt(format!("negative size recorded for '{name}'")))?;
    Ok(IndexEntry {
        created_at: datetime_from_millis(created_at)?,
        accessed_at: accessed_at.map(datetime_from_millis).transpose()?,
        name,
        hash,
        size,
    })
}

impl Index {
    /// Insert `{name, hash, size}` unless `name` is already bound.
    /// Returns whether a row was inserted.
    pub fn upsert_if_absent(&self, name: &str, hash: &str, size: u64) -> Result<bool> {
        self.with_immediate_tx(|tx| self.upsert_if_absent_with_conn(tx, name, hash, size))
    }

    pub fn upsert_if_absent_with_conn(
        &self,
        conn: &Connection,
        name: &str,
        hash: &str,
        size: u64,
    ) -> Result<bool> {
        let size = i64::try_from(size).context("blob size exceeds index range")?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO lookup(name, hash, size, created_at, accessed_at) \
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![name, hash, size, timestamp_millis()],
        )?;
        Ok(inserted > 0)
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<Option<IndexEntry>> {
        let conn = self.connection()?;
        self.lookup_with_conn(&conn, name)
    }

    pub fn lookup_with_conn(&self, conn: &Connection, name: &str) -> Result<Option<IndexEntry>> {
        let raw = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM lookup WHERE name = ?1"),
                params![name],
                raw_entry,
            )
            .optional()?;
        raw.map(hydrate).transpose()
    }

    /// Record an access for `name`. The stored value never moves backwards.
    /// Returns whether a row was updated.
    pub fn touch_access(&self, name: &str) -> Result<bool> {
        self.with_immediate_tx(|tx| {
            let updated = tx.execute(
                "UPDATE lookup SET accessed_at = MAX(COALESCE(accessed_at, 0), ?1) WHERE name = ?2",
                params![timestamp_millis(), name],
            )?;
            Ok(updated > 0)
        })
    }

    /// Remove the row for `name`, returning the hash it referenced.
    pub fn delete_by_name(&self, name: &str) -> Result<Option<String>> {
        self.with_immediate_tx(|tx| self.delete_by_name_with_conn(tx, name))
    }

    pub fn delete_by_name_with_conn(&self, conn: &Connection, name: &str) -> Result<Option<String>> {
        let hash = conn
            .query_row(
                "DELETE FROM lookup WHERE name = ?1 RETURNING hash",
                params![name],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(hash)
    }

    /// Remove every row referencing `hash`, returning the removed names.
    pub(in crate::core::store::library) fn delete_by_hash_with_conn(
        &self,
        conn: &Connection,
        hash: &str,
    ) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("DELETE FROM lookup WHERE hash = ?1 RETURNING name")?;
        let mut names = stmt
            .query_map(params![hash], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        names.sort();
        Ok(names)
    }

    /// Number of names currently referencing `hash`.
    pub fn count_by_hash(&self, hash: &str) -> Result<u64> {
        let conn = self.connection()?;
        self.count_by_hash_with_conn(&conn, hash)
    }

    pub fn count_by_hash_with_conn(&self, conn: &Connection, hash: &str) -> Result<u64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM lookup WHERE hash = ?1",
            params![hash],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Names referencing `hash` in insertion order, or `None` when there are none.
    pub fn list_names_by_hash(&self, hash: &str) -> Result<Option<Vec<String>>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT name FROM lookup WHERE hash = ?1 ORDER BY id ASC")?;
        let names = stmt
            .query_map(params![hash], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(if names.is_empty() { None } else { Some(names) })
    }

    /// Rows ordered by name, optionally restricted to names starting with `prefix`.
    pub fn entries(&self, prefix: Option<&str>) -> Result<Vec<IndexEntry>> {
        let conn = self.connection()?;
        let raw = match prefix {
            Some(prefix) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM lookup \
                     WHERE substr(name, 1, length(?1)) = ?1 ORDER BY name ASC"
                ))?;
                let rows = stmt
                    .query_map(params![prefix], raw_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("SELECT {ENTRY_COLUMNS} FROM lookup ORDER BY name ASC"))?;
                let rows = stmt
                    .query_map([], raw_entry)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                rows
            }
        };
        raw.into_iter().map(hydrate).collect()
    }

    /// Every hash referenced by at least one row.
    pub fn distinct_hashes(&self) -> Result<HashSet<String>> {
        let conn = self.connection()?;
        self.distinct_hashes_with_conn(&conn)
    }

    pub(in crate::core::store::library) fn distinct_hashes_with_conn(
        &self,
        conn: &Connection,
    ) -> Result<HashSet<String>> {
        let mut stmt = conn.prepare("SELECT DISTINCT hash FROM lookup")?;
        let hashes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(hashes)
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        let conn = self.connection()?;
        let (names, blobs, logical): (i64, i64, i64) = conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT hash), COALESCE(SUM(size), 0) FROM lookup",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let physical: i64 = conn.query_row(
            "SELECT COALESCE(SUM(size), 0) FROM \
             (SELECT MAX(size) AS size FROM lookup GROUP BY hash)",
            [],
            |row| row.get(0),
        )?;
        Ok(LibraryStats {
            names: u64::try_from(names).unwrap_or(0),
            blobs: u64::try_from(blobs).unwrap_or(0),
            logical_bytes: u64::try_from(logical).unwrap_or(0),
            physical_bytes: u64::try_from(physical).unwrap_or(0),
        })
    }
}
