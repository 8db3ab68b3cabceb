//! Index integrity checks.

use super::super::*;
use super::schema::EXPECTED_TABLES;
use super::Index;

impl Index {
    /// Validate the index once per handle. Damage is surfaced, never repaired:
    /// names cannot be reconstructed from the content store.
    pub(super) fn ensure_index_health(&self) -> Result<()> {
        if self.health.validated.load(Ordering::SeqCst) {
            return Ok(());
        }
        let conn = self.connection()?;
        self.run_integrity_check(&conn)?;
        self.assert_expected_tables(&conn)?;
        self.require_meta_presence(&conn, META_KEY_CREATED_BY)?;
        self.require_meta_presence(&conn, META_KEY_LAST_USED)?;
        self.health.validated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn run_integrity_check(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare("PRAGMA integrity_check")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let result: String = row.get(0)?;
            if !result.eq_ignore_ascii_case("ok") {
                warn!(path = %self.path.display(), %result, "library index failed integrity check");
                return Err(LibraryError::IndexCorrupt(result).into());
            }
        }
        Ok(())
    }

    fn assert_expected_tables(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('meta', 'lookup')",
        )?;
        let found = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        let missing: Vec<&str> = EXPECTED_TABLES
            .iter()
            .copied()
            .filter(|name| !found.contains(*name))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LibraryError::IndexCorrupt(format!("missing tables: {}", missing.join(", "))).into())
        }
    }
}
