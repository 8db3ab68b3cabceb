//! Format/version metadata stored alongside the index.

use super::super::*;
use super::Index;

impl Index {
    pub(super) fn ensure_meta(&self, conn: &mut Connection) -> Result<()> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to start library meta transaction")?;
        for (key, value) in [
            (META_KEY_FORMAT_VERSION, FORMAT_VERSION.to_string()),
            (META_KEY_SCHEMA_VERSION, SCHEMA_VERSION.to_string()),
            (META_KEY_HASH_ALGORITHM, self.hash_algorithm.to_string()),
            (META_KEY_CREATED_BY, DATALIB_VERSION.to_string()),
        ] {
            tx.execute(
                "INSERT OR IGNORE INTO meta(key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
        }
        tx.commit()?;

        self.enforce_meta(conn, META_KEY_FORMAT_VERSION, &FORMAT_VERSION.to_string())?;
        self.enforce_meta(conn, META_KEY_SCHEMA_VERSION, &SCHEMA_VERSION.to_string())?;
        self.enforce_meta(conn, META_KEY_HASH_ALGORITHM, self.hash_algorithm)?;
        self.record_last_used_version(conn)?;
        Ok(())
    }

    pub(super) fn enforce_meta(&self, conn: &Connection, key: &str, expected: &str) -> Result<()> {
        let found = self.read_meta(conn, key)?;
        match found {
            Some(found) if found == expected => Ok(()),
            Some(found) => Err(LibraryError::IncompatibleFormat {
                key: key.to_string(),
                expected: expected.to_string(),
                found,
            }
            .into()),
            None => Err(LibraryError::MissingMeta(key.to_string()).into()),
        }
    }

    pub(super) fn require_meta_presence(&self, conn: &Connection, key: &str) -> Result<()> {
        if self.read_meta(conn, key)?.is_some() {
            Ok(())
        } else {
            Err(LibraryError::MissingMeta(key.to_string()).into())
        }
    }

    fn read_meta(&self, conn: &Connection, key: &str) -> Result<Option<String>> {
        Ok(conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    fn record_last_used_version(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            "INSERT INTO meta(key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![META_KEY_LAST_USED, DATALIB_VERSION],
        )?;
        Ok(())
    }
}
