//! SQLite connection + transaction helpers.

use super::super::*;
use super::Index;

impl Index {
    pub(in crate::core::store::library) fn connection(&self) -> Result<Connection> {
        if !self.path.exists() {
            return Err(LibraryError::IndexCorrupt(format!(
                "{} missing",
                self.path.display()
            ))
            .into());
        }
        self.connection_raw()
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction, committing on `Ok`.
    ///
    /// The write lock is taken up front, so reads inside `f` observe the same
    /// state the writes apply to. An `Err` from `f` rolls back.
    pub fn with_immediate_tx<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connection()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to start library index transaction")?;
        let result = f(&tx)?;
        tx.commit().context("failed to commit library index transaction")?;
        Ok(result)
    }

    pub(super) fn connection_raw(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path).with_context(|| {
            format!("failed to open library index at {}", self.path.display())
        })?;
        conn.busy_timeout(self.busy_timeout)
            .context("failed to set busy timeout for library index")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("failed to enable WAL for library index")?;
        Ok(conn)
    }
}
