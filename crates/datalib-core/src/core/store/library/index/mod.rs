//! Name index.
//!
//! A SQLite table keyed by name with a secondary index on hash. The code is
//! split by responsibility (connection/schema/meta/health/entries); every
//! caller that needs several statements to agree runs them inside
//! [`Index::with_immediate_tx`], which is the serialization point shared by
//! `put` and `delete`.

use super::*;

mod connection;
mod entries;
mod health;
mod meta;
mod schema;

#[derive(Debug, Default)]
struct IndexHealth {
    validated: AtomicBool,
}

/// Handle to the index database. Cloning shares the handle; each operation
/// opens its own scoped connection and releases it when done.
#[derive(Clone)]
pub struct Index {
    path: PathBuf,
    busy_timeout: Duration,
    hash_algorithm: &'static str,
    health: Arc<IndexHealth>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("path", &self.path)
            .field("busy_timeout", &self.busy_timeout)
            .field("hash_algorithm", &self.hash_algorithm)
            .field(
                "validated",
                &self.health.validated.load(Ordering::Relaxed),
            )
            .finish()
    }
}

impl Index {
    /// Open the index at `path`, creating the schema on first use and
    /// validating format metadata and integrity.
    ///
    /// # Errors
    ///
    /// Fails with [`LibraryError::IncompatibleFormat`] when the database was
    /// created by an incompatible format or a different hash algorithm, and
    /// with [`LibraryError::IndexCorrupt`] when SQLite reports damage.
    pub fn open(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
        hash_algorithm: &'static str,
    ) -> Result<Self> {
        let index = Self {
            path: path.into(),
            busy_timeout,
            hash_algorithm,
            health: Arc::default(),
        };
        if let Some(parent) = index.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to ensure index directory {}", parent.display())
            })?;
        }
        let mut conn = index.connection_raw()?;
        index.init_schema(&conn)?;
        index.ensure_meta(&mut conn)?;
        drop(conn);
        index.ensure_index_health()?;
        debug!(path = %index.path.display(), "library index opened");
        Ok(index)
    }

    /// Checkpoint the write-ahead log and release this handle.
    pub fn close(self) -> Result<()> {
        let conn = self.connection()?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
            .context("failed to checkpoint library index")?;
        conn.close()
            .map_err(|(_, err)| err)
            .context("failed to close library index")?;
        debug!(path = %self.path.display(), "library index closed");
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn hash_algorithm(&self) -> &'static str {
        self.hash_algorithm
    }
}
