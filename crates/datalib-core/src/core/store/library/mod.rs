//! Deduplicating file library.
//!
//! Payloads live once in a sharded content store addressed by their hash
//! (`root/<h0>/<h1>/<h2>/<hash>.dat`); a SQLite index (`root/index.db`) maps
//! unique names onto those hashes. Reference counts are never stored: a blob
//! is live exactly while some index row names its hash, and the delete path
//! recounts inside the same write transaction that removed the row.

use std::{
    borrow::Cow,
    collections::HashSet,
    fs::{self, File},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::core::config::{ConflictPolicy, LibraryConfig};
use crate::core::tooling::timings::TimingGuard;

const INDEX_FILENAME: &str = "index.db";
const TMP_DIR: &str = "tmp";
const BLOB_EXTENSION: &str = "dat";
const PARTIAL_SUFFIX: &str = ".partial";
const SHARD_DEPTH: usize = 3;
const FORMAT_VERSION: u32 = 1;
const SCHEMA_VERSION: u32 = 1;
const META_KEY_FORMAT_VERSION: &str = "format_version";
const META_KEY_SCHEMA_VERSION: &str = "schema_version";
const META_KEY_HASH_ALGORITHM: &str = "hash_algorithm";
const META_KEY_CREATED_BY: &str = "created_by_version";
const META_KEY_LAST_USED: &str = "last_used_version";
const DATALIB_VERSION: &str = env!("CARGO_PKG_VERSION");

mod content;
mod doctor;
mod gc;
mod hash;
mod index;
mod ops;

pub use content::{BlobFile, ContentStore};
pub use hash::{ContentHasher, Sha256Hasher};
pub use index::Index;
pub use ops::{DataLibrary, PutSource};

/// Errors surfaced by the library.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error("[DL801] source {} does not exist or is not a file", path.display())]
    SourceNotFound { path: PathBuf },
    #[error("[DL800] '{name}' references blob {hash}, which is missing from the store")]
    MissingBlob { name: String, hash: String },
    #[error("[DL800] blob {hash} digest mismatch (found {actual})")]
    DigestMismatch { hash: String, actual: String },
    #[error("[DL802] '{0}' is not a valid content hash")]
    InvalidHash(String),
    #[error("[DL803] '{name}' is already bound to {existing}; refusing to rebind to {offered}")]
    PutConflict {
        name: String,
        existing: String,
        offered: String,
    },
    #[error("[DL811] library index is corrupt: {0}")]
    IndexCorrupt(String),
    #[error("[DL812] library metadata is missing required key '{0}'")]
    MissingMeta(String),
    #[error("[DL812] library format incompatible for {key}: expected {expected}, found {found}")]
    IncompatibleFormat {
        key: String,
        expected: String,
        found: String,
    },
    #[error("[DL810] blob write failed: {0}")]
    StoreWriteFailure(String),
}

impl LibraryError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        use crate::core::tooling::diagnostics::library;
        match self {
            Self::MissingBlob { .. } | Self::DigestMismatch { .. } => library::MISSING_OR_CORRUPT,
            Self::SourceNotFound { .. } => library::SOURCE_NOT_FOUND,
            Self::InvalidHash(_) => library::INVALID_HASH,
            Self::PutConflict { .. } => library::PUT_CONFLICT,
            Self::StoreWriteFailure(_) => library::STORE_WRITE_FAILURE,
            Self::IndexCorrupt(_) => library::INDEX_CORRUPT,
            Self::MissingMeta(_) | Self::IncompatibleFormat { .. } => {
                library::FORMAT_INCOMPATIBLE
            }
        }
    }
}

/// One row of the name index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub hash: String,
    pub size: u64,
    pub created_at: OffsetDateTime,
    /// `None` until the first successful `get`.
    pub accessed_at: Option<OffsetDateTime>,
}

/// Result of a `put`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum PutOutcome {
    /// A new name was bound. `deduplicated` is set when another name already
    /// referenced the same content.
    Inserted {
        hash: String,
        size: u64,
        deduplicated: bool,
    },
    /// The name was already bound to identical content.
    Unchanged { hash: String },
    /// The name was already bound to different content; the original binding
    /// was kept and the offered content was not stored.
    KeptExisting { existing: String, offered: String },
}

impl PutOutcome {
    /// Hash the name resolves to after the call.
    #[must_use]
    pub fn hash(&self) -> &str {
        match self {
            Self::Inserted { hash, .. } | Self::Unchanged { hash } => hash,
            Self::KeptExisting { existing, .. } => existing,
        }
    }
}

/// Result of deleting a name that existed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub hash: String,
    /// Names still referencing `hash` after the delete.
    pub remaining: u64,
    /// Whether the blob was erased from the content store.
    pub reclaimed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub names: u64,
    pub blobs: u64,
    /// Sum of sizes across names (what callers think they stored).
    pub logical_bytes: u64,
    /// Sum of sizes across distinct hashes (what the store holds).
    pub physical_bytes: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GcSummary {
    pub scanned: usize,
    pub reclaimed: usize,
    pub reclaimed_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DanglingEntry {
    pub name: String,
    pub hash: String,
}

/// Read-only consistency report between the index and the content store.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub names_checked: usize,
    pub blobs_checked: usize,
    /// Rows whose blob is missing.
    pub dangling: Vec<DanglingEntry>,
    /// Blobs no row references.
    pub orphans: Vec<String>,
    /// Referenced blobs whose bytes no longer hash to their name.
    pub corrupt: Vec<String>,
    /// Leftover temp files from interrupted writes.
    pub partials: u64,
}

impl VerifyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
            && self.orphans.is_empty()
            && self.corrupt.is_empty()
            && self.partials == 0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DoctorSummary {
    pub partials_removed: u64,
    pub orphans_removed: usize,
    pub orphan_bytes: u64,
    pub corrupt_removed: usize,
    /// Names dropped because their content was missing or corrupt.
    pub names_pruned: Vec<String>,
}

fn store_write_error(err: anyhow::Error) -> anyhow::Error {
    if err.is::<LibraryError>() {
        err
    } else {
        LibraryError::StoreWriteFailure(format!("{err:#}")).into()
    }
}

fn fsync_dir(dir: &Path) -> Result<()> {
    let file = File::open(dir)?;
    file.sync_all()?;
    Ok(())
}

fn timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn datetime_from_millis(millis: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).map_err(|err| {
        LibraryError::IndexCorrupt(format!("timestamp {millis} out of range: {err}")).into()
    })
}

fn file_modified_secs(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .ok()?
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

fn timestamp_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
fn set_created_at(conn: &Connection, name: &str, millis: i64) -> Result<()> {
    conn.execute(
        "UPDATE lookup SET created_at=?1 WHERE name=?2",
        params![millis, name],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests;
