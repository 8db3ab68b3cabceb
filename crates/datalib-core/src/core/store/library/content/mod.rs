//! Sharded blob storage addressed solely by hash.

use super::hash::validate_hash;
use super::*;

mod scan;

pub use scan::BlobFile;

/// Owns the shard tree under `root`. Knows nothing about names.
#[derive(Clone, Debug)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open (creating if needed) a content store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root or its temp directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for dir in [store.root.clone(), store.tmp_dir()] {
            fs::create_dir_all(&dir).with_context(|| {
                format!("failed to ensure library directory {}", dir.display())
            })?;
        }
        Ok(store)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Leaf path for `hash`: `root/<h0>/<h1>/<h2>/<hash>.dat`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidHash`] unless `hash` is lowercase hex of
    /// at least three characters.
    pub fn path(&self, hash: &str) -> Result<PathBuf> {
        validate_hash(hash)?;
        let mut path = self.root.clone();
        for level in 0..SHARD_DEPTH {
            path.push(&hash[level..=level]);
        }
        path.push(format!("{hash}.{BLOB_EXTENSION}"));
        Ok(path)
    }

    pub fn exists(&self, hash: &str) -> Result<bool> {
        Ok(self.path(hash)?.is_file())
    }

    /// Persist `bytes` under `hash` unless a blob is already stored there.
    ///
    /// Returns `true` when a new file was written. An existing leaf is trusted
    /// to hold identical bytes and is left untouched.
    pub fn write(&self, hash: &str, bytes: &[u8]) -> Result<bool> {
        let dest = self.path(hash)?;
        if dest.is_file() {
            debug!(%hash, "blob already stored");
            return Ok(false);
        }
        let shard = dest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&shard)
            .with_context(|| format!("failed to create shard directory {}", shard.display()))?;
        let tmp_dir = self.tmp_dir();
        fs::create_dir_all(&tmp_dir)
            .with_context(|| format!("failed to create temp directory {}", tmp_dir.display()))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{hash}."))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&tmp_dir)
            .with_context(|| format!("failed to create temp blob in {}", tmp_dir.display()))?;
        tmp.write_all(bytes)
            .with_context(|| format!("failed to write temp blob {}", tmp.path().display()))?;
        tmp.as_file()
            .sync_all()
            .with_context(|| format!("failed to flush temp blob {}", tmp.path().display()))?;

        match tmp.persist_noclobber(&dest) {
            Ok(_) => {
                fsync_dir(&shard).ok();
                debug!(%hash, size = bytes.len(), "blob stored");
                Ok(true)
            }
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                debug!(%hash, "blob stored concurrently");
                Ok(false)
            }
            Err(err) => Err(anyhow::Error::new(err.error).context(format!(
                "failed to move blob into place at {}",
                dest.display()
            ))),
        }
    }

    /// Stored bytes for `hash`, or `None` if no blob exists.
    pub fn read(&self, hash: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(hash)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("failed to read blob {}", path.display()))),
        }
    }

    /// Remove the blob for `hash`. Returns whether a file was removed.
    pub fn delete(&self, hash: &str) -> Result<bool> {
        let path = self.path(hash)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                if let Some(parent) = path.parent() {
                    fsync_dir(parent).ok();
                }
                debug!(%hash, "blob removed");
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(anyhow::Error::new(err)
                .context(format!("failed to delete blob {}", path.display()))),
        }
    }

    /// Bump the blob's modification time. Best effort; never fails the caller.
    pub fn touch(&self, hash: &str) {
        let Ok(path) = self.path(hash) else {
            return;
        };
        if let Err(err) = filetime::set_file_mtime(&path, filetime::FileTime::now()) {
            debug!(%hash, %err, "failed to touch blob");
        }
    }

    pub(super) fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }
}
