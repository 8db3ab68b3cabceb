use super::super::*;
use super::ContentStore;

/// A blob found on disk while scanning the shard tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobFile {
    pub hash: String,
    pub path: PathBuf,
    pub len: u64,
}

impl ContentStore {
    /// Every well-placed blob in the shard tree, sorted by hash.
    ///
    /// Files that are not at the leaf path their name implies are skipped.
    pub fn walk(&self) -> Result<Vec<BlobFile>> {
        let mut blobs = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root)
            .min_depth(SHARD_DEPTH + 1)
            .max_depth(SHARD_DEPTH + 1)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(%err, "failed to walk library shard tree");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BLOB_EXTENSION) {
                continue;
            }
            let Some(hash) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            match self.path(hash) {
                Ok(expected) if expected == path => {}
                _ => {
                    debug!(path = %path.display(), "skipping misplaced file in shard tree");
                    continue;
                }
            }
            let len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            blobs.push(BlobFile {
                hash: hash.to_string(),
                path: path.to_path_buf(),
                len,
            });
        }
        blobs.sort_by(|a, b| a.hash.cmp(&b.hash));
        Ok(blobs)
    }

    /// Number of leftover temp files from interrupted writes.
    pub fn count_partials(&self) -> Result<u64> {
        Ok(self.partials()?.len() as u64)
    }

    /// Delete leftover temp files from interrupted writes.
    pub fn sweep_partials(&self) -> Result<u64> {
        let mut removed = 0;
        for path in self.partials()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(anyhow::Error::new(err)
                        .context(format!("failed to remove partial {}", path.display())))
                }
            }
        }
        Ok(removed)
    }

    fn partials(&self) -> Result<Vec<PathBuf>> {
        let tmp_dir = self.tmp_dir();
        if !tmp_dir.exists() {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&tmp_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file()
                && entry.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX)
            {
                found.push(entry.path());
            }
        }
        Ok(found)
    }
}
