//! Library operations: `put`, `get`, `delete`, `info`, `references`.

use super::hash::validate_hash;
use super::*;

const MAX_READ_ATTEMPTS: usize = 3;

/// Content handed to [`DataLibrary::put`].
///
/// A `File` path that is missing or is not a regular file (a directory, for
/// instance) is reported as [`LibraryError::SourceNotFound`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PutSource<'a> {
    Bytes(Cow<'a, [u8]>),
    File(Cow<'a, Path>),
}

impl<'a> From<&'a [u8]> for PutSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(Cow::Borrowed(bytes))
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for PutSource<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(Cow::Borrowed(bytes.as_slice()))
    }
}

impl From<Vec<u8>> for PutSource<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Cow::Owned(bytes))
    }
}

impl<'a> From<&'a Path> for PutSource<'a> {
    fn from(path: &'a Path) -> Self {
        Self::File(Cow::Borrowed(path))
    }
}

impl<'a> From<&'a PathBuf> for PutSource<'a> {
    fn from(path: &'a PathBuf) -> Self {
        Self::File(Cow::Borrowed(path.as_path()))
    }
}

impl From<PathBuf> for PutSource<'_> {
    fn from(path: PathBuf) -> Self {
        Self::File(Cow::Owned(path))
    }
}

impl PutSource<'_> {
    /// Load the full payload. Nothing is hashed or written until this succeeds.
    fn load(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            Self::Bytes(bytes) => Ok(Cow::Borrowed(&**bytes)),
            Self::File(path) => match fs::read(path) {
                Ok(bytes) => Ok(Cow::Owned(bytes)),
                Err(err) if err.kind() == ErrorKind::NotFound || path.is_dir() => {
                    Err(LibraryError::SourceNotFound {
                        path: path.to_path_buf(),
                    }
                    .into())
                }
                Err(err) => Err(anyhow::Error::new(err)
                    .context(format!("failed to read source {}", path.display()))),
            },
        }
    }
}

/// Deduplicating name → content library.
///
/// Composes a [`ContentStore`] and an [`Index`]; callers only ever talk to
/// this type. Cheap to clone and safe to share across threads: every
/// operation acquires its own index connection.
#[derive(Clone)]
pub struct DataLibrary {
    content: ContentStore,
    index: Index,
    hasher: Arc<dyn ContentHasher>,
    conflict_policy: ConflictPolicy,
}

impl std::fmt::Debug for DataLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLibrary")
            .field("root", &self.content.root())
            .field("index", &self.index)
            .field("hash_algorithm", &self.hasher.algorithm())
            .field("conflict_policy", &self.conflict_policy)
            .finish()
    }
}

impl DataLibrary {
    /// Open (creating if needed) a library with SHA-256 content hashing.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or the index fails
    /// validation.
    pub fn open(config: &LibraryConfig) -> Result<Self> {
        Self::open_with_hasher(config, Arc::new(Sha256Hasher))
    }

    /// Open a library rooted at `root` with default settings.
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(&LibraryConfig::with_root(root))
    }

    pub fn open_with_hasher(config: &LibraryConfig, hasher: Arc<dyn ContentHasher>) -> Result<Self> {
        let _timing = TimingGuard::new("library_open");
        let content = ContentStore::open(config.root())?;
        let index = Index::open(
            config.root().join(INDEX_FILENAME),
            config.busy_timeout(),
            hasher.algorithm(),
        )?;
        Self::from_parts(content, index, hasher, config.conflict_policy())
    }

    /// Assemble a library from an already-opened store and index.
    ///
    /// # Errors
    ///
    /// Fails with [`LibraryError::IncompatibleFormat`] if the index was opened
    /// for a different hash algorithm than `hasher`.
    pub fn from_parts(
        content: ContentStore,
        index: Index,
        hasher: Arc<dyn ContentHasher>,
        conflict_policy: ConflictPolicy,
    ) -> Result<Self> {
        if index.hash_algorithm() != hasher.algorithm() {
            return Err(LibraryError::IncompatibleFormat {
                key: META_KEY_HASH_ALGORITHM.to_string(),
                expected: hasher.algorithm().to_string(),
                found: index.hash_algorithm().to_string(),
            }
            .into());
        }
        Ok(Self {
            content,
            index,
            hasher,
            conflict_policy,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        self.content.root()
    }

    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    #[must_use]
    pub fn index(&self) -> &Index {
        &self.index
    }

    /// Hash the library would store `bytes` under.
    #[must_use]
    pub fn hash_of(&self, bytes: &[u8]) -> String {
        self.hasher.digest(bytes)
    }

    /// Store `source` under `name`.
    ///
    /// The full payload is read and hashed before anything is written. The
    /// blob write and the index insert happen under the index write lock, so
    /// a concurrent `delete` cannot reclaim the blob in between. A name that
    /// is already bound keeps its original content (first write wins) unless
    /// the library was opened with [`ConflictPolicy::Reject`].
    ///
    /// # Errors
    ///
    /// [`LibraryError::SourceNotFound`] if a file source does not exist,
    /// [`LibraryError::PutConflict`] under the reject policy, and storage
    /// errors from the filesystem or index.
    pub fn put<'a>(&self, name: &str, source: impl Into<PutSource<'a>>) -> Result<PutOutcome> {
        let _timing = TimingGuard::new("library_put");
        let source = source.into();
        let bytes = source.load()?;
        let hash = self.hasher.digest(&bytes);
        validate_hash(&hash)?;
        let size = bytes.len() as u64;

        let outcome = self.index.with_immediate_tx(|tx| {
            match self.index.lookup_with_conn(tx, name)? {
                Some(existing) if existing.hash == hash => {
                    if self.content.write(&hash, &bytes).map_err(store_write_error)? {
                        warn!(%name, %hash, "restored missing blob for existing name");
                    }
                    Ok(PutOutcome::Unchanged { hash: hash.clone() })
                }
                Some(existing) => match self.conflict_policy {
                    ConflictPolicy::KeepExisting => Ok(PutOutcome::KeptExisting {
                        existing: existing.hash,
                        offered: hash.clone(),
                    }),
                    ConflictPolicy::Reject => Err(LibraryError::PutConflict {
                        name: name.to_string(),
                        existing: existing.hash,
                        offered: hash.clone(),
                    }
                    .into()),
                },
                None => {
                    let deduplicated = self.index.count_by_hash_with_conn(tx, &hash)? > 0;
                    self.content
                        .write(&hash, &bytes)
                        .map_err(store_write_error)?;
                    self.index
                        .upsert_if_absent_with_conn(tx, name, &hash, size)?;
                    Ok(PutOutcome::Inserted {
                        hash: hash.clone(),
                        size,
                        deduplicated,
                    })
                }
            }
        })?;

        match &outcome {
            PutOutcome::Inserted { deduplicated, .. } => {
                debug!(%name, %hash, size, deduplicated, "library put");
            }
            PutOutcome::Unchanged { .. } => debug!(%name, %hash, "library put unchanged"),
            PutOutcome::KeptExisting { existing, .. } => {
                debug!(%name, %existing, offered = %hash, "library put ignored; name already bound");
            }
        }
        Ok(outcome)
    }

    /// Bytes stored under `name`, or `None` if the name is unknown.
    ///
    /// # Errors
    ///
    /// [`LibraryError::MissingBlob`] if the name is indexed but its blob is
    /// gone, [`LibraryError::DigestMismatch`] if the blob no longer hashes to
    /// its address.
    pub fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let _timing = TimingGuard::new("library_get");
        let mut missing = None;
        for _ in 0..MAX_READ_ATTEMPTS {
            let Some(entry) = self.index.lookup_by_name(name)? else {
                return Ok(None);
            };
            if missing.as_deref() == Some(entry.hash.as_str()) {
                break;
            }
            if let Some(bytes) = self.content.read(&entry.hash)? {
                self.verify_digest(&entry.hash, &bytes)?;
                self.index.touch_access(name)?;
                self.content.touch(&entry.hash);
                debug!(%name, hash = %entry.hash, "library hit");
                return Ok(Some(bytes));
            }
            // The row may have been deleted (or rebound) concurrently; look again
            // before declaring the index corrupt.
            missing = Some(entry.hash);
        }
        let hash = missing.unwrap_or_default();
        warn!(%name, %hash, "indexed name has no backing blob");
        Err(LibraryError::MissingBlob {
            name: name.to_string(),
            hash,
        }
        .into())
    }

    /// Remove `name`, erasing its blob when no other name references it.
    ///
    /// Row removal, the reference recount, and the blob unlink all happen
    /// inside one index write transaction. Returns `None` if `name` was unknown.
    pub fn delete(&self, name: &str) -> Result<Option<Removal>> {
        let _timing = TimingGuard::new("library_delete");
        let removal = self.index.with_immediate_tx(|tx| {
            let Some(hash) = self.index.delete_by_name_with_conn(tx, name)? else {
                return Ok(None);
            };
            let remaining = self.index.count_by_hash_with_conn(tx, &hash)?;
            let reclaimed = if remaining == 0 {
                self.content.delete(&hash)?
            } else {
                false
            };
            Ok(Some(Removal {
                hash,
                remaining,
                reclaimed,
            }))
        })?;
        if let Some(removal) = &removal {
            debug!(
                %name,
                hash = %removal.hash,
                remaining = removal.remaining,
                reclaimed = removal.reclaimed,
                "library delete"
            );
        }
        Ok(removal)
    }

    /// Index metadata for `name`.
    pub fn info(&self, name: &str) -> Result<Option<IndexEntry>> {
        self.index.lookup_by_name(name)
    }

    /// Names referencing `hash` in insertion order; `None` if unreferenced.
    pub fn references(&self, hash: &str) -> Result<Option<Vec<String>>> {
        self.index.list_names_by_hash(hash)
    }

    /// Entries ordered by name, optionally filtered by prefix.
    pub fn list(&self, prefix: Option<&str>) -> Result<Vec<IndexEntry>> {
        self.index.entries(prefix)
    }

    pub fn stats(&self) -> Result<LibraryStats> {
        self.index.stats()
    }

    /// Release the index handle held by this library.
    pub fn close(self) -> Result<()> {
        self.index.close()
    }

    pub(super) fn verify_digest(&self, hash: &str, bytes: &[u8]) -> Result<()> {
        let actual = self.hasher.digest(bytes);
        if actual == hash {
            Ok(())
        } else {
            Err(LibraryError::DigestMismatch {
                hash: hash.to_string(),
                actual,
            }
            .into())
        }
    }
}
