use crate::core::store::library::LibraryError;

pub mod library {
    pub const MISSING_OR_CORRUPT: &str = "DL800";
    pub const SOURCE_NOT_FOUND: &str = "DL801";
    pub const INVALID_HASH: &str = "DL802";
    pub const PUT_CONFLICT: &str = "DL803";
    pub const STORE_WRITE_FAILURE: &str = "DL810";
    pub const INDEX_CORRUPT: &str = "DL811";
    pub const FORMAT_INCOMPATIBLE: &str = "DL812";
    pub const GENERIC: &str = "DL000";
}

/// Coarse failure taxonomy callers branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// `put` was pointed at a source that does not exist.
    SourceNotFound,
    /// The index references content the store cannot produce intact.
    Corruption,
    /// A name already bound to different content under the `reject` policy.
    Conflict,
    /// The caller supplied something that can never be valid (e.g. a malformed hash).
    Usage,
    /// Filesystem or index engine failure, surfaced verbatim.
    StorageIo,
}

impl FailureKind {
    /// Classify an error returned by any library operation.
    #[must_use]
    pub fn of(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<LibraryError>() {
            Some(LibraryError::SourceNotFound { .. }) => Self::SourceNotFound,
            Some(LibraryError::MissingBlob { .. } | LibraryError::DigestMismatch { .. }) => {
                Self::Corruption
            }
            Some(LibraryError::PutConflict { .. }) => Self::Conflict,
            Some(LibraryError::InvalidHash(_)) => Self::Usage,
            Some(
                LibraryError::IndexCorrupt(_)
                | LibraryError::MissingMeta(_)
                | LibraryError::IncompatibleFormat { .. }
                | LibraryError::StoreWriteFailure(_),
            )
            | None => Self::StorageIo,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceNotFound => "source-not-found",
            Self::Corruption => "corruption",
            Self::Conflict => "conflict",
            Self::Usage => "usage",
            Self::StorageIo => "storage-io",
        }
    }
}

/// Diagnostic code for an arbitrary error, falling back to the generic code.
#[must_use]
pub fn code_for(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<LibraryError>()
        .map_or(library::GENERIC, LibraryError::code)
}
