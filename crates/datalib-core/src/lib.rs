#![deny(clippy::all)]

mod core;

pub use crate::core::config::{
    ConflictPolicy, LibraryConfig, ENV_BUSY_TIMEOUT_MS, ENV_ORPHAN_GRACE_SECS, ENV_PUT_CONFLICT,
    ENV_STORE_PATH, ENV_TIMINGS,
};
pub use crate::core::store::library::{
    BlobFile, ContentHasher, ContentStore, DanglingEntry, DataLibrary, DoctorSummary, GcSummary,
    Index, IndexEntry, LibraryError, LibraryStats, PutOutcome, PutSource, Removal, Sha256Hasher,
    VerifyReport,
};
pub use crate::core::tooling::diagnostics::{code_for, library as diag_codes, FailureKind};
