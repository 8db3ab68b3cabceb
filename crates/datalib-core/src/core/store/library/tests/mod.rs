//! Library unit tests, split by topic.

use super::*;
use crate::core::tooling::diagnostics::FailureKind;
use std::env;
use std::thread;
use tempfile::{tempdir, TempDir};

fn new_library() -> Result<(TempDir, DataLibrary)> {
    new_library_with(|config| config)
}

fn new_library_with(
    configure: impl FnOnce(LibraryConfig) -> LibraryConfig,
) -> Result<(TempDir, DataLibrary)> {
    let temp = tempdir()?;
    let config = configure(LibraryConfig::with_root(temp.path().join("library")));
    let library = DataLibrary::open(&config)?;
    Ok((temp, library))
}

fn blob_path(library: &DataLibrary, hash: &str) -> Result<PathBuf> {
    library.content().path(hash)
}

fn backdate(path: &Path) -> Result<()> {
    filetime::set_file_mtime(path, filetime::FileTime::from_unix_time(0, 0))?;
    Ok(())
}

fn library_error(err: &anyhow::Error) -> &LibraryError {
    match err.downcast_ref::<LibraryError>() {
        Some(typed) => typed,
        None => panic!("expected a library error, got {err:#}"),
    }
}

struct EnvVarGuard {
    key: &'static str,
    previous: Option<std::ffi::OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &str) -> Self {
        let previous = env::var_os(key);
        env::set_var(key, value);
        Self { key, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match self.previous.as_ref() {
            Some(value) => env::set_var(self.key, value),
            None => env::remove_var(self.key),
        }
    }
}

/// Deterministic non-cryptographic hasher for exercising the pluggable seam.
#[derive(Clone, Copy, Debug, Default)]
struct Fnv64Hasher;

impl ContentHasher for Fnv64Hasher {
    fn algorithm(&self) -> &'static str {
        "fnv64"
    }

    fn digest(&self, bytes: &[u8]) -> String {
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in bytes {
            state ^= u64::from(*byte);
            state = state.wrapping_mul(0x0000_0100_0000_01b3);
        }
        format!("{state:016x}")
    }
}

mod basics;
mod config;
mod dedup;
