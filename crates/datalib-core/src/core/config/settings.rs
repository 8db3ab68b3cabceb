use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::warn;

pub const ENV_STORE_PATH: &str = "DATALIB_STORE_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "DATALIB_BUSY_TIMEOUT_MS";
pub const ENV_PUT_CONFLICT: &str = "DATALIB_PUT_CONFLICT";
pub const ENV_ORPHAN_GRACE_SECS: &str = "DATALIB_ORPHAN_GRACE_SECS";
pub const ENV_TIMINGS: &str = "DATALIB_TIMINGS";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_ORPHAN_GRACE: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// What `put` does when a name is already bound to different content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Keep the original binding and report the ignored content (first write wins).
    #[default]
    KeepExisting,
    /// Fail the call with `PutConflict`.
    Reject,
}

impl ConflictPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeepExisting => "keep",
            Self::Reject => "reject",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keep" | "first-write-wins" => Some(Self::KeepExisting),
            "reject" | "error" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Settings for opening a [`DataLibrary`](crate::DataLibrary).
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub(crate) root: PathBuf,
    pub(crate) busy_timeout: Duration,
    pub(crate) conflict_policy: ConflictPolicy,
    pub(crate) orphan_grace: Duration,
}

impl LibraryConfig {
    /// Builds a configuration snapshot from the current process environment.
    ///
    /// # Errors
    /// Returns an error if no store path is configured and `HOME` cannot be resolved.
    pub fn from_env() -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot) -> Result<Self> {
        let root = match snapshot.var(ENV_STORE_PATH) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_root()?,
        };
        let busy_timeout = snapshot
            .var(ENV_BUSY_TIMEOUT_MS)
            .and_then(|raw| parse_or_warn::<u64>(ENV_BUSY_TIMEOUT_MS, raw))
            .map_or(DEFAULT_BUSY_TIMEOUT, Duration::from_millis);
        let orphan_grace = snapshot
            .var(ENV_ORPHAN_GRACE_SECS)
            .and_then(|raw| parse_or_warn::<u64>(ENV_ORPHAN_GRACE_SECS, raw))
            .map_or(DEFAULT_ORPHAN_GRACE, Duration::from_secs);
        let conflict_policy = match snapshot.var(ENV_PUT_CONFLICT) {
            Some(raw) => ConflictPolicy::parse(raw).unwrap_or_else(|| {
                warn!(
                    key = ENV_PUT_CONFLICT,
                    value = raw,
                    "unrecognized conflict policy; keeping first write"
                );
                ConflictPolicy::default()
            }),
            None => ConflictPolicy::default(),
        };
        Ok(Self {
            root,
            busy_timeout,
            conflict_policy,
            orphan_grace,
        })
    }

    /// Defaults rooted at an explicit directory, ignoring the environment.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            conflict_policy: ConflictPolicy::default(),
            orphan_grace: DEFAULT_ORPHAN_GRACE,
        }
    }

    /// Keep the environment-derived settings but store under `root`.
    #[must_use]
    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    #[must_use]
    pub fn with_orphan_grace(mut self, grace: Duration) -> Self {
        self.orphan_grace = grace;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    #[must_use]
    pub fn conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }

    #[must_use]
    pub fn orphan_grace(&self) -> Duration {
        self.orphan_grace
    }
}

fn parse_or_warn<T: std::str::FromStr>(key: &str, raw: &str) -> Option<T> {
    let parsed = raw.trim().parse::<T>().ok();
    if parsed.is_none() {
        warn!(key, value = raw, "ignoring unparsable setting");
    }
    parsed
}

pub(crate) fn default_root() -> Result<PathBuf> {
    let home = dirs_next::home_dir().context("failed to resolve HOME for the data library")?;
    Ok(home.join(".datalib").join("store"))
}
