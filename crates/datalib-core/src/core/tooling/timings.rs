//! Per-operation wall-clock timings, logged when `DATALIB_TIMINGS` is truthy.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::core::config::{truthy, EnvSnapshot, ENV_TIMINGS};

fn enabled_in(snapshot: &EnvSnapshot) -> bool {
    snapshot.var(ENV_TIMINGS).is_some_and(truthy)
}

fn timings_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| enabled_in(&EnvSnapshot::capture()))
}

/// Logs how long a library operation took when dropped.
pub(crate) struct TimingGuard {
    operation: &'static str,
    started: Instant,
}

impl TimingGuard {
    pub(crate) fn new(operation: &'static str) -> Option<Self> {
        timings_enabled().then(|| Self {
            operation,
            started: Instant::now(),
        })
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let elapsed = self.elapsed();
        tracing::info!(
            operation = self.operation,
            elapsed_us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX),
            "library timing"
        );
    }
}
