//! Diagnostics codes and timing instrumentation shared by the library.

pub(crate) mod diagnostics;
pub(crate) mod timings;
