//! Configuration assembled from the process environment.

pub mod settings;

pub use settings::*;

/// Interpret common "enabled" spellings (`1`, `true`, `yes`, `on`).
pub(crate) fn truthy(raw: &str) -> bool {
    let value = raw.trim();
    !value.is_empty()
        && !matches!(
            value.to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        )
}
