//! Utilities for input path collection and size formatting.

use crate::{Result, error::MergeError};
use std::path::PathBuf;

/// Expand multiple glob patterns into filesystem paths.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`.
///
/// Patterns are expanded in the order given; paths matched by one pattern are
/// sorted alphabetically. A pattern matching nothing contributes nothing.
///
/// Errors:
/// - Invalid patterns become [`MergeError::InvalidConfig`].
/// - Unreadable directories become [`MergeError::Io`].
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let paths = collect_paths_for_pattern(pattern)?;
        resolved_paths.extend(paths);
    }

    Ok(resolved_paths)
}

/// Expand a single glob pattern into filesystem paths.
///
/// Pattern examples:
/// - `"**/*.pdf"`
/// - `"./docs/*.pdf"`
fn collect_paths_for_pattern<P: AsRef<str>>(pattern: P) -> Result<Vec<PathBuf>> {
    let pattern = pattern.as_ref();
    let paths = glob::glob(pattern).map_err(|err| {
        MergeError::invalid_config(format!("Invalid input pattern '{pattern}': {err}"))
    })?;

    let mut resolved_paths = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            MergeError::io(path, err.into_error())
        })?;
        resolved_paths.push(path);
    }

    Ok(resolved_paths)
}

/// Whether a string contains glob metacharacters.
pub fn is_glob_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    format!("{size:.2} {}", UNITS[unit])
}
