//! Utility functions and helpers.
//!
//! This module provides a collection of utility functions used throughout fixwatch:
//!
//! - Path manipulation (tilde expansion, inventory keys, scopes)
//! - Atomic file replacement
//! - Ignore pattern matching
//! - File size formatting
//! - User information retrieval
//!
//! # Submodules
//!
//! - [`codec`]: bincode + zstd encoding of persisted state
//! - [`paths`]: Path manipulation
//! - [`thread_pool`]: Thread pool configuration
//!
//! # Examples
//!
//! ```
//! use fixwatch::utils::{expand_tilde, format_size};
//!
//! # fn main() -> anyhow::Result<()> {
//! // Expand tilde in paths
//! let path = expand_tilde("~/archive")?;
//!
//! // Format file sizes
//! let size_str = format_size(1024 * 1024); // "1.00 MB"
//! # Ok(())
//! # }
//! ```

/// Binary encoding of inventories and the report index
pub mod codec;
/// Path manipulation and resolution utilities
pub mod paths;
/// Thread pool configuration for parallel operations
pub mod thread_pool;

use anyhow::Result;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Expands a path starting with `~` to the user's home directory.
///
/// # Errors
///
/// Returns an error if the path is empty.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        anyhow::bail!("Path cannot be empty");
    }
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return Ok(home.join(&path[2..]));
    }
    Ok(PathBuf::from(path))
}

/// Replaces `path` with `data` atomically.
///
/// The bytes go to a temporary file in the same directory, are flushed to disk, and the file
/// is then renamed over `path`. Readers see either the old content or the new content.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, or the write, sync or rename fails.
/// The previous file at `path` is left untouched on failure.
pub fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    // Make the rename itself durable
    #[cfg(unix)]
    if let Ok(dir_handle) = std::fs::File::open(dir) {
        let _ = dir_handle.sync_all();
    }
    Ok(())
}

/// Determines if a relative path should be ignored based on glob patterns.
///
/// A pattern matches when it matches the whole relative path or any single component, so
/// `*.tmp` and `.cache` both work without a leading `**/`. A trailing `/` restricts the pattern
/// to directory components.
#[must_use]
pub fn should_ignore(relative_path: &str, patterns: &[String]) -> bool {
    let components: Vec<&str> = relative_path.split('/').collect();

    for pattern in patterns {
        let (pattern, directories_only) = match pattern.strip_suffix('/') {
            Some(dir) => (dir, true),
            None => (pattern.as_str(), false),
        };
        let Ok(glob) = glob::Pattern::new(pattern) else {
            // Invalid patterns are reported by the config validator
            continue;
        };

        if !directories_only && glob.matches(relative_path) {
            return true;
        }

        let candidates = if directories_only {
            &components[..components.len().saturating_sub(1)]
        } else {
            &components[..]
        };
        if candidates.iter().any(|component| glob.matches(component)) {
            return true;
        }
    }

    false
}

/// Formats a file size in bytes into a human-readable string with appropriate units.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", size.round() as u64, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}

/// Retrieves the current system username, falling back to "unknown" if not found.
#[must_use]
pub fn get_current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
