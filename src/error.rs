//! Error taxonomy for inventory operations.
//!
//! Per-file scan failures ([`InventoryError::Io`] and [`InventoryError::Integrity`]) are
//! normally caught by the scanner and folded into the report as anomalies. Everything else
//! aborts the operation that raised it.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Errors raised by the inventory core.
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// A file or directory could not be read.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The scan could not safely traverse the tree (symlink cycle).
    #[error("traversal aborted at {}: {detail}", path.display())]
    Traversal {
        /// Path where traversal stopped
        path: PathBuf,
        /// What went wrong
        detail: String,
    },

    /// A file changed while it was being hashed.
    #[error("file changed while hashing {}: {detail}", path.display())]
    Integrity {
        /// File that changed
        path: PathBuf,
        /// Which observation disagreed
        detail: String,
    },

    /// An annotated report was applied without being confirmed.
    #[error(
        "report has {notes} note(s) and must be confirmed before it can be applied"
    )]
    ConfirmationRequired {
        /// Number of notes attached to the report
        notes: usize,
    },

    /// The report has already been applied and is now immutable.
    #[error("report was already applied at {applied_at}")]
    AlreadyApplied {
        /// When the earlier apply happened
        applied_at: DateTime<Utc>,
    },

    /// Another process holds the exclusive write lock for the base path.
    #[error(
        "another writer holds the inventory lock for {} (lock file: {})",
        base_path.display(),
        lock_path.display()
    )]
    StoreWriteConflict {
        /// Base path whose inventory is locked
        base_path: PathBuf,
        /// Lock file that could not be acquired
        lock_path: PathBuf,
    },

    /// The inventory changed since the report was generated.
    #[error(
        "inventory changed after the report was generated (expected {expected}, found {actual})"
    )]
    StaleReport {
        /// Snapshot digest recorded in the report
        expected: String,
        /// Snapshot digest currently stored
        actual: String,
    },

    /// The inventory was updated but the report file could not be rewritten as applied.
    #[error(
        "inventory was updated (now {digest}) but report {} could not be marked applied: {source}",
        report_path.display()
    )]
    ReportNotMarkedApplied {
        /// Report file that still shows the report as pending
        report_path: PathBuf,
        /// Digest of the inventory that was committed
        digest: String,
        /// Why the report write failed
        source: Box<InventoryError>,
    },

    /// Populate refused to overwrite an existing inventory.
    #[error("inventory already exists for {}", base_path.display())]
    InventoryExists {
        /// Base path that already has an inventory
        base_path: PathBuf,
    },

    /// The path is not under any configured base path.
    #[error("{} is not contained in any configured base path", path.display())]
    NotConfigured {
        /// Path that could not be resolved
        path: PathBuf,
    },

    /// A persisted inventory could not be decoded.
    #[error("corrupt inventory file {}: {detail}", path.display())]
    Corrupt {
        /// File that failed to decode
        path: PathBuf,
        /// Decoder message
        detail: String,
    },

    /// Report (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary encoding of an inventory failed.
    #[error("encoding error: {0}")]
    Encode(String),
}

impl InventoryError {
    /// Wraps an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error describes a single file rather than the whole operation.
    #[must_use]
    pub const fn is_per_file(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Integrity { .. })
    }
}

/// Result alias used throughout the inventory core.
pub type Result<T> = core::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let io = InventoryError::io(
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(io.is_per_file());

        let conflict = InventoryError::StoreWriteConflict {
            base_path: PathBuf::from("/data"),
            lock_path: PathBuf::from("/inv/x.lock"),
        };
        assert!(!conflict.is_per_file());
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = InventoryError::Integrity {
            path: PathBuf::from("dir/file.bin"),
            detail: "size changed from 10 to 12 bytes".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("dir/file.bin"));
        assert!(message.contains("size changed"));
    }
}
