/// Durable per-base-path inventory persistence
pub mod inventory;

pub use inventory::{InventoryStore, StoredInventoryInfo};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// One inventoried file.
///
/// Contains everything needed to decide whether a file drifted: its content fixity, size,
/// and the modification time reported by the filesystem when it was last recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the base path, `/`-separated
    pub relative_path: String,
    /// File size in bytes
    pub size_bytes: u64,
    /// Last-modified time reported by the filesystem
    pub mtime: DateTime<Utc>,
    /// SHA-256 of the full file content, lowercase hex
    pub fixity: String,
}

/// The complete state of a base path at one point in time.
///
/// Keyed by relative path. Iteration is always in ascending path order so anything derived
/// from a snapshot (diffs, digests, reports) is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    /// Records by relative path
    records: BTreeMap<String, FileRecord>,
}

impl Snapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, replacing any record previously stored at the same path.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.records.insert(record.relative_path.clone(), record)
    }

    pub fn remove(&mut self, relative_path: &str) -> Option<FileRecord> {
        self.records.remove(relative_path)
    }

    #[must_use]
    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.records.get(relative_path)
    }

    #[must_use]
    pub fn contains(&self, relative_path: &str) -> bool {
        self.records.contains_key(relative_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in ascending path order.
    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.values()
    }

    /// Relative paths in ascending order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Total size of all recorded files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.records.values().map(|r| r.size_bytes).sum()
    }

    /// Returns the subset of records under `scope` (a relative directory prefix).
    ///
    /// An empty scope selects everything.
    #[must_use]
    pub fn within_scope(&self, scope: &str) -> Self {
        if scope.is_empty() {
            return self.clone();
        }
        let records = self
            .records
            .iter()
            .filter(|(path, _)| path_in_scope(path, scope))
            .map(|(path, record)| (path.clone(), record.clone()))
            .collect();
        Self { records }
    }

    /// Returns a copy without the given paths.
    #[must_use]
    pub fn without<'a>(&self, paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut copy = self.clone();
        for path in paths {
            copy.records.remove(path);
        }
        copy
    }

    /// Content digest identifying this exact snapshot.
    ///
    /// SHA-256 over the sorted `(path, size, mtime, fixity)` tuples. Two snapshots have the
    /// same digest iff they hold the same records.
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for record in self.records.values() {
            hasher.update(record.relative_path.as_bytes());
            hasher.update([0u8]);
            hasher.update(record.size_bytes.to_le_bytes());
            hasher.update(record.mtime.timestamp().to_le_bytes());
            hasher.update(record.mtime.timestamp_subsec_nanos().to_le_bytes());
            hasher.update(record.fixity.as_bytes());
            hasher.update([b'\n']);
        }
        hex::encode(hasher.finalize())
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

/// Whether `path` lies at or under the relative directory `scope`.
#[must_use]
pub fn path_in_scope(path: &str, scope: &str) -> bool {
    scope.is_empty()
        || path == scope
        || (path.starts_with(scope) && path.as_bytes().get(scope.len()) == Some(&b'/'))
}
