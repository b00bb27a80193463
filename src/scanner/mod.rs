//! Filesystem traversal producing inventory snapshots.
//!
//! The scanner walks a base path (or a scope inside it), hashes every regular file on the
//! shared rayon pool and assembles the results into a [`Snapshot`]. Files that cannot be read
//! or that change while being hashed do not abort the scan; they are returned as
//! [`ScanAnomaly`] entries next to the snapshot.

use crate::error::{InventoryError, Result};
use crate::fixity::{self, DEFAULT_BUFFER_SIZE};
use crate::storage::{FileRecord, Snapshot, path_in_scope};
use crate::utils::paths::relative_key;
use crate::utils::should_ignore;
use crate::utils::thread_pool::{IntoParallelRefIterator, ParallelIterator, run_in_pool};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info_span, warn};
use walkdir::{DirEntry, WalkDir};

/// Why a path was left out of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// The file or directory could not be read
    Unreadable,
    /// The file changed while it was being hashed
    Mutated,
}

/// A path the scanner saw but could not record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanAnomaly {
    /// Relative path (a directory covers everything beneath it)
    pub path: String,
    pub kind: AnomalyKind,
    pub detail: String,
}

impl ScanAnomaly {
    fn from_error(path: String, error: &InventoryError) -> Self {
        let kind = match error {
            InventoryError::Integrity { .. } => AnomalyKind::Mutated,
            _ => AnomalyKind::Unreadable,
        };
        let detail = match error {
            InventoryError::Io { source, .. } => source.to_string(),
            InventoryError::Integrity { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        Self { path, kind, detail }
    }
}

/// Result of one scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub snapshot: Snapshot,
    pub anomalies: Vec<ScanAnomaly>,
}

impl ScanOutcome {
    /// Whether `path` is covered by any anomaly.
    #[must_use]
    pub fn is_anomalous(&self, path: &str) -> bool {
        self.anomalies
            .iter()
            .any(|anomaly| path_in_scope(path, &anomaly.path))
    }
}

/// Traversal and hashing settings
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub follow_symlinks: bool,
    /// Glob patterns matched against relative paths and their components
    pub ignore_patterns: Vec<String>,
    pub buffer_size: usize,
    /// Absolute directories never entered (the inventory store, report output)
    pub excluded: Vec<PathBuf>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            excluded: Vec::new(),
        }
    }
}

/// Walks one base path and produces its snapshot.
pub struct TreeScanner {
    base_path: PathBuf,
    scope: String,
    options: ScanOptions,
}

impl TreeScanner {
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            scope: String::new(),
            options: ScanOptions::default(),
        }
    }

    /// Restrict the scan to a normalized relative sub-path of the base path
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Scans the tree.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::Traversal`] on a symlink cycle and [`InventoryError::Io`] if
    /// the scan root itself cannot be read. No partial snapshot is returned in either case.
    pub fn scan(&self) -> Result<ScanOutcome> {
        let span = info_span!("scan", base = %self.base_path.display(), scope = %self.scope);
        let _guard = span.enter();

        let root = if self.scope.is_empty() {
            self.base_path.clone()
        } else {
            self.base_path.join(&self.scope)
        };
        std::fs::symlink_metadata(&root).map_err(|e| InventoryError::io(&root, e))?;

        let mut anomalies = Vec::new();
        let files = self.collect_files(&root, &mut anomalies)?;
        debug!(files = files.len(), "walk complete, hashing");

        let buffer_size = self.options.buffer_size;
        let hashed: Vec<(String, Result<fixity::FileFixity>)> = run_in_pool(|| {
            files
                .par_iter()
                .map(|(key, path)| (key.clone(), fixity::compute_with_buffer(path, buffer_size)))
                .collect()
        });

        let mut snapshot = Snapshot::new();
        for (relative_path, result) in hashed {
            match result {
                Ok(fixity) => {
                    snapshot.insert(FileRecord {
                        relative_path,
                        size_bytes: fixity.size_bytes,
                        mtime: fixity.mtime,
                        fixity: fixity.fixity,
                    });
                }
                Err(InventoryError::Io { ref source, .. })
                    if source.kind() == ErrorKind::NotFound =>
                {
                    // Removed between walking and hashing; it is simply gone
                    debug!(path = %relative_path, "file vanished during scan");
                }
                Err(e) => {
                    warn!(path = %relative_path, error = %e, "recording scan anomaly");
                    anomalies.push(ScanAnomaly::from_error(relative_path, &e));
                }
            }
        }

        anomalies.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(
            records = snapshot.len(),
            anomalies = anomalies.len(),
            "scan complete"
        );
        Ok(ScanOutcome {
            snapshot,
            anomalies,
        })
    }

    /// Walk the tree, returning `(relative key, absolute path)` for every regular file
    fn collect_files(
        &self,
        root: &Path,
        anomalies: &mut Vec<ScanAnomaly>,
    ) -> Result<Vec<(String, PathBuf)>> {
        let canonical_base = if self.options.follow_symlinks {
            Some(
                self.base_path
                    .canonicalize()
                    .map_err(|e| InventoryError::io(&self.base_path, e))?,
            )
        } else {
            None
        };

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(self.options.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| self.keep_entry(entry, canonical_base.as_deref()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                    if err.loop_ancestor().is_some() {
                        return Err(InventoryError::Traversal {
                            path,
                            detail: "symlink cycle detected".to_string(),
                        });
                    }
                    if err.depth() == 0 {
                        let source = err
                            .into_io_error()
                            .unwrap_or_else(|| std::io::Error::other("unreadable scan root"));
                        return Err(InventoryError::io(path, source));
                    }
                    let key = self.key_for(&path);
                    warn!(path = %key, error = %err, "cannot read entry");
                    anomalies.push(ScanAnomaly {
                        path: key,
                        kind: AnomalyKind::Unreadable,
                        detail: err.to_string(),
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            match relative_key(entry.path(), &self.base_path) {
                Some(key) => files.push((key, entry.into_path())),
                None => anomalies.push(ScanAnomaly {
                    path: self.key_for(entry.path()),
                    kind: AnomalyKind::Unreadable,
                    detail: "path is not valid UTF-8".to_string(),
                }),
            }
        }

        Ok(files)
    }

    fn keep_entry(&self, entry: &DirEntry, canonical_base: Option<&Path>) -> bool {
        if entry.depth() == 0 {
            return true;
        }
        let path = entry.path();
        if self.options.excluded.iter().any(|excluded| path.starts_with(excluded)) {
            return false;
        }
        if let Some(key) = relative_key(path, &self.base_path)
            && should_ignore(&key, &self.options.ignore_patterns)
        {
            return false;
        }
        if let Some(base) = canonical_base
            && entry.path_is_symlink()
        {
            // Links that leave the base path are skipped, along with anything beneath them
            return match path.canonicalize() {
                Ok(target) => target.starts_with(base),
                Err(_) => true,
            };
        }
        true
    }

    /// Best-effort relative name for diagnostics
    fn key_for(&self, path: &Path) -> String {
        path.strip_prefix(&self.base_path)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, relative: &str, content: &str) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_integrity_error_becomes_mutated_anomaly() {
        let error = InventoryError::Integrity {
            path: PathBuf::from("/data/live.db"),
            detail: "size changed from 10 to 12 bytes".to_string(),
        };
        let anomaly = ScanAnomaly::from_error("live.db".to_string(), &error);
        assert_eq!(anomaly.kind, AnomalyKind::Mutated);
        assert_eq!(anomaly.path, "live.db");
        assert_eq!(anomaly.detail, "size changed from 10 to 12 bytes");

        let denied = InventoryError::io(
            "/data/secret",
            std::io::Error::new(ErrorKind::PermissionDenied, "denied"),
        );
        let anomaly = ScanAnomaly::from_error("secret".to_string(), &denied);
        assert_eq!(anomaly.kind, AnomalyKind::Unreadable);
    }

    #[test]
    fn test_scan_records_every_regular_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "hello");
        write(temp.path(), "dir/b.txt", "world");
        write(temp.path(), "dir/deeper/c.bin", "");
        fs::create_dir_all(temp.path().join("empty_dir")).unwrap();

        let outcome = TreeScanner::new(temp.path()).scan().unwrap();
        let paths: Vec<&str> = outcome.snapshot.paths().collect();
        assert_eq!(paths, vec!["a.txt", "dir/b.txt", "dir/deeper/c.bin"]);
        assert!(outcome.anomalies.is_empty());
        assert_eq!(
            outcome.snapshot.get("a.txt").unwrap().fixity,
            fixity::hash_bytes(b"hello")
        );
    }

    #[test]
    fn test_scope_limits_scan_but_keeps_base_relative_paths() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.txt", "a");
        write(temp.path(), "docs/b.txt", "b");

        let outcome = TreeScanner::new(temp.path())
            .with_scope("docs")
            .scan()
            .unwrap();
        let paths: Vec<&str> = outcome.snapshot.paths().collect();
        assert_eq!(paths, vec!["docs/b.txt"]);
    }

    #[test]
    fn test_ignore_patterns_and_excluded_dirs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "keep.txt", "k");
        write(temp.path(), "scratch.tmp", "t");
        write(temp.path(), ".inventory/current.inv", "x");

        let options = ScanOptions {
            ignore_patterns: vec!["*.tmp".to_string()],
            excluded: vec![temp.path().join(".inventory")],
            ..ScanOptions::default()
        };
        let outcome = TreeScanner::new(temp.path())
            .with_options(options)
            .scan()
            .unwrap();
        let paths: Vec<&str> = outcome.snapshot.paths().collect();
        assert_eq!(paths, vec!["keep.txt"]);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = TreeScanner::new(temp.path().join("nope")).scan();
        assert!(matches!(result, Err(InventoryError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed_by_default() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "real.txt", "data");
        std::os::unix::fs::symlink(temp.path().join("real.txt"), temp.path().join("link.txt"))
            .unwrap();

        let outcome = TreeScanner::new(temp.path()).scan().unwrap();
        let paths: Vec<&str> = outcome.snapshot.paths().collect();
        assert_eq!(paths, vec!["real.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_aborts_when_following() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "dir/file.txt", "data");
        std::os::unix::fs::symlink(temp.path().join("dir"), temp.path().join("dir/loop"))
            .unwrap();

        let options = ScanOptions {
            follow_symlinks: true,
            ..ScanOptions::default()
        };
        let result = TreeScanner::new(temp.path()).with_options(options).scan();
        assert!(matches!(result, Err(InventoryError::Traversal { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_followed_symlinks_outside_base_are_skipped() {
        let outside = TempDir::new().unwrap();
        write(outside.path(), "secret.txt", "s");
        let temp = TempDir::new().unwrap();
        write(temp.path(), "inside.txt", "i");
        std::os::unix::fs::symlink(outside.path(), temp.path().join("escape")).unwrap();

        let options = ScanOptions {
            follow_symlinks: true,
            ..ScanOptions::default()
        };
        let outcome = TreeScanner::new(temp.path())
            .with_options(options)
            .scan()
            .unwrap();
        let paths: Vec<&str> = outcome.snapshot.paths().collect();
        assert_eq!(paths, vec!["inside.txt"]);
    }

    #[test]
    fn test_anomaly_covers_directory_contents() {
        let outcome = ScanOutcome {
            snapshot: Snapshot::new(),
            anomalies: vec![ScanAnomaly {
                path: "locked".to_string(),
                kind: AnomalyKind::Unreadable,
                detail: "permission denied".to_string(),
            }],
        };
        assert!(outcome.is_anomalous("locked/inner.txt"));
        assert!(!outcome.is_anomalous("locked2/inner.txt"));
    }
}
