use super::{Report, Severity};
use crate::error::{InventoryError, Result};
use crate::utils::{codec, write_atomic};
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One written report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportIndexEntry {
    pub report_path: PathBuf,
    pub base_path: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    pub has_changes: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    entries: Vec<ReportIndexEntry>,
}

/// Durable list of reports, shared by every base path.
///
/// Updates are read-modify-write under an exclusive lock on a sidecar lock file, and the index
/// itself is replaced atomically.
#[derive(Debug, Clone)]
pub struct ReportIndex {
    path: PathBuf,
}

impl ReportIndex {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds or refreshes the entry for the report written at `report_path`
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be locked, read or written
    pub fn record(&self, report: &Report, report_path: &Path) -> Result<()> {
        let entry = ReportIndexEntry {
            report_path: report_path.to_path_buf(),
            base_path: report.base_path.clone(),
            generated_at: report.generated_at,
            applied_at: report.applied_at,
            has_changes: report.severity() != Severity::Clean,
        };
        self.update(|index| {
            match index
                .entries
                .iter_mut()
                .find(|existing| existing.report_path == entry.report_path)
            {
                Some(existing) => *existing = entry,
                None => index.entries.push(entry),
            }
        })
    }

    /// Lists entries newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the index exists but cannot be decoded
    pub fn list(
        &self,
        limit: Option<usize>,
        has_changes_only: bool,
    ) -> Result<Vec<ReportIndexEntry>> {
        let mut entries: Vec<ReportIndexEntry> = self
            .read()?
            .entries
            .into_iter()
            .filter(|entry| !has_changes_only || entry.has_changes)
            .collect();
        entries.sort_by(|a, b| {
            b.generated_at
                .cmp(&a.generated_at)
                .then_with(|| b.report_path.cmp(&a.report_path))
        });
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    fn update(&self, modify: impl FnOnce(&mut IndexFile)) -> Result<()> {
        let lock = self.lock()?;

        let mut index = self.read()?;
        modify(&mut index);
        let data = codec::encode(&index, None)?;
        write_atomic(&self.path, &data).map_err(|e| InventoryError::io(&self.path, e))?;
        debug!(index = %self.path.display(), entries = index.entries.len(), "report index updated");

        FileExt::unlock(&lock).map_err(|e| InventoryError::io(&self.path, e))
    }

    fn lock(&self) -> Result<File> {
        let mut lock_path = self.path.clone().into_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| InventoryError::io(parent, e))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| InventoryError::io(&lock_path, e))?;
        file.lock_exclusive()
            .map_err(|e| InventoryError::io(&lock_path, e))?;
        Ok(file)
    }

    fn read(&self) -> Result<IndexFile> {
        if !self.path.exists() {
            return Ok(IndexFile::default());
        }
        let bytes = fs::read(&self.path).map_err(|e| InventoryError::io(&self.path, e))?;
        codec::decode(&bytes, false, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeEntry;
    use crate::scanner::{AnomalyKind, ScanAnomaly};
    use crate::storage::FileRecord;
    use chrono::Duration;
    use tempfile::TempDir;

    fn report(minutes_ago: i64, changed: bool) -> Report {
        let changes = if changed {
            vec![ChangeEntry::added(&FileRecord {
                relative_path: "a".to_string(),
                size_bytes: 1,
                mtime: Utc::now(),
                fixity: "00".repeat(32),
            })]
        } else {
            Vec::new()
        };
        let mut report = Report::new("/data", "", "p", "c", changes, Vec::new());
        report.generated_at = Utc::now() - Duration::minutes(minutes_ago);
        report
    }

    #[test]
    fn test_list_newest_first_with_filters() {
        let temp = TempDir::new().unwrap();
        let index = ReportIndex::new(temp.path().join("reports.idx"));

        index.record(&report(30, true), Path::new("/r/old.json")).unwrap();
        index.record(&report(10, false), Path::new("/r/mid.json")).unwrap();
        index.record(&report(1, true), Path::new("/r/new.json")).unwrap();

        let all = index.list(None, false).unwrap();
        let names: Vec<_> = all.iter().map(|e| e.report_path.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("/r/new.json"),
                PathBuf::from("/r/mid.json"),
                PathBuf::from("/r/old.json")
            ]
        );

        let changed = index.list(Some(1), true).unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].report_path, PathBuf::from("/r/new.json"));
    }

    #[test]
    fn test_record_updates_existing_entry() {
        let temp = TempDir::new().unwrap();
        let index = ReportIndex::new(temp.path().join("reports.idx"));
        let mut r = report(0, true);
        let path = Path::new("/r/a.json");

        index.record(&r, path).unwrap();
        r.applied_at = Some(Utc::now());
        index.record(&r, path).unwrap();

        let entries = index.list(None, false).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].applied_at.is_some());
    }

    #[test]
    fn test_anomaly_only_report_counts_as_changed() {
        let temp = TempDir::new().unwrap();
        let index = ReportIndex::new(temp.path().join("reports.idx"));
        let mut anomalous = report(5, false);
        anomalous.anomalies.push(ScanAnomaly {
            path: "locked".to_string(),
            kind: AnomalyKind::Unreadable,
            detail: "permission denied".to_string(),
        });

        index.record(&anomalous, Path::new("/r/anomalous.json")).unwrap();
        index.record(&report(1, false), Path::new("/r/clean.json")).unwrap();

        let flagged = index.list(None, true).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].report_path, PathBuf::from("/r/anomalous.json"));
        assert_eq!(index.list(None, false).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_index_is_empty() {
        let temp = TempDir::new().unwrap();
        let index = ReportIndex::new(temp.path().join("none.idx"));
        assert!(index.list(None, false).unwrap().is_empty());
    }
}
