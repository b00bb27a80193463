//! High-level operations on one monitored base path.
//!
//! [`InventoryManager`] wires the scanner, the diff engine, the store and the report files
//! together: populate an inventory, detect changes into a report, and apply a reviewed
//! report back into the inventory.

use crate::config::{Config, FileSystemConfig};
use crate::diff::{DiffOptions, diff};
use crate::error::{InventoryError, Result};
use crate::lock::WriteOperation;
use crate::report::{Report, ReportIndex};
use crate::scanner::{ScanAnomaly, ScanOptions, TreeScanner};
use crate::storage::{InventoryStore, StoredInventoryInfo};
use crate::workflow::{self, ApplyOutcome};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of [`InventoryManager::populate`]
#[derive(Debug, Clone)]
pub struct PopulateOutcome {
    pub stored: StoredInventoryInfo,
    /// Files that could not be recorded
    pub anomalies: Vec<ScanAnomaly>,
}

/// Operations on the inventory of one base path
#[derive(Debug, Clone)]
pub struct InventoryManager {
    base_path: PathBuf,
    store: InventoryStore,
    report_root: PathBuf,
    index: ReportIndex,
    scan_options: ScanOptions,
}

impl InventoryManager {
    #[must_use]
    pub fn new(
        base_path: impl Into<PathBuf>,
        store: InventoryStore,
        report_root: impl Into<PathBuf>,
        index: ReportIndex,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            store,
            report_root: report_root.into(),
            index,
            scan_options: ScanOptions::default(),
        }
    }

    #[must_use]
    pub fn with_scan_options(mut self, options: ScanOptions) -> Self {
        self.scan_options = options;
        self
    }

    /// Builds the manager for a configured file system
    #[must_use]
    pub fn for_file_system(config: &Config, file_system: &FileSystemConfig) -> Self {
        Self::new(
            &file_system.base_path,
            config.inventory_store(file_system),
            &file_system.report_path,
            ReportIndex::new(&config.reports.index_path),
        )
        .with_scan_options(config.scan_options(file_system))
    }

    /// Builds the manager for the configured file system whose base path is exactly
    /// `base_path`.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotConfigured`] if no file system has that base path.
    pub fn from_config(config: &Config, base_path: &Path) -> Result<Self> {
        config
            .file_systems
            .iter()
            .find(|fs| fs.base_path == base_path)
            .map(|fs| Self::for_file_system(config, fs))
            .ok_or_else(|| InventoryError::NotConfigured {
                path: base_path.to_path_buf(),
            })
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn store(&self) -> &InventoryStore {
        &self.store
    }

    #[must_use]
    pub fn index(&self) -> &ReportIndex {
        &self.index
    }

    fn scanner(&self, scope: &str) -> TreeScanner {
        TreeScanner::new(&self.base_path)
            .with_scope(scope)
            .with_options(self.scan_options.clone())
    }

    /// Scans the whole base path and commits the result as its inventory.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::InventoryExists`] if an inventory is already stored and
    /// `exists_ok` is false, plus any lock, scan or store error.
    pub fn populate(&self, exists_ok: bool) -> Result<PopulateOutcome> {
        let lock = self.store.lock(&self.base_path, WriteOperation::Populate)?;
        if self.store.exists(&self.base_path) && !exists_ok {
            return Err(InventoryError::InventoryExists {
                base_path: self.base_path.clone(),
            });
        }

        let outcome = self.scanner("").scan()?;
        for anomaly in &outcome.anomalies {
            warn!(path = %anomaly.path, detail = %anomaly.detail, "not recorded in inventory");
        }
        let stored = self.store.save(&lock, &outcome.snapshot)?;
        info!(
            base = %self.base_path.display(),
            records = stored.record_count,
            "inventory populated"
        );

        Ok(PopulateOutcome {
            stored,
            anomalies: outcome.anomalies,
        })
    }

    /// Compares the live tree under `scope` with the stored inventory.
    ///
    /// Never modifies the store. Paths the scan could not examine are left out of both sides
    /// of the comparison, so they are reported as anomalies instead of deletions.
    ///
    /// # Errors
    ///
    /// Returns structural scan errors and store read errors.
    pub fn detect_changes(&self, scope: &str, options: DiffOptions) -> Result<Report> {
        let previous = self.store.load(&self.base_path)?;
        let outcome = self.scanner(scope).scan()?;

        let anomalous: Vec<&str> = previous
            .paths()
            .filter(|path| outcome.is_anomalous(path))
            .collect();
        let comparable = previous.within_scope(scope).without(anomalous);
        let changes = diff(&comparable, &outcome.snapshot, options);

        let report = Report::new(
            &self.base_path,
            scope,
            previous.digest(),
            outcome.snapshot.digest(),
            changes,
            outcome.anomalies,
        );
        info!(
            base = %self.base_path.display(),
            scope,
            counts = %report.counts(),
            "change detection complete"
        );
        Ok(report)
    }

    /// Writes `report` under the report root and records it in the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the report or the index cannot be written.
    pub fn write_report(&self, report: &Report) -> Result<PathBuf> {
        let path = report.default_path(&self.report_root);
        report.save(&path)?;
        self.index.record(report, &path)?;
        Ok(path)
    }

    /// Saves a modified report in place and refreshes its index entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the report or the index cannot be written.
    pub fn update_report(&self, report: &Report, path: &Path) -> Result<()> {
        report.save(path)?;
        self.index.record(report, path)
    }

    /// Applies the report stored at `path` and rewrites it as applied.
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::NotConfigured`] if the report belongs to another base path,
    /// and every error of [`workflow::apply`]. Once the inventory is committed, a failure to
    /// rewrite the report is [`InventoryError::ReportNotMarkedApplied`]; a failure to update
    /// the report index is only logged.
    pub fn apply_report(&self, path: &Path) -> Result<(Report, ApplyOutcome)> {
        let mut report = Report::load(path)?;
        if report.base_path != self.base_path {
            return Err(InventoryError::NotConfigured {
                path: report.base_path,
            });
        }

        let outcome = workflow::apply(&self.store, &mut report)?;
        if let Err(e) = report.save(path) {
            return Err(InventoryError::ReportNotMarkedApplied {
                report_path: path.to_path_buf(),
                digest: outcome.stored.digest,
                source: Box::new(e),
            });
        }
        if let Err(e) = self.index.record(&report, path) {
            warn!(
                report = %path.display(),
                index = %self.index.path().display(),
                error = %e,
                "report applied but the report index was not updated"
            );
        }
        Ok((report, outcome))
    }
}
