//! Detected-change reports.
//!
//! A [`Report`] is the canonical record of one detection run: what changed under a base path
//! relative to the stored inventory, which files could not be examined, and the human review
//! that happened afterwards (notes and confirmation). Reports are stored as pretty-printed JSON
//! and are the only input `apply` needs.

/// Flat rows for spreadsheet-style export
pub mod export;
/// Durable list of written reports
pub mod index;

pub use index::{ReportIndex, ReportIndexEntry};

use crate::diff::{ChangeEntry, ChangeKind};
use crate::error::{InventoryError, Result};
use crate::scanner::ScanAnomaly;
use crate::utils::write_atomic;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// JSON format version written into every report
pub const REPORT_FORMAT_VERSION: u32 = 1;

/// A free-text annotation attached to a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl Note {
    /// A note stamped with the current time
    #[must_use]
    pub fn new(text: impl Into<String>, author: Option<String>) -> Self {
        Self {
            text: text.into(),
            author,
            added_at: Some(Utc::now()),
        }
    }
}

/// Review state, derived from the report's fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportState {
    /// Freshly generated, no notes
    Drafted,
    /// Has notes but has not been confirmed
    Annotated,
    Confirmed,
    /// Committed to the inventory; immutable from here on
    Applied,
}

impl fmt::Display for ReportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drafted => "drafted",
            Self::Annotated => "annotated",
            Self::Confirmed => "confirmed",
            Self::Applied => "applied",
        })
    }
}

/// Per-kind tallies of a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub deleted: usize,
    pub modified: usize,
    pub moved: usize,
    pub unchanged: usize,
    pub anomalies: usize,
}

impl ChangeCounts {
    /// Number of entries that are not unchanged
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.added + self.deleted + self.modified + self.moved
    }

    #[must_use]
    pub const fn get(&self, kind: ChangeKind) -> usize {
        match kind {
            ChangeKind::Added => self.added,
            ChangeKind::Deleted => self.deleted,
            ChangeKind::Modified => self.modified,
            ChangeKind::Moved => self.moved,
            ChangeKind::Unchanged => self.unchanged,
        }
    }
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} deleted, {} modified, {} moved",
            self.added, self.deleted, self.modified, self.moved
        )?;
        if self.anomalies > 0 {
            write!(f, ", {} unreadable", self.anomalies)?;
        }
        Ok(())
    }
}

/// How urgently a report needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Nothing changed
    Clean,
    /// Files changed
    Changed,
    /// Some files could not be examined
    Anomalous,
}

/// The outcome of one detection run plus its review trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub version: u32,
    pub base_path: PathBuf,
    /// Relative sub-tree the detection covered; empty for the whole base path
    #[serde(default)]
    pub scope: String,
    pub generated_at: DateTime<Utc>,
    /// Digest of the stored snapshot the changes are relative to
    pub previous_snapshot_ref: String,
    /// Digest of the scanned snapshot
    pub current_snapshot_ref: String,
    pub changes: Vec<ChangeEntry>,
    #[serde(default)]
    pub anomalies: Vec<ScanAnomaly>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
}

impl Report {
    #[must_use]
    pub fn new(
        base_path: impl Into<PathBuf>,
        scope: impl Into<String>,
        previous_snapshot_ref: impl Into<String>,
        current_snapshot_ref: impl Into<String>,
        changes: Vec<ChangeEntry>,
        anomalies: Vec<ScanAnomaly>,
    ) -> Self {
        Self {
            version: REPORT_FORMAT_VERSION,
            base_path: base_path.into(),
            scope: scope.into(),
            generated_at: Utc::now(),
            previous_snapshot_ref: previous_snapshot_ref.into(),
            current_snapshot_ref: current_snapshot_ref.into(),
            changes,
            anomalies,
            notes: Vec::new(),
            confirmed: false,
            applied_at: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ReportState {
        if self.applied_at.is_some() {
            ReportState::Applied
        } else if self.confirmed {
            ReportState::Confirmed
        } else if !self.notes.is_empty() {
            ReportState::Annotated
        } else {
            ReportState::Drafted
        }
    }

    #[must_use]
    pub fn counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts {
            anomalies: self.anomalies.len(),
            ..ChangeCounts::default()
        };
        for entry in &self.changes {
            match entry.kind {
                ChangeKind::Added => counts.added += 1,
                ChangeKind::Deleted => counts.deleted += 1,
                ChangeKind::Modified => counts.modified += 1,
                ChangeKind::Moved => counts.moved += 1,
                ChangeKind::Unchanged => counts.unchanged += 1,
            }
        }
        counts
    }

    /// Whether any entry is something other than unchanged
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes
            .iter()
            .any(|entry| entry.kind != ChangeKind::Unchanged)
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        if !self.anomalies.is_empty() {
            Severity::Anomalous
        } else if self.has_changes() {
            Severity::Changed
        } else {
            Severity::Clean
        }
    }

    /// One-line summary suitable as a notification subject
    #[must_use]
    pub fn notification_subject(&self) -> String {
        let location = if self.scope.is_empty() {
            self.base_path.display().to_string()
        } else {
            self.base_path.join(&self.scope).display().to_string()
        };
        let mut subject = if self.has_changes() {
            format!("Changes detected in {location}")
        } else {
            format!("No changes detected in {location}")
        };
        if !self.anomalies.is_empty() {
            subject.push_str(&format!(" ({} unreadable)", self.anomalies.len()));
        }
        subject
    }

    /// Pretty-printed JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns an error if `json` is not a valid report
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a report file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| InventoryError::io(path, e))?;
        let report = Self::from_json(&json)?;
        if report.version > REPORT_FORMAT_VERSION {
            return Err(InventoryError::Corrupt {
                path: path.to_path_buf(),
                detail: format!("unsupported report version {}", report.version),
            });
        }
        Ok(report)
    }

    /// Writes the report atomically, replacing any existing file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = self.to_json()?;
        json.push('\n');
        write_atomic(path, json.as_bytes()).map_err(|e| InventoryError::io(path, e))
    }

    /// Default location under `report_root`: `YYYY/MM/DD/<timestamp>.json`
    #[must_use]
    pub fn default_path(&self, report_root: &Path) -> PathBuf {
        let at = self.generated_at;
        report_root
            .join(at.format("%Y").to_string())
            .join(at.format("%m").to_string())
            .join(at.format("%d").to_string())
            .join(format!("{}.json", at.format("%Y-%m-%dT%H-%M-%S%.6fZ")))
    }
}
