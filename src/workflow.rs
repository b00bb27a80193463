//! Review and apply transitions for reports.
//!
//! ```text
//! DRAFTED --add_note--> ANNOTATED --confirm--> CONFIRMED --apply--> APPLIED
//!    |                                                        ^
//!    +------------------------- apply (no notes) -------------+
//! ```
//!
//! [`add_note`], [`confirm`] and [`check_apply`] only look at the report. [`apply`] is the one
//! transition that touches the inventory store. Every failed transition leaves both the report
//! and the store unchanged.

use crate::diff::replay;
use crate::error::{InventoryError, Result};
use crate::lock::WriteOperation;
use crate::report::{Note, Report};
use crate::storage::{InventoryStore, StoredInventoryInfo};
use chrono::{DateTime, Utc};
use tracing::{info, info_span};

/// What a successful apply committed
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub applied_at: DateTime<Utc>,
    pub stored: StoredInventoryInfo,
}

fn ensure_not_applied(report: &Report) -> Result<()> {
    match report.applied_at {
        Some(applied_at) => Err(InventoryError::AlreadyApplied { applied_at }),
        None => Ok(()),
    }
}

/// Appends a note. Existing notes are never edited or removed.
///
/// # Errors
///
/// Returns [`InventoryError::AlreadyApplied`] for applied reports.
pub fn add_note(report: &mut Report, note: Note) -> Result<()> {
    ensure_not_applied(report)?;
    report.notes.push(note);
    Ok(())
}

/// Marks the report as reviewed.
///
/// # Errors
///
/// Returns [`InventoryError::AlreadyApplied`] for applied reports.
pub fn confirm(report: &mut Report) -> Result<()> {
    ensure_not_applied(report)?;
    report.confirmed = true;
    Ok(())
}

/// Checks whether the report may be applied in its current state.
///
/// # Errors
///
/// Returns [`InventoryError::AlreadyApplied`] if it was applied before, and
/// [`InventoryError::ConfirmationRequired`] if it carries notes but was not confirmed.
pub fn check_apply(report: &Report) -> Result<()> {
    ensure_not_applied(report)?;
    if !report.notes.is_empty() && !report.confirmed {
        return Err(InventoryError::ConfirmationRequired {
            notes: report.notes.len(),
        });
    }
    Ok(())
}

/// Commits the report's changes to the inventory and marks it applied.
///
/// Holds the store lock across load, verification and save. The stored inventory must still
/// be the snapshot the report was generated against.
///
/// # Errors
///
/// Returns the [`check_apply`] errors, [`InventoryError::StaleReport`] if the inventory moved
/// on since the report was generated, and any lock or store error. On error neither the
/// report nor the store has been modified.
pub fn apply(store: &InventoryStore, report: &mut Report) -> Result<ApplyOutcome> {
    check_apply(report)?;

    let span = info_span!("apply", base = %report.base_path.display());
    let _guard = span.enter();

    let lock = store.lock(&report.base_path, WriteOperation::Apply)?;
    let stored = store.load(&report.base_path)?;
    let actual = stored.digest();
    if actual != report.previous_snapshot_ref {
        return Err(InventoryError::StaleReport {
            expected: report.previous_snapshot_ref.clone(),
            actual,
        });
    }

    let next = replay(&stored, &report.changes)?;
    let info = store.save(&lock, &next)?;
    drop(lock);

    let applied_at = Utc::now();
    report.applied_at = Some(applied_at);
    info!(
        changes = report.counts().total_changes(),
        digest = %info.digest,
        "report applied"
    );
    Ok(ApplyOutcome {
        applied_at,
        stored: info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangeEntry, DiffOptions, diff};
    use crate::storage::{FileRecord, Snapshot};
    use chrono::TimeZone;
    use std::path::Path;
    use tempfile::TempDir;

    fn record(path: &str, fixity: &str) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            size_bytes: 1,
            mtime: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            fixity: fixity.to_string(),
        }
    }

    fn populated_store(temp: &TempDir, base: &Path, snapshot: &Snapshot) -> InventoryStore {
        let store = InventoryStore::new(temp.path().join("store"));
        let lock = store.lock(base, WriteOperation::Populate).unwrap();
        store.save(&lock, snapshot).unwrap();
        store
    }

    fn report_for(base: &Path, previous: &Snapshot, current: &Snapshot) -> Report {
        Report::new(
            base,
            "",
            previous.digest(),
            current.digest(),
            diff(previous, current, DiffOptions::default()),
            Vec::new(),
        )
    }

    #[test]
    fn test_transitions_on_applied_report_fail() {
        let mut report = Report::new("/data", "", "p", "c", Vec::new(), Vec::new());
        report.applied_at = Some(Utc::now());

        assert!(matches!(
            add_note(&mut report, Note::new("late", None)),
            Err(InventoryError::AlreadyApplied { .. })
        ));
        assert!(matches!(
            confirm(&mut report),
            Err(InventoryError::AlreadyApplied { .. })
        ));
        assert!(report.notes.is_empty());
        assert!(!report.confirmed);
    }

    #[test]
    fn test_notes_require_confirmation() {
        let mut report = Report::new("/data", "", "p", "c", Vec::new(), Vec::new());
        check_apply(&report).unwrap();

        add_note(&mut report, Note::new("looked at it", None)).unwrap();
        assert!(matches!(
            check_apply(&report),
            Err(InventoryError::ConfirmationRequired { notes: 1 })
        ));

        confirm(&mut report).unwrap();
        check_apply(&report).unwrap();
    }

    #[test]
    fn test_apply_commits_changes_once() {
        let temp = TempDir::new().unwrap();
        let base = Path::new("/data");
        let previous: Snapshot = [record("a", "11")].into_iter().collect();
        let current: Snapshot = [record("a", "11"), record("b", "22")].into_iter().collect();
        let store = populated_store(&temp, base, &previous);

        let mut report = report_for(base, &previous, &current);
        let outcome = apply(&store, &mut report).unwrap();
        assert_eq!(store.load(base).unwrap(), current);
        assert_eq!(outcome.stored.digest, current.digest());
        assert_eq!(report.applied_at, Some(outcome.applied_at));

        let second = apply(&store, &mut report);
        assert!(matches!(second, Err(InventoryError::AlreadyApplied { .. })));
        assert_eq!(store.load(base).unwrap(), current);
    }

    #[test]
    fn test_stale_report_is_refused() {
        let temp = TempDir::new().unwrap();
        let base = Path::new("/data");
        let previous: Snapshot = [record("a", "11")].into_iter().collect();
        let current: Snapshot = [record("b", "22")].into_iter().collect();
        let store = populated_store(&temp, base, &previous);

        let mut first = report_for(base, &previous, &current);
        let mut duplicate = first.clone();
        apply(&store, &mut first).unwrap();

        let result = apply(&store, &mut duplicate);
        assert!(matches!(result, Err(InventoryError::StaleReport { .. })));
        assert!(duplicate.applied_at.is_none());
        assert_eq!(store.load(base).unwrap(), current);
    }

    #[test]
    fn test_unconfirmed_apply_leaves_store_untouched() {
        let temp = TempDir::new().unwrap();
        let base = Path::new("/data");
        let previous: Snapshot = [record("a", "11")].into_iter().collect();
        let current = Snapshot::new();
        let store = populated_store(&temp, base, &previous);

        let mut report = report_for(base, &previous, &current);
        assert_eq!(report.changes, vec![ChangeEntry::deleted(&record_like(&previous))]);
        add_note(&mut report, Note::new("deletion expected", None)).unwrap();

        assert!(matches!(
            apply(&store, &mut report),
            Err(InventoryError::ConfirmationRequired { .. })
        ));
        assert_eq!(store.load(base).unwrap(), previous);

        confirm(&mut report).unwrap();
        apply(&store, &mut report).unwrap();
        assert!(store.load(base).unwrap().is_empty());
    }

    fn record_like(snapshot: &Snapshot) -> FileRecord {
        snapshot.iter().next().cloned().unwrap()
    }
}
