use super::{ChangeEntry, ChangeKind};
use crate::error::{InventoryError, Result};
use crate::storage::Snapshot;

/// Applies `changes` onto `previous`, producing the snapshot they describe.
///
/// Unchanged entries keep the previous record as stored. Paths the changes do not mention
/// are carried over untouched, which is how anomalous paths keep their last-known record.
///
/// # Errors
///
/// Returns [`InventoryError::Corrupt`] if an entry lacks the fields its kind requires.
pub fn replay(previous: &Snapshot, changes: &[ChangeEntry]) -> Result<Snapshot> {
    let mut snapshot = previous.clone();

    for entry in changes {
        match entry.kind {
            ChangeKind::Unchanged => {}
            ChangeKind::Deleted => {
                let old = required(entry.old_path.as_deref(), entry)?;
                snapshot.remove(old);
            }
            ChangeKind::Moved => {
                let old = required(entry.old_path.as_deref(), entry)?;
                snapshot.remove(old);
                snapshot.insert(record_of(entry)?);
            }
            ChangeKind::Added | ChangeKind::Modified => {
                snapshot.insert(record_of(entry)?);
            }
        }
    }

    Ok(snapshot)
}

fn record_of(entry: &ChangeEntry) -> Result<crate::storage::FileRecord> {
    entry.new_record().ok_or_else(|| malformed(entry))
}

fn required<'a>(value: Option<&'a str>, entry: &ChangeEntry) -> Result<&'a str> {
    value.ok_or_else(|| malformed(entry))
}

fn malformed(entry: &ChangeEntry) -> InventoryError {
    InventoryError::Corrupt {
        path: entry.primary_path().into(),
        detail: format!("{} entry is missing required fields", entry.kind),
    }
}
