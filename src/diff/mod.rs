//! Change detection between two snapshots.
//!
//! This module classifies every path of a previous and a current snapshot:
//! - Paths only in the current snapshot are added
//! - Paths only in the previous snapshot are deleted
//! - Paths in both are unchanged or modified, decided by fixity alone
//! - Added/deleted pairs with identical content are correlated into moves
//!
//! [`replay`] is the inverse: it applies a list of changes onto the previous snapshot.

/// Applying change lists onto snapshots
pub mod replay;

pub use replay::replay;

use crate::storage::{FileRecord, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Classification of one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    Moved,
    Unchanged,
}

impl ChangeKind {
    /// All kinds in report order
    pub const ALL: [Self; 5] = [
        Self::Added,
        Self::Deleted,
        Self::Modified,
        Self::Moved,
        Self::Unchanged,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::Deleted => "DELETED",
            Self::Modified => "MODIFIED",
            Self::Moved => "MOVED",
            Self::Unchanged => "UNCHANGED",
        }
    }

    /// Single-character status marker used in listings
    #[must_use]
    pub const fn status_char(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Modified => 'M',
            Self::Moved => 'R',
            Self::Unchanged => ' ',
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified path.
///
/// `old_*` fields describe the previous record and `new_*` fields the current one. An added
/// entry has no `old_*` values and a deleted entry has no `new_*` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_fixity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_fixity: Option<String>,
    /// Size of the current record, or of the removed record for deletions
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_mtime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_mtime: Option<DateTime<Utc>>,
    /// Whole seconds between the old and new modification time, set on modifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime_delta_secs: Option<i64>,
}

impl ChangeEntry {
    fn between(kind: ChangeKind, old: &FileRecord, new: &FileRecord) -> Self {
        Self {
            kind,
            old_path: Some(old.relative_path.clone()),
            new_path: Some(new.relative_path.clone()),
            old_fixity: Some(old.fixity.clone()),
            new_fixity: Some(new.fixity.clone()),
            size_bytes: new.size_bytes,
            old_mtime: Some(old.mtime),
            new_mtime: Some(new.mtime),
            mtime_delta_secs: None,
        }
    }

    #[must_use]
    pub fn added(new: &FileRecord) -> Self {
        Self {
            kind: ChangeKind::Added,
            old_path: None,
            new_path: Some(new.relative_path.clone()),
            old_fixity: None,
            new_fixity: Some(new.fixity.clone()),
            size_bytes: new.size_bytes,
            old_mtime: None,
            new_mtime: Some(new.mtime),
            mtime_delta_secs: None,
        }
    }

    #[must_use]
    pub fn deleted(old: &FileRecord) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            old_path: Some(old.relative_path.clone()),
            new_path: None,
            old_fixity: Some(old.fixity.clone()),
            new_fixity: None,
            size_bytes: old.size_bytes,
            old_mtime: Some(old.mtime),
            new_mtime: None,
            mtime_delta_secs: None,
        }
    }

    #[must_use]
    pub fn modified(old: &FileRecord, new: &FileRecord) -> Self {
        Self {
            mtime_delta_secs: Some((new.mtime - old.mtime).num_seconds()),
            ..Self::between(ChangeKind::Modified, old, new)
        }
    }

    #[must_use]
    pub fn moved(old: &FileRecord, new: &FileRecord) -> Self {
        Self::between(ChangeKind::Moved, old, new)
    }

    #[must_use]
    pub fn unchanged(old: &FileRecord, new: &FileRecord) -> Self {
        Self::between(ChangeKind::Unchanged, old, new)
    }

    /// The path an entry is ordered and listed by
    #[must_use]
    pub fn primary_path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }

    /// The record this entry leaves in the inventory, if any.
    ///
    /// Returns `None` for deletions and for entries missing the fields a record needs.
    #[must_use]
    pub fn new_record(&self) -> Option<FileRecord> {
        Some(FileRecord {
            relative_path: self.new_path.clone()?,
            size_bytes: self.size_bytes,
            mtime: self.new_mtime?,
            fixity: self.new_fixity.clone()?,
        })
    }
}

/// Knobs for [`diff`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffOptions {
    /// Emit an entry for every unchanged path as well
    pub include_unchanged: bool,
}

/// Classifies every path of `previous` and `current`.
///
/// Fixity decides content changes; a path whose content is identical but whose metadata
/// differs is unchanged. Paths present on one side only are correlated into moves when their
/// fixities match, each record pairing at most once. Pairing is greedy in ascending path order
/// on both sides and prefers candidates of equal size.
///
/// The result is sorted by [`ChangeEntry::primary_path`].
#[must_use]
pub fn diff(previous: &Snapshot, current: &Snapshot, options: DiffOptions) -> Vec<ChangeEntry> {
    let mut entries = Vec::new();
    let mut added = Vec::new();

    for record in current.iter() {
        match previous.get(&record.relative_path) {
            None => added.push(record),
            Some(old) if old.fixity == record.fixity => {
                if options.include_unchanged {
                    entries.push(ChangeEntry::unchanged(old, record));
                }
            }
            Some(old) => entries.push(ChangeEntry::modified(old, record)),
        }
    }

    let deleted: Vec<&FileRecord> = previous
        .iter()
        .filter(|record| !current.contains(&record.relative_path))
        .collect();

    let mut by_fixity: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, record) in deleted.iter().enumerate() {
        by_fixity.entry(record.fixity.as_str()).or_default().push(index);
    }

    let mut paired = vec![false; deleted.len()];
    let mut moves = 0usize;
    for record in added {
        let candidates = by_fixity
            .get(record.fixity.as_str())
            .map_or(&[][..], Vec::as_slice);
        let candidate = candidates
            .iter()
            .copied()
            .find(|&i| !paired[i] && deleted[i].size_bytes == record.size_bytes)
            .or_else(|| candidates.iter().copied().find(|&i| !paired[i]));

        match candidate {
            Some(index) => {
                paired[index] = true;
                moves += 1;
                entries.push(ChangeEntry::moved(deleted[index], record));
            }
            None => entries.push(ChangeEntry::added(record)),
        }
    }

    for (index, record) in deleted.iter().enumerate() {
        if !paired[index] {
            entries.push(ChangeEntry::deleted(record));
        }
    }

    entries.sort_by(|a, b| a.primary_path().cmp(b.primary_path()));
    debug!(
        previous = previous.len(),
        current = current.len(),
        changes = entries.len(),
        moves,
        "diff complete"
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixity::{EMPTY_FIXITY, hash_bytes};
    use chrono::TimeZone;

    fn record(path: &str, content: &str, mtime: i64) -> FileRecord {
        FileRecord {
            relative_path: path.to_string(),
            size_bytes: content.len() as u64,
            mtime: Utc.timestamp_opt(mtime, 0).unwrap(),
            fixity: hash_bytes(content.as_bytes()),
        }
    }

    fn kinds(entries: &[ChangeEntry]) -> Vec<(ChangeKind, &str)> {
        entries.iter().map(|e| (e.kind, e.primary_path())).collect()
    }

    #[test]
    fn test_identical_snapshots_are_unchanged() {
        let snap: Snapshot = [record("a", "1", 0), record("b", "2", 0)]
            .into_iter()
            .collect();

        assert!(diff(&snap, &snap, DiffOptions::default()).is_empty());

        let all = diff(
            &snap,
            &snap,
            DiffOptions {
                include_unchanged: true,
            },
        );
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.kind == ChangeKind::Unchanged));
    }

    #[test]
    fn test_added_deleted_modified() {
        let previous: Snapshot = [record("gone", "x", 0), record("edit", "old", 10)]
            .into_iter()
            .collect();
        let current: Snapshot = [record("new", "y", 0), record("edit", "new!", 70)]
            .into_iter()
            .collect();

        let entries = diff(&previous, &current, DiffOptions::default());
        assert_eq!(
            kinds(&entries),
            vec![
                (ChangeKind::Modified, "edit"),
                (ChangeKind::Deleted, "gone"),
                (ChangeKind::Added, "new"),
            ]
        );
        assert_eq!(entries[0].mtime_delta_secs, Some(60));
        assert_eq!(entries[1].new_path, None);
        assert_eq!(entries[2].old_fixity, None);
    }

    #[test]
    fn test_move_is_correlated_by_fixity() {
        let previous: Snapshot = [record("a.txt", "hello", 0), record("b.txt", "world", 0)]
            .into_iter()
            .collect();
        let current: Snapshot = [record("b.txt", "world", 0), record("c.txt", "hello", 5)]
            .into_iter()
            .collect();

        let entries = diff(&previous, &current, DiffOptions::default());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, ChangeKind::Moved);
        assert_eq!(entries[0].old_path.as_deref(), Some("a.txt"));
        assert_eq!(entries[0].new_path.as_deref(), Some("c.txt"));
    }

    #[test]
    fn test_metadata_only_change_is_unchanged() {
        let previous: Snapshot = [record("a", "same", 0)].into_iter().collect();
        let current: Snapshot = [record("a", "same", 999)].into_iter().collect();
        assert!(diff(&previous, &current, DiffOptions::default()).is_empty());
    }

    #[test]
    fn test_each_record_pairs_once_in_path_order() {
        // Two deletions and three additions with the same content
        let previous: Snapshot = [record("old1", "dup", 0), record("old2", "dup", 0)]
            .into_iter()
            .collect();
        let current: Snapshot = [
            record("new1", "dup", 0),
            record("new2", "dup", 0),
            record("new3", "dup", 0),
        ]
        .into_iter()
        .collect();

        let entries = diff(&previous, &current, DiffOptions::default());
        assert_eq!(
            kinds(&entries),
            vec![
                (ChangeKind::Moved, "new1"),
                (ChangeKind::Moved, "new2"),
                (ChangeKind::Added, "new3"),
            ]
        );
        assert_eq!(entries[0].old_path.as_deref(), Some("old1"));
        assert_eq!(entries[1].old_path.as_deref(), Some("old2"));
    }

    #[test]
    fn test_modified_entries_never_pair() {
        // "b" changes to the content "a" used to have while "a" disappears
        let previous: Snapshot = [record("a", "one", 0), record("b", "two", 0)]
            .into_iter()
            .collect();
        let current: Snapshot = [record("b", "one", 0)].into_iter().collect();

        let entries = diff(&previous, &current, DiffOptions::default());
        assert_eq!(
            kinds(&entries),
            vec![(ChangeKind::Deleted, "a"), (ChangeKind::Modified, "b")]
        );
    }

    #[test]
    fn test_zero_byte_swap_is_deterministic() {
        let previous: Snapshot = [record("x", "", 0), record("y", "", 0)]
            .into_iter()
            .collect();
        let current: Snapshot = [record("y2", "", 0), record("x2", "", 0)]
            .into_iter()
            .collect();

        let first = diff(&previous, &current, DiffOptions::default());
        let second = diff(&previous, &current, DiffOptions::default());
        assert_eq!(first, second);
        assert_eq!(current.get("x2").unwrap().fixity, EMPTY_FIXITY);
        assert_eq!(first[0].old_path.as_deref(), Some("x"));
        assert_eq!(first[1].old_path.as_deref(), Some("y"));
    }

    #[test]
    fn test_new_record_round_trip() {
        let new = record("n", "content", 42);
        assert_eq!(ChangeEntry::added(&new).new_record(), Some(new.clone()));
        assert_eq!(ChangeEntry::deleted(&new).new_record(), None);
    }
}
