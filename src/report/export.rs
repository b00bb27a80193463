use super::Report;
use crate::diff::ChangeKind;
use crate::error::{InventoryError, Result};
use csv::{Terminator, WriterBuilder};
use serde::Serialize;

/// Column headers, in [`ExportRow`] field order
pub const HEADERS: [&str; 6] = [
    "kind",
    "old_path",
    "new_path",
    "old_fixity",
    "new_fixity",
    "mtime_delta_secs",
];

/// One change flattened for spreadsheets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub kind: ChangeKind,
    pub old_path: String,
    pub new_path: String,
    pub old_fixity: String,
    pub new_fixity: String,
    pub mtime_delta_secs: Option<i64>,
}

impl ExportRow {
    fn cells(&self) -> [String; 6] {
        [
            self.kind.as_str().to_string(),
            self.old_path.clone(),
            self.new_path.clone(),
            self.old_fixity.clone(),
            self.new_fixity.clone(),
            self.mtime_delta_secs
                .map(|delta| delta.to_string())
                .unwrap_or_default(),
        ]
    }
}

/// Rows in report order; missing values become empty cells
#[must_use]
pub fn rows(report: &Report) -> Vec<ExportRow> {
    report
        .changes
        .iter()
        .map(|entry| ExportRow {
            kind: entry.kind,
            old_path: entry.old_path.clone().unwrap_or_default(),
            new_path: entry.new_path.clone().unwrap_or_default(),
            old_fixity: entry.old_fixity.clone().unwrap_or_default(),
            new_fixity: entry.new_fixity.clone().unwrap_or_default(),
            mtime_delta_secs: entry.mtime_delta_secs,
        })
        .collect()
}

/// Tab-separated rendering with a header line.
///
/// Values holding a tab, newline or quote are quoted, so paths survive a spreadsheet import
/// unchanged.
///
/// # Errors
///
/// Returns [`InventoryError::Encode`] if a row cannot be written
pub fn to_tsv(report: &Report) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(HEADERS).map_err(encode_error)?;
    for row in rows(report) {
        writer.write_record(row.cells()).map_err(encode_error)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| InventoryError::Encode(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| InventoryError::Encode(e.to_string()))
}

fn encode_error(e: csv::Error) -> InventoryError {
    InventoryError::Encode(format!("tsv export: {e}"))
}
