use crate::report::export;
use crate::utils::write_atomic;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

/// Writes a report's changes as tab-separated values
///
/// # Errors
///
/// Returns an error if the report cannot be read or the output cannot be written
pub fn execute(report_path: &Path, output: Option<&Path>) -> Result<()> {
    let report = super::load_report(report_path)?;
    let tsv = export::to_tsv(&report)
        .with_context(|| format!("Failed to export {}", report_path.display()))?;

    match output {
        Some(path) => {
            write_atomic(path, tsv.as_bytes())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            super::print_success(&format!(
                "Exported {} row{} to {}",
                report.changes.len(),
                if report.changes.len() == 1 { "" } else { "s" },
                path.display()
            ));
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(tsv.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
