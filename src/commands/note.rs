use crate::FixwatchContext;
use crate::report::Note;
use crate::utils::get_current_user;
use crate::workflow;
use anyhow::Result;
use std::path::Path;

/// Appends a note to a report
///
/// # Errors
///
/// Returns an error if the report cannot be read or written, or was already applied
pub fn execute(
    ctx: &FixwatchContext,
    report_path: &Path,
    text: &str,
    user: Option<String>,
) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Note text cannot be empty");
    }

    let mut report = super::load_report(report_path)?;
    let author = user.unwrap_or_else(get_current_user);
    workflow::add_note(&mut report, Note::new(text, Some(author)))?;
    super::save_report(ctx, &report, report_path)?;

    super::print_success(&format!(
        "Note added ({} total); the report must be confirmed before it can be applied",
        report.notes.len()
    ));
    Ok(())
}
