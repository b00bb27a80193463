use crate::FixwatchContext;
use crate::workflow;
use anyhow::Result;
use std::path::Path;

/// Marks a report as reviewed
///
/// # Errors
///
/// Returns an error if the report cannot be read or written, or was already applied
pub fn execute(ctx: &FixwatchContext, report_path: &Path) -> Result<()> {
    let mut report = super::load_report(report_path)?;
    if report.confirmed {
        super::print_info("Report is already confirmed");
        return Ok(());
    }

    workflow::confirm(&mut report)?;
    super::save_report(ctx, &report, report_path)?;
    super::print_success("Report confirmed");
    Ok(())
}
