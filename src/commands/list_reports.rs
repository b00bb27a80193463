use crate::FixwatchContext;
use crate::report::ReportIndex;
use anyhow::Result;
use colored::Colorize;

/// Lists indexed reports, newest first
///
/// # Errors
///
/// Returns an error if the report index cannot be read
pub fn execute(ctx: &FixwatchContext, limit: Option<usize>, has_changes_only: bool) -> Result<()> {
    let index = ReportIndex::new(&ctx.config.reports.index_path);
    let entries = index.list(limit, has_changes_only)?;

    if entries.is_empty() {
        super::print_info("No reports found");
        return Ok(());
    }

    for entry in entries {
        let status = match entry.applied_at {
            Some(at) => format!("applied {}", at.format("%Y-%m-%d %H:%M")).green(),
            None => "pending".yellow(),
        };
        let changes = if entry.has_changes {
            "changes".normal()
        } else {
            "clean".dimmed()
        };
        println!(
            "{}  {:<24}  {:<7}  {}  {}",
            entry.generated_at.format("%Y-%m-%d %H:%M:%S"),
            status,
            changes,
            entry.base_path.display().to_string().bold(),
            entry.report_path.display()
        );
    }
    Ok(())
}
