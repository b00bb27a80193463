use crate::FixwatchContext;
use crate::error::InventoryError;
use crate::inventory::InventoryManager;
use crate::utils::paths::make_absolute;
use crate::workflow;
use anyhow::{Context, Result};
use colored::Colorize;
use std::io::{self, Write};
use std::path::Path;

/// Applies a report to its inventory
///
/// Without `yes` the user is asked first; non-interactive contexts refuse instead.
///
/// # Errors
///
/// Returns an error if the report cannot be applied (needs confirmation, already applied,
/// stale) or the store cannot be written
pub fn execute(ctx: &FixwatchContext, report_path: &Path, yes: bool) -> Result<()> {
    let report_path = make_absolute(report_path)?;
    let report = super::load_report(&report_path)?;
    workflow::check_apply(&report)?;

    let manager = InventoryManager::from_config(&ctx.config, &report.base_path)?;
    let counts = report.counts();

    println!(
        "{} {}",
        "Report for".dimmed(),
        report.base_path.display().to_string().bold()
    );
    println!("  {counts}");
    for note in &report.notes {
        println!(
            "  {} {}",
            format!("[{}]", note.author.as_deref().unwrap_or("unknown")).dimmed(),
            note.text
        );
    }

    if !yes {
        if ctx.non_interactive {
            anyhow::bail!("Refusing to apply without confirmation; pass --yes");
        }
        print!(
            "Apply {} change{} to the inventory? [y/N]: ",
            counts.total_changes(),
            if counts.total_changes() == 1 { "" } else { "s" }
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            super::print_info("Update cancelled");
            return Ok(());
        }
    }

    let outcome = match manager.apply_report(&report_path) {
        Ok((_, outcome)) => outcome,
        Err(e @ InventoryError::ReportNotMarkedApplied { .. }) => return Err(e.into()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to apply {}", report_path.display()));
        }
    };
    super::print_success(&format!(
        "Inventory of {} updated: {} file{}",
        report.base_path.display(),
        outcome.stored.record_count,
        if outcome.stored.record_count == 1 { "" } else { "s" }
    ));
    Ok(())
}
