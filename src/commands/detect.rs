use crate::FixwatchContext;
use crate::diff::DiffOptions;
use crate::inventory::InventoryManager;
use crate::output;
use crate::report::Severity;
use crate::utils::paths::{make_absolute, normalize_scope};
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Compares `path` (a base path or a directory inside one) against the inventory
///
/// # Errors
///
/// Returns an error if the path is not configured, the scan aborts, or the report cannot
/// be written
pub fn execute(
    ctx: &FixwatchContext,
    path: &Path,
    no_report: bool,
    include_unchanged: bool,
) -> Result<()> {
    let file_system = super::file_system_for(ctx, path)?;
    let absolute = make_absolute(path)?;
    let relative = match absolute.strip_prefix(&file_system.base_path) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => super::resolve(path)?
            .strip_prefix(super::resolve(&file_system.base_path)?)
            .map(Path::to_path_buf)
            .with_context(|| {
                format!(
                    "{} is not inside {}",
                    absolute.display(),
                    file_system.base_path.display()
                )
            })?,
    };
    let scope = normalize_scope(&relative)?;

    let manager = InventoryManager::for_file_system(&ctx.config, file_system);
    output::verbose(&format!(
        "Base path {}, scope '{scope}', inventory at {}",
        file_system.base_path.display(),
        manager.store().inventory_dir(&file_system.base_path).display()
    ));
    if !manager.store().exists(&file_system.base_path) {
        super::print_warning(&format!(
            "No inventory stored for {} yet; every file will be reported as added",
            file_system.base_path.display()
        ));
    }

    let report = manager
        .detect_changes(&scope, DiffOptions { include_unchanged })
        .with_context(|| format!("Change detection failed for {}", absolute.display()))?;

    let subject = report.notification_subject();
    match report.severity() {
        Severity::Clean => super::print_success(&subject),
        Severity::Changed => super::print_info(&subject.yellow().to_string()),
        Severity::Anomalous => super::print_warning(&subject),
    }
    println!("  {}", report.counts());
    super::print_changes(&report);

    if !no_report {
        let report_path = manager.write_report(&report)?;
        println!();
        super::print_info(&format!("Report written to {}", report_path.display()));
        if report.has_changes() {
            println!(
                "  {}",
                format!("Review it, then run: fixwatch update {}", report_path.display())
                    .dimmed()
            );
        }
    }
    Ok(())
}
