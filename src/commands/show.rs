use anyhow::Result;
use colored::Colorize;
use std::path::Path;

/// Prints a report's header, notes and changes
///
/// # Errors
///
/// Returns an error if the report cannot be read
pub fn execute(report_path: &Path) -> Result<()> {
    let report = super::load_report(report_path)?;

    println!("{} {}", "Base path:".bold(), report.base_path.display());
    if !report.scope.is_empty() {
        println!("{} {}", "Scope:".bold(), report.scope);
    }
    println!(
        "{} {}",
        "Generated:".bold(),
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("{} {}", "State:".bold(), report.state());
    if let Some(applied_at) = report.applied_at {
        println!(
            "{} {}",
            "Applied:".bold(),
            applied_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("{} {}", "Summary:".bold(), report.counts());

    if !report.notes.is_empty() {
        println!();
        println!("{}", "Notes:".bold());
        for note in &report.notes {
            let stamp = note
                .added_at
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "  {} {} {}",
                stamp.dimmed(),
                note.author.as_deref().unwrap_or("unknown").cyan(),
                note.text
            );
        }
    }

    if report.changes.is_empty() && report.anomalies.is_empty() {
        println!();
        println!("No changes");
    } else {
        println!();
        super::print_changes(&report);
    }
    Ok(())
}
