pub mod confirm;
pub mod detect;
pub mod export;
pub mod list_reports;
pub mod note;
pub mod populate;
pub mod show;
pub mod update;

use crate::FixwatchContext;
use crate::config::FileSystemConfig;
use crate::diff::ChangeKind;
use crate::error::InventoryError;
use crate::output;
use crate::report::{Report, ReportIndex};
use crate::utils::paths::make_absolute;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::{Path, PathBuf};

pub fn print_success(message: &str) {
    if output::is_quiet() {
        return;
    }
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_info(message: &str) {
    if output::is_quiet() {
        return;
    }
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Absolute form of a user-supplied path, resolving symlinks when the path exists
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = make_absolute(path)?;
    Ok(absolute.canonicalize().unwrap_or(absolute))
}

/// The configured file system containing `path`
fn file_system_for<'a>(ctx: &'a FixwatchContext, path: &Path) -> Result<&'a FileSystemConfig> {
    let absolute = make_absolute(path)?;
    let resolved = resolve(path)?;
    ctx.config
        .find_file_system(&absolute)
        .or_else(|| ctx.config.find_file_system(&resolved))
        .ok_or_else(|| {
            InventoryError::NotConfigured {
                path: absolute.clone(),
            }
            .into()
        })
}

/// Loads a report, naming the file in the error
fn load_report(path: &Path) -> Result<Report> {
    Report::load(path).with_context(|| format!("Failed to load report {}", path.display()))
}

/// Saves a modified report and refreshes its index entry
fn save_report(ctx: &FixwatchContext, report: &Report, path: &Path) -> Result<()> {
    report
        .save(path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    ReportIndex::new(&ctx.config.reports.index_path)
        .record(report, &make_absolute(path)?)
        .context("Failed to update report index")
}

/// Colored status marker for a change kind
fn kind_marker(kind: ChangeKind) -> colored::ColoredString {
    let label = format!("{:<9}", kind.as_str());
    match kind {
        ChangeKind::Added => label.green(),
        ChangeKind::Deleted => label.red(),
        ChangeKind::Modified => label.yellow(),
        ChangeKind::Moved => label.cyan(),
        ChangeKind::Unchanged => label.dimmed(),
    }
}

/// Prints one line per change and anomaly
fn print_changes(report: &Report) {
    for entry in &report.changes {
        let description = match (entry.kind, &entry.old_path, &entry.new_path) {
            (ChangeKind::Moved, Some(old), Some(new)) => format!("{old} -> {new}"),
            _ => entry.primary_path().to_string(),
        };
        println!("  {} {}", kind_marker(entry.kind), description);
    }
    for anomaly in &report.anomalies {
        println!(
            "  {} {} {}",
            format!("{:<9}", format!("{:?}", anomaly.kind).to_uppercase()).red().bold(),
            anomaly.path,
            format!("({})", anomaly.detail).dimmed()
        );
    }
}
