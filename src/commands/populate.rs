use crate::FixwatchContext;
use crate::error::InventoryError;
use crate::inventory::InventoryManager;
use crate::output;
use crate::utils::format_size;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

/// Records the initial inventory of a configured base path
///
/// # Errors
///
/// Returns an error if the base path is not configured, an inventory already exists and
/// `exists_ok` is false, or scanning or saving fails
pub fn execute(ctx: &FixwatchContext, base_path: &Path, exists_ok: bool) -> Result<()> {
    let file_system = super::file_system_for(ctx, base_path)?;
    let requested = super::resolve(base_path)?;
    if requested != file_system.base_path && super::resolve(&file_system.base_path)? != requested {
        return Err(InventoryError::NotConfigured {
            path: requested,
        })
        .context("populate needs a configured base path, not a directory inside one");
    }

    let manager = InventoryManager::for_file_system(&ctx.config, file_system);
    output::verbose(&format!(
        "Inventory directory: {}",
        manager.store().inventory_dir(&file_system.base_path).display()
    ));
    super::print_info(&format!(
        "Scanning {}",
        file_system.base_path.display().to_string().bold()
    ));

    let outcome = match manager.populate(exists_ok) {
        Err(e @ InventoryError::InventoryExists { .. }) => {
            return Err(e).context("use --exists-ok to replace it");
        }
        other => other?,
    };

    for anomaly in &outcome.anomalies {
        super::print_warning(&format!(
            "Not recorded: {} ({})",
            anomaly.path, anomaly.detail
        ));
    }
    super::print_success(&format!(
        "Inventory of {} saved: {} file{}, {}",
        file_system.base_path.display(),
        outcome.stored.record_count,
        if outcome.stored.record_count == 1 { "" } else { "s" },
        format_size(outcome.stored.total_size)
    ));
    Ok(())
}
