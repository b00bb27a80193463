use super::Config;
use crate::utils::expand_tilde;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Read, parse and validate a config file
pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    expand_paths(&mut config)?;
    // Validate and return validation errors directly without wrapping
    validate_config(&config)?;
    Ok(config)
}

fn expand(path: &Path) -> Result<PathBuf> {
    match path.to_str() {
        Some(raw) => expand_tilde(raw),
        None => Ok(path.to_path_buf()),
    }
}

fn expand_paths(config: &mut Config) -> Result<()> {
    for fs in &mut config.file_systems {
        fs.base_path = expand(&fs.base_path)?;
        fs.inventory_path = expand(&fs.inventory_path)?;
        fs.report_path = expand(&fs.report_path)?;
    }
    config.reports.index_path = expand(&config.reports.index_path)?;
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.storage.compression_level < 1 || config.storage.compression_level > 22 {
        anyhow::bail!("Compression level must be between 1 and 22");
    }

    if config.performance.parallel_threads == 0 {
        anyhow::bail!("Parallel threads must be at least 1");
    }

    if config.performance.hash_buffer_size < 512 {
        anyhow::bail!("Hash buffer size must be at least 512 bytes");
    }

    for pattern in &config.scanning.ignore_patterns {
        let glob = pattern.strip_suffix('/').unwrap_or(pattern);
        glob::Pattern::new(glob)
            .with_context(|| format!("Invalid ignore pattern: {pattern}"))?;
    }

    let mut seen = HashSet::new();
    for fs in &config.file_systems {
        for (name, path) in [
            ("base_path", &fs.base_path),
            ("inventory_path", &fs.inventory_path),
            ("report_path", &fs.report_path),
        ] {
            if !path.is_absolute() {
                anyhow::bail!("{name} must be an absolute path: {}", path.display());
            }
        }
        if !seen.insert(&fs.base_path) {
            anyhow::bail!(
                "Base path configured more than once: {}",
                fs.base_path.display()
            );
        }
    }

    Ok(())
}
