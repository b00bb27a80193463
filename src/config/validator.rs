use anyhow::Result;
use colored::Colorize;
use std::collections::HashSet;
use std::path::Path;

/// Fields allowed in each `[[file_systems]]` entry
const FILE_SYSTEM_FIELDS: [&str; 3] = ["base_path", "inventory_path", "report_path"];

/// Flags configuration keys fixwatch does not understand
pub struct ConfigValidator {
    /// Set of valid configuration fields that are recognized by fixwatch
    known_fields: HashSet<String>,
}

impl ConfigValidator {
    /// Create a new validator with known configuration fields
    #[must_use]
    pub fn new() -> Self {
        let known_fields = [
            "reports.index_path",
            "performance.parallel_threads",
            "performance.hash_buffer_size",
            "scanning.ignore_patterns",
            "scanning.follow_symlinks",
            "storage.compression_level",
            "storage.lock_timeout_secs",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self { known_fields }
    }

    /// Returns one warning per unknown field in `content`
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not valid TOML
    pub fn collect_warnings(&self, content: &str) -> Result<Vec<String>> {
        let parsed: toml::Value = toml::from_str(content)?;
        let mut unknown = Vec::new();
        self.check_table(&parsed, "", &mut unknown);
        Ok(unknown)
    }

    /// Validate a loaded configuration file and warn about issues
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub fn validate_config_file(&self, config_path: &Path) -> Result<()> {
        if !config_path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(config_path)?;
        let unknown = self.collect_warnings(&content)?;

        if !unknown.is_empty() {
            eprintln!("{}", "Configuration warnings:".yellow().bold());
            for field in unknown {
                eprintln!("  Unknown configuration field: {}", field.yellow());
            }
            eprintln!();
        }

        Ok(())
    }

    /// Recursively checks a TOML table for unknown fields
    fn check_table(&self, table: &toml::Value, prefix: &str, unknown: &mut Vec<String>) {
        let toml::Value::Table(map) = table else {
            return;
        };

        for (key, value) in map {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };

            if full_key == "file_systems" {
                Self::check_file_systems(value, unknown);
            } else if self.known_fields.contains(&full_key) {
                continue;
            } else if let toml::Value::Table(_) = value {
                self.check_table(value, &full_key, unknown);
            } else {
                unknown.push(full_key);
            }
        }
    }

    /// Validates the entries of the `[[file_systems]]` array
    fn check_file_systems(value: &toml::Value, unknown: &mut Vec<String>) {
        let toml::Value::Array(entries) = value else {
            unknown.push("file_systems".to_string());
            return;
        };

        for (index, entry) in entries.iter().enumerate() {
            if let toml::Value::Table(map) = entry {
                for key in map.keys() {
                    if !FILE_SYSTEM_FIELDS.contains(&key.as_str()) {
                        unknown.push(format!("file_systems[{index}].{key}"));
                    }
                }
            }
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
