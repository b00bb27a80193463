pub mod parser;
pub mod validator;

use crate::scanner::ScanOptions;
use crate::storage::InventoryStore;
use crate::utils::write_atomic;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Monitored trees and where their inventories and reports live
    #[serde(default)]
    pub file_systems: Vec<FileSystemConfig>,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,

    #[serde(default)]
    pub scanning: ScanningConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// One monitored base path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSystemConfig {
    pub base_path: PathBuf,
    /// Root of the inventory store for this base path
    pub inventory_path: PathBuf,
    /// Root under which reports are written
    pub report_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
    #[serde(default = "default_hash_buffer_size")]
    pub hash_buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanningConfig {
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
            hash_buffer_size: default_hash_buffer_size(),
        }
    }
}

impl Default for ScanningConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                "*.swp".to_string(),
            ],
            follow_symlinks: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot read or parse the configuration file
    /// - Configuration file contains invalid TOML or invalid values
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create default config if it doesn't exist
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        parser::parse_config_file(path)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)?;
        write_atomic(path, toml_str.as_bytes())
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Finds the configured file system containing `path`.
    ///
    /// When base paths nest, the innermost one wins.
    #[must_use]
    pub fn find_file_system(&self, path: &Path) -> Option<&FileSystemConfig> {
        self.file_systems
            .iter()
            .filter(|fs| path.starts_with(&fs.base_path))
            .max_by_key(|fs| fs.base_path.components().count())
    }

    /// Scanner settings for one file system
    #[must_use]
    pub fn scan_options(&self, file_system: &FileSystemConfig) -> ScanOptions {
        ScanOptions {
            follow_symlinks: self.scanning.follow_symlinks,
            ignore_patterns: self.scanning.ignore_patterns.clone(),
            buffer_size: self.performance.hash_buffer_size,
            excluded: vec![
                file_system.inventory_path.clone(),
                file_system.report_path.clone(),
            ],
        }
    }

    /// Inventory store for one file system
    #[must_use]
    pub fn inventory_store(&self, file_system: &FileSystemConfig) -> InventoryStore {
        InventoryStore::new(&file_system.inventory_path)
            .with_compression_level(self.storage.compression_level)
            .with_lock_timeout(Duration::from_secs(self.storage.lock_timeout_secs))
    }
}

mod num_cpus {
    use std::sync::LazyLock;

    static NUM_CPUS: LazyLock<usize> = LazyLock::new(|| {
        std::thread::available_parallelism()
            .map(std::num::NonZeroUsize::get)
            .unwrap_or(1)
    });

    pub fn get() -> usize {
        *NUM_CPUS
    }
}

// Default functions for serde
fn default_index_path() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("fixwatch")
        .join("reports.idx")
}

fn default_parallel_threads() -> usize {
    num_cpus::get().min(8)
}

const fn default_hash_buffer_size() -> usize {
    crate::fixity::DEFAULT_BUFFER_SIZE
}

const fn default_compression_level() -> i32 {
    3
}

const fn default_lock_timeout_secs() -> u64 {
    30
}
