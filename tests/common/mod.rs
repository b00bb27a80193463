#![allow(dead_code)]

use anyhow::Result;
use fixwatch::FixwatchContext;
use fixwatch::config::{Config, FileSystemConfig};
use fixwatch::inventory::InventoryManager;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Monitored tree fixture with its own store, report root and config file
pub struct TestTree {
    pub temp_dir: TempDir,
    pub ctx: FixwatchContext,
}

impl TestTree {
    /// Creates an empty base path configured as the only file system
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        let base_path = root.join("data");
        fs::create_dir_all(&base_path)?;

        let mut config = Config::default();
        config.file_systems.push(FileSystemConfig {
            base_path,
            inventory_path: root.join("inventory"),
            report_path: root.join("reports"),
        });
        config.reports.index_path = root.join("reports.idx");
        config.performance.parallel_threads = 2;

        let config_path = root.join("config.toml");
        config.save(&config_path)?;
        let ctx = FixwatchContext::new_explicit(config_path)?;

        Ok(Self { temp_dir, ctx })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn base_path(&self) -> &Path {
        &self.ctx.config.file_systems[0].base_path
    }

    pub fn config_path(&self) -> &Path {
        &self.ctx.config_path
    }

    pub fn inventory_path(&self) -> &Path {
        &self.ctx.config.file_systems[0].inventory_path
    }

    pub fn report_root(&self) -> &Path {
        &self.ctx.config.file_systems[0].report_path
    }

    pub fn manager(&self) -> InventoryManager {
        InventoryManager::for_file_system(&self.ctx.config, &self.ctx.config.file_systems[0])
    }

    /// Writes `content` at `relative` under the base path, creating parents
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.base_path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn remove(&self, relative: &str) -> Result<()> {
        fs::remove_file(self.base_path().join(relative))?;
        Ok(())
    }

    /// Every file under the store, with its bytes, in path order
    pub fn store_bytes(&self) -> Result<Vec<(PathBuf, Vec<u8>)>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(self.inventory_path()).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && entry.file_name() != "inventory.lock" {
                files.push((entry.path().to_path_buf(), fs::read(entry.path())?));
            }
        }
        Ok(files)
    }
}
