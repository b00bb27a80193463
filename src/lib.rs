#![warn(missing_docs)]
// Allow pedantic strict lints that create false positives in this codebase
#![allow(clippy::arithmetic_side_effects)] // Simple counters and size calculations cannot overflow
#![allow(clippy::float_arithmetic)] // Required for file size formatting
#![allow(clippy::indexing_slicing)] // Bounds checked by logic

//! # Fixwatch - Fixity-Based File Inventory
//!
//! Fixwatch keeps a durable, content-addressed inventory of a file tree and detects drift
//! between that inventory and the live filesystem: additions, deletions, moves, content
//! changes and files that could not be read.
//!
//! ## Features
//!
//! - **SHA-256 Fixity**: Every file is fingerprinted by streaming its full content
//! - **Move Detection**: Deleted and added files with identical content become moves
//! - **Reviewed Updates**: Reports carry notes and must be confirmed before they are applied
//! - **Atomic Storage**: Inventories are written with temp-file + rename under a writer lock
//! - **Parallel Processing**: Uses Rayon for hashing
//! - **Compression**: Zstandard compressed bincode inventories
//!
//! ## Architecture
//!
//! The codebase is organized into several key modules:
//!
//! - [`fixity`]: Per-file content fingerprints
//! - [`scanner`]: Filesystem traversal into snapshots
//! - [`storage`]: Snapshot model and the durable inventory store
//! - [`diff`]: Change classification and move correlation
//! - [`report`]: Report model, report index and export
//! - [`workflow`]: Note, confirm and apply transitions
//! - [`inventory`]: High-level operations per base path
//! - [`commands`]: Command implementations
//! - [`config`]: Configuration parsing and validation
//! - [`output`]: Output formatting and styling
//!
//! ## Example Usage
//!
//! ```no_run
//! use fixwatch::FixwatchContext;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = FixwatchContext::new()?;
//!
//! // Record the current state of a configured tree
//! fixwatch::commands::populate::execute(&ctx, Path::new("/archive"), false)?;
//!
//! // Later: compare the tree against the inventory and write a report
//! fixwatch::commands::detect::execute(&ctx, Path::new("/archive"), false, false)?;
//! # Ok(())
//! # }
//! ```

/// Command-line interface definitions (argument parsing structures).
pub mod cli;

/// Commands module containing all CLI command implementations.
pub mod commands;

/// Configuration parsing, validation, and management.
pub mod config;

/// Change classification between snapshots.
pub mod diff;

/// Typed errors of the inventory core.
pub mod error;

/// Content fingerprints for single files.
pub mod fixity;

/// High-level populate, detect and apply operations.
pub mod inventory;

/// Exclusive write locking for inventories.
pub mod lock;

/// Output formatting and styling.
pub mod output;

/// Detected-change reports.
pub mod report;

/// Filesystem scanning into snapshots.
pub mod scanner;

/// Snapshot model and durable inventory storage.
pub mod storage;

/// Utility functions and helpers.
pub mod utils;

/// Report review and apply state machine.
pub mod workflow;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Current version of the fixwatch binary.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file path relative to home directory.
pub const DEFAULT_CONFIG_PATH: &str = ".config/fixwatch/config.toml";

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "FIXWATCH_CONFIG_PATH";

/// Central context for all fixwatch commands.
///
/// Holds the configuration and the interaction settings commands need.
///
/// # Examples
///
/// ```no_run
/// use fixwatch::FixwatchContext;
///
/// # fn main() -> anyhow::Result<()> {
/// // Create context with the default config path
/// let ctx = FixwatchContext::new()?;
///
/// // Create context with a custom config (for testing)
/// let ctx = FixwatchContext::new_explicit("/tmp/test_config.toml".into())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FixwatchContext {
    /// Path to the configuration file.
    pub config_path: PathBuf,

    /// Loaded configuration settings.
    pub config: config::Config,

    /// Whether to run in non-interactive mode (no prompts).
    /// Used primarily for testing to prevent stdin reads.
    pub non_interactive: bool,
}

impl FixwatchContext {
    /// Creates a new `FixwatchContext` by loading the configuration from the default path.
    ///
    /// `$FIXWATCH_CONFIG_PATH` takes precedence over `~/.config/fixwatch/config.toml`.
    ///
    /// # Errors
    /// Returns an error if the home directory cannot be determined or if the configuration
    /// file cannot be read or created.
    pub fn new() -> Result<Self> {
        let config_path = if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            PathBuf::from(path)
        } else {
            let home = dirs::home_dir().context("Could not find home directory")?;
            home.join(DEFAULT_CONFIG_PATH)
        };

        let config = config::Config::load(&config_path)?;

        // Validate configuration and warn about issues
        let validator = config::validator::ConfigValidator::new();
        if let Err(e) = validator.validate_config_file(&config_path) {
            eprintln!("Warning: Configuration validation failed: {e}");
        }

        // Configure thread pool based on config
        if let Err(e) = utils::thread_pool::configure_from_config(&config) {
            eprintln!("Warning: Failed to configure thread pool: {e}");
        }

        Ok(Self {
            config_path,
            config,
            non_interactive: false,
        })
    }

    /// Creates a non-interactive `FixwatchContext` from an explicit config path.
    /// This avoids the need for environment variable manipulation.
    ///
    /// # Errors
    /// Returns an error if the configuration cannot be loaded or created.
    pub fn new_explicit(config_path: PathBuf) -> Result<Self> {
        let config = config::Config::load(&config_path)?;
        Ok(Self {
            config_path,
            config,
            non_interactive: true,
        })
    }

    /// Creates a context around an in-memory configuration.
    #[must_use]
    pub const fn with_config(config_path: PathBuf, config: config::Config) -> Self {
        Self {
            config_path,
            config,
            non_interactive: true,
        }
    }
}
