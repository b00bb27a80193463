//! Command-line interface definitions for fixwatch.
//!
//! This module contains all CLI argument parsing structures using clap's derive macros.
//! The CLI definitions are shared between the main binary and build tools (like xtask)
//! for man page generation.
//!
//! Note: Field-level documentation is provided via clap attributes,
//! so we allow missing_docs for this module to avoid redundant documentation.

#![allow(missing_docs)]

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Main CLI structure for fixwatch.
#[derive(Parser)]
#[command(
    name = "fixwatch",
    version = crate::VERSION,
    about = "Fixity-based file inventory with drift detection",
    long_about = "Keeps a SHA-256 inventory of file trees and reports additions, deletions, \
                  moves and content changes"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Show verbose output and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// All available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Record the initial inventory of a configured base path
    Populate {
        /// Configured base path to inventory
        base_path: PathBuf,

        /// Overwrite an existing inventory
        #[arg(long)]
        exists_ok: bool,
    },

    /// Compare a tree against its inventory and write a report
    Detect {
        /// Base path, or a directory inside one, to check
        path: PathBuf,

        /// Print the summary without writing a report file
        #[arg(long)]
        no_report: bool,

        /// Include unchanged files in the report
        #[arg(long)]
        include_unchanged: bool,
    },

    /// Apply a report to the inventory
    Update {
        /// Report file to apply
        report_path: PathBuf,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Attach a note to a report
    Note {
        /// Report file to annotate
        report_path: PathBuf,

        /// Note text
        text: String,

        /// Author recorded with the note (defaults to the current user)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Mark a report as reviewed so it can be applied
    Confirm {
        /// Report file to confirm
        report_path: PathBuf,
    },

    /// Show a report
    Show {
        /// Report file to show
        report_path: PathBuf,
    },

    /// Export a report's changes as tab-separated values
    Export {
        /// Report file to export
        report_path: PathBuf,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List written reports, newest first
    ListReports {
        /// Maximum number of reports to list
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only list reports with changes or anomalies
        #[arg(long)]
        has_changes_only: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
