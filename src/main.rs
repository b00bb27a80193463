use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::{Generator, generate};
use colored::Colorize;
use fixwatch::cli::{Cli, Commands};
use fixwatch::output::{self, Verbosity};
use fixwatch::{FixwatchContext, commands};
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber; `FIXWATCH_LOG` overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("FIXWATCH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.quiet {
        output::set_verbosity(Verbosity::Quiet);
    } else if cli.verbose {
        output::set_verbosity(Verbosity::Verbose);
    }

    if let Commands::Completion { shell } = cli.command {
        print_completions(shell, &mut Cli::command());
        return Ok(());
    }

    let ctx = FixwatchContext::new()?;

    match cli.command {
        Commands::Populate {
            base_path,
            exists_ok,
        } => commands::populate::execute(&ctx, &base_path, exists_ok)?,
        Commands::Detect {
            path,
            no_report,
            include_unchanged,
        } => commands::detect::execute(&ctx, &path, no_report, include_unchanged)?,
        Commands::Update { report_path, yes } => {
            commands::update::execute(&ctx, &report_path, yes)?;
        }
        Commands::Note {
            report_path,
            text,
            user,
        } => commands::note::execute(&ctx, &report_path, &text, user)?,
        Commands::Confirm { report_path } => commands::confirm::execute(&ctx, &report_path)?,
        Commands::Show { report_path } => commands::show::execute(&report_path)?,
        Commands::Export {
            report_path,
            output,
        } => commands::export::execute(&report_path, output.as_deref())?,
        Commands::ListReports {
            limit,
            has_changes_only,
        } => commands::list_reports::execute(&ctx, limit, has_changes_only)?,
        Commands::Completion { .. } => {}
    }

    Ok(())
}

fn print_completions<G: Generator>(g: G, cmd: &mut clap::Command) {
    generate(g, cmd, cmd.get_name().to_string(), &mut io::stdout());
}
