// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! RosterStat CLI - guild roster statistics from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Fetch the roster from the default config file
//! rosterstat
//!
//! # Use a specific config and more parallelism
//! rosterstat --config guild.json run --concurrency 6
//!
//! # JSON output
//! rosterstat --format json --pretty
//!
//! # Validate config and credentials without network access
//! rosterstat check
//! ```

mod commands;
mod config;
mod credentials;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, run};

// ============================================================================
// CLI Definition
// ============================================================================

/// RosterStat CLI - guild roster statistics.
#[derive(Parser)]
#[command(name = "rosterstat")]
#[command(about = "Guild roster statistics from Blizzard, Raider.IO and Warcraft Logs")]
#[command(long_about = r#"
RosterStat fetches item level, Mythic+ rating and raid log performance for
every character in a roster, merging partial results when a source fails.

Credentials are read from the environment:
  BLIZZARD_CLIENT_ID, BLIZZARD_CLIENT_SECRET    (required)
  WCL_CLIENT_ID, WCL_CLIENT_SECRET              (Warcraft Logs, optional)
  WCL_ACCESS_TOKEN                              (Warcraft Logs, optional)

Examples:
  rosterstat                         # Run with the default config file
  rosterstat --config guild.json     # Run with a specific config file
  rosterstat --format json           # JSON output
  rosterstat check                   # Validate config and credentials
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'run' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (defaults to the user config directory).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Returns the config path to load.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(config::Config::default_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the roster (default if no command specified).
    #[command(visible_alias = "r")]
    Run(run::RunArgs),

    /// Validate the config file and credentials.
    Check,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success, possibly with per-source failures.
    Success = 0,
    /// General error.
    Error = 1,
    /// Config file or credentials invalid.
    ConfigError = 2,
    /// The run was aborted (timeout or auth provider down).
    Aborted = 3,
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("rosterstat=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rosterstat=warn"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Run(args)) => run::run(args, &cli).await,
        Some(Commands::Check) => check::run(&cli),
        None => run::run(&run::RunArgs::default(), &cli).await,
    };

    match result {
        Ok(ExitCode::Success) => Ok(()),
        Ok(code) => std::process::exit(code as i32),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            let code = if e.downcast_ref::<config::ConfigError>().is_some() {
                ExitCode::ConfigError
            } else {
                ExitCode::Error
            };
            std::process::exit(code as i32);
        }
    }
}
