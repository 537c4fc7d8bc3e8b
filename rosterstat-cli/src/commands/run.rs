//! Run command - fetch the roster and print the result.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use rosterstat_core::RunResult;
use rosterstat_fetch::{CharacterAggregator, FetchContext, RosterPipeline};
use rosterstat_sources::SourceRegistry;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::credentials;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the run command.
#[derive(Args, Default)]
pub struct RunArgs {
    /// Characters fetched in parallel (overrides the config).
    #[arg(long, short = 'n')]
    pub concurrency: Option<usize>,

    /// Overall run timeout in seconds (overrides the config).
    #[arg(long)]
    pub timeout: Option<u64>,
}

/// Runs the roster.
///
/// Returns [`ExitCode::Aborted`] when the run stopped early; per-source
/// failures alone still succeed.
pub async fn run(args: &RunArgs, cli: &Cli) -> Result<ExitCode> {
    let config = load_config(args, cli)?;
    let credentials = credentials::from_env()?;

    let ctx = FetchContext::with_settings(config.to_fetch_settings())
        .context("Failed to create HTTP client")?;
    let set = SourceRegistry::build(&config.sources, &credentials, Arc::clone(&ctx.http))
        .map_err(ConfigError::from)?;
    debug!(sources = ?set.kinds(), "Sources ready");

    let pipeline = RosterPipeline::new(CharacterAggregator::new(set.into_fetchers()), ctx);
    let result = pipeline
        .run_default(&config.roster)
        .await
        .map_err(ConfigError::from)?;

    let elapsed = (result.finished_at - result.started_at)
        .to_std()
        .unwrap_or(Duration::ZERO);
    info!(
        characters = result.records.len(),
        failures = result.failures.len(),
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Run finished"
    );

    print_result(&result, cli)?;

    if let Some(reason) = &result.aborted {
        warn!(reason = %reason, "Run aborted");
        return Ok(ExitCode::Aborted);
    }
    Ok(ExitCode::Success)
}

/// Loads the config file and applies command-line overrides.
fn load_config(args: &RunArgs, cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = Config::load_from(&cli.config_path())?;

    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(timeout) = args.timeout {
        config.run_timeout_secs = Some(timeout);
    }
    if args.concurrency.is_some() || args.timeout.is_some() {
        config.validate()?;
    }

    Ok(config)
}

fn print_result(result: &RunResult, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_run(result)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_run(result));
        }
    }
    Ok(())
}
