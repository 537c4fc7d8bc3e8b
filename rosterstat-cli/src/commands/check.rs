//! Check command - validate config and credentials without network access.

use anyhow::Result;
use serde::Serialize;

use crate::config::Config;
use crate::credentials;
use crate::output::JsonFormatter;
use crate::{Cli, ExitCode, OutputFormat};

#[derive(Debug, Serialize)]
struct CheckOutput {
    config: String,
    region: String,
    locale: String,
    characters: usize,
    concurrency: usize,
    warcraftlogs: bool,
}

/// Runs the check command.
pub fn run(cli: &Cli) -> Result<ExitCode> {
    let path = cli.config_path();
    let config = Config::load_from(&path)?;
    let credentials = credentials::from_env()?;

    let output = CheckOutput {
        config: path.display().to_string(),
        region: config.sources.region(),
        locale: config.sources.locale.clone(),
        characters: config.roster.len(),
        concurrency: config.concurrency,
        warcraftlogs: credentials.warcraftlogs.is_some(),
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            println!("Config:        {}", output.config);
            println!("Region:        {} ({})", output.region, output.locale);
            println!("Characters:    {}", output.characters);
            println!("Concurrency:   {}", output.concurrency);
            println!(
                "Warcraft Logs: {}",
                if output.warcraftlogs { "enabled" } else { "disabled" }
            );
        }
    }

    Ok(ExitCode::Success)
}
