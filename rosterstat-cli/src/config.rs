//! Configuration file loading.
//!
//! The config is a single JSON document. Every section has defaults, so a
//! file holding only a `roster` array is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rosterstat_core::{CoreError, RosterEntry};
use rosterstat_fetch::{FetchSettings, MAX_CONCURRENCY, RetryPolicy};
use rosterstat_sources::{SourceError, SourceSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while loading or validating the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Config file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the expected shape.
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A value is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A required environment variable is unset or blank.
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    /// A roster entry failed validation.
    #[error(transparent)]
    Roster(#[from] CoreError),

    /// Source settings were rejected.
    #[error(transparent)]
    Sources(#[from] SourceError),
}

// ============================================================================
// Config
// ============================================================================

/// Retry settings in config units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per request, including the first.
    pub max_attempts: u32,
    /// Backoff after the first failure.
    pub base_delay_ms: u64,
    /// Backoff cap.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Region, locale, season and endpoint overrides.
    #[serde(flatten)]
    pub sources: SourceSettings,
    /// Characters fetched in parallel.
    pub concurrency: usize,
    /// Overall run timeout. `None` disables it.
    pub run_timeout_secs: Option<u64>,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
    /// Per-request retry policy.
    pub retry: RetryConfig,
    /// Extra whole-character passes when item level and logs are missing.
    pub character_retries: u32,
    /// Delay between whole-character passes.
    pub character_retry_delay_ms: u64,
    /// Characters to fetch.
    pub roster: Vec<RosterEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: SourceSettings::default(),
            concurrency: 3,
            run_timeout_secs: None,
            request_timeout_secs: 15,
            retry: RetryConfig::default(),
            character_retries: 2,
            character_retry_delay_ms: 2_000,
            roster: Vec::new(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("rosterstat")
            .join("config.json")
    }

    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing, unreadable, not valid
    /// JSON, or fails validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        info!(
            path = %path.display(),
            characters = config.roster.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and other variants
    /// for validation failures.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges and every roster entry.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "concurrency must be between 1 and {MAX_CONCURRENCY}, got {}",
                self.concurrency
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.run_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "run_timeout_secs must be positive when set".to_string(),
            ));
        }
        if self.roster.is_empty() {
            return Err(ConfigError::Invalid("roster is empty".to_string()));
        }
        for entry in &self.roster {
            entry.validate()?;
        }
        debug!(region = %self.sources.region(), "Configuration valid");
        Ok(())
    }

    /// Builds the retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_attempts)
            .with_base_delay(Duration::from_millis(self.retry.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    /// Converts the config into pipeline settings.
    pub fn to_fetch_settings(&self) -> FetchSettings {
        FetchSettings::default()
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_retry(self.retry_policy())
            .with_concurrency(self.concurrency)
            .with_character_retries(
                self.character_retries,
                Duration::from_millis(self.character_retry_delay_ms),
            )
            .with_run_timeout(self.run_timeout_secs.map(Duration::from_secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
