//! Source setup errors.

use thiserror::Error;

/// Errors raised while building the source set.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A setting is empty or malformed.
    #[error("Invalid source settings: {0}")]
    InvalidSettings(String),

    /// Required credentials are missing or empty.
    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),
}
