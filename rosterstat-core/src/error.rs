//! Core error types for `RosterStat`.

use thiserror::Error;

/// Core error type for `RosterStat` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Role string did not match any known role.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Roster entry is missing required data.
    #[error("Invalid roster entry: {0}")]
    InvalidRosterEntry(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
