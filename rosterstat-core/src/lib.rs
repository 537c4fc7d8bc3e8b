// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterStat` Core
//!
//! Core types and models for the `RosterStat` aggregation pipeline.
//!
//! This crate provides the foundational data model shared by every other
//! `RosterStat` crate:
//!
//! - Roster input (characters, roles)
//! - Per-source partial records and their typed payloads
//! - The merged per-character record
//! - Run results, failures and summaries
//!
//! ## Key Types
//!
//! ### Roster
//! - [`RosterEntry`] - One character the pipeline is asked to fetch
//! - [`Role`] - Raid role, which also selects the combat-log metric
//!
//! ### Sources
//! - [`SourceKind`] - The three upstream data sources
//! - [`ErrorKind`] - Failure taxonomy shared by every source
//! - [`PartialRecord`] - One successful source fetch for one character
//! - [`SourcePayload`] - Typed fields produced by a source
//!
//! ### Records
//! - [`CharacterRecord`] - Merge target, one per roster entry
//! - [`RunResult`] - Output of a roster run
//! - [`RunSummary`] - Roster-wide averages and completeness counts

pub mod error;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Roster
    Role,
    RosterEntry,
    // Sources
    AllStarEntry,
    BossRanking,
    CombatLogData,
    EquippedItem,
    ErrorKind,
    MythicPlusData,
    PartialRecord,
    ProfileData,
    SourceKind,
    SourcePayload,
    // Records
    CharacterRecord,
    LogPerformance,
    resolve_spec,
    // Run
    AbortReason,
    RunResult,
    RunSummary,
    SourceFailure,
    // Auth
    Token,
};
