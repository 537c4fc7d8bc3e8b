//! Domain models for `RosterStat`.
//!
//! ## Submodules
//!
//! - [`roster`] - Roster input (`RosterEntry`, `Role`)
//! - [`source`] - Source kinds, error taxonomy and partial records
//! - [`record`] - The merged `CharacterRecord` and spec precedence
//! - [`run`] - Run output (`RunResult`, `SourceFailure`, `RunSummary`)
//! - [`token`] - OAuth bearer token value

mod record;
mod roster;
mod run;
mod source;
mod token;

// Re-export everything at the models level
pub use record::{CharacterRecord, LogPerformance, resolve_spec};
pub use roster::{Role, RosterEntry};
pub use run::{AbortReason, RunResult, RunSummary, SourceFailure};
pub use source::{
    AllStarEntry, BossRanking, CombatLogData, EquippedItem, ErrorKind, MythicPlusData,
    PartialRecord, ProfileData, SourceKind, SourcePayload,
};
pub use token::Token;
