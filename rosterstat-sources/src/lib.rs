// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterStat` Sources
//!
//! One [`SourceFetcher`](rosterstat_fetch::SourceFetcher) per upstream API.
//! Each source module includes:
//!
//! - **Api**: Request construction, sent through the retry policy
//! - **Parser**: Response parsing, tolerant of alternate shapes
//! - **Fetcher**: The `SourceFetcher` implementation
//!
//! ## Sources
//!
//! | Source | API | Auth | Fields |
//! |--------|-----|------|--------|
//! | Profile | Blizzard profile REST | OAuth client credentials | spec, item level, equipment |
//! | Mythic+ | Raider.IO REST | none | rating, season |
//! | Combat log | Warcraft Logs GraphQL | OAuth or static token | rankings, all stars, spec |
//!
//! ## Usage
//!
//! ```ignore
//! use rosterstat_sources::{SourceRegistry, SourceSettings};
//!
//! let set = SourceRegistry::build(&settings, &credentials, ctx.http.clone())?;
//! let aggregator = CharacterAggregator::new(set.into_fetchers());
//! ```

pub mod error;
pub mod registry;
pub mod settings;

// Source modules (alphabetical)
pub mod blizzard;
pub mod raiderio;
pub mod warcraftlogs;


// Re-export key types
pub use error::SourceError;
pub use registry::{SourceRegistry, SourceSet};
pub use settings::{Endpoints, SourceCredentials, SourceSettings, WarcraftLogsAuth};

pub use blizzard::BlizzardProfileFetcher;
pub use raiderio::RaiderIoFetcher;
pub use warcraftlogs::WarcraftLogsFetcher;
