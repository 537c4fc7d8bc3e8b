//! Blizzard profile source.
//!
//! Supplies active spec, item level and equipped items from the Blizzard
//! profile API. Requests carry an OAuth bearer token from a shared
//! [`TokenCache`](rosterstat_fetch::TokenCache).

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::{BlizzardApi, character_slug, realm_slug};
pub use fetcher::BlizzardProfileFetcher;
pub use parser::{ProfileSummary, mean_item_level, resolve_item_level};
