//! Raider.IO Mythic+ source.
//!
//! Public REST API, no authentication.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::RaiderIoApi;
pub use fetcher::RaiderIoFetcher;
