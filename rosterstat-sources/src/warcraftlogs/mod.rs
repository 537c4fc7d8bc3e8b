//! Warcraft Logs combat-log source.
//!
//! Queries the v2 GraphQL API for a character's zone rankings. The request
//! authenticates with an OAuth client-credentials token or a pre-issued
//! bearer token.

mod api;
mod fetcher;
pub(crate) mod parser;

pub use api::{WarcraftLogsApi, WarcraftLogsToken};
pub use fetcher::WarcraftLogsFetcher;
