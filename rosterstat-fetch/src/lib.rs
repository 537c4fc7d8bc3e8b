// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `RosterStat` Fetch
//!
//! Transport, retry and scheduling infrastructure for the `RosterStat`
//! aggregation pipeline.
//!
//! ## Transport
//!
//! - [`host::http`] - HTTP client with timeouts and response classification
//! - [`token::TokenCache`] - Lazily refreshed OAuth bearer token, single-flight
//! - [`retry::RetryPolicy`] - Bounded backoff, Retry-After aware, one token
//!   refresh per call on rejection
//!
//! ## Aggregation
//!
//! - [`source::SourceFetcher`] - Trait implemented once per upstream API
//! - [`aggregator::CharacterAggregator`] - Fans out every source for one
//!   character and merges the results
//! - [`pipeline::RosterPipeline`] - Bounded worker pool over the roster
//!
//! ## Example
//!
//! ```ignore
//! use rosterstat_fetch::{CharacterAggregator, FetchContext, RosterPipeline};
//!
//! let ctx = FetchContext::new()?;
//! let aggregator = CharacterAggregator::new(sources);
//! let pipeline = RosterPipeline::new(aggregator, ctx);
//!
//! let result = pipeline.run(&roster, 3).await?;
//! ```

// Core modules
pub mod aggregator;
pub mod cancel;
pub mod context;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod token;

// Re-export key types at crate root

// Errors
pub use error::FetchError;

// Transport
pub use host::http::{HttpClient, parse_retry_after};
pub use retry::{RetryOutcome, RetryPolicy};
pub use token::{ClientCredentials, TokenCache};

// Aggregation
pub use aggregator::{CharacterAggregator, CharacterOutcome};
pub use cancel::{CancelHandle, CancelSignal};
pub use context::{FetchContext, FetchContextBuilder, FetchSettings};
pub use pipeline::{MAX_CONCURRENCY, RosterPipeline};
pub use source::SourceFetcher;
