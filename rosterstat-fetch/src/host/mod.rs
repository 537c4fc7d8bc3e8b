//! Host APIs used by source fetchers.
//!
//! - [`http`] - HTTP client with timeouts and response classification

pub mod http;
