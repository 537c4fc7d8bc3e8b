//! OAuth bearer token value.

use chrono::{DateTime, Duration, Utc};

/// A bearer token and its expiry.
///
/// Tokens are replaced on refresh, never edited.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    /// Opaque bearer value.
    pub value: String,
    /// Absolute expiry time.
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// Creates a token that expires `expires_in` after `issued_at`.
    pub fn issued(value: impl Into<String>, issued_at: DateTime<Utc>, expires_in: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: issued_at + expires_in,
        }
    }

    /// Returns true if the token is usable at `now` with `margin` to spare.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now < self.expires_at - margin
    }

    /// Returns true if the token is usable right now with `margin` to spare.
    pub fn is_fresh(&self, margin: Duration) -> bool {
        self.is_fresh_at(Utc::now(), margin)
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
