//! Session records.
//!
//! Two namespaces exist: [`ActiveSession`] is keyed by model id and drives
//! per-model reuse, [`CachedSession`] is keyed by session token and lets a
//! client that already holds a token skip model resolution.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Result of opening a session on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    /// Session identifier returned by the marketplace.
    pub session_token: String,
    /// Wall-clock expiry derived from the configured session duration.
    pub expires_at: DateTime<Utc>,
}

/// The live session for a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub session_id: String,
    pub model_id: String,
    pub created_at: Instant,
}

impl ActiveSession {
    pub fn new(session_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            model_id: model_id.into(),
            created_at: Instant::now(),
        }
    }

    /// Time since the session was created.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the session can still be reused under `window`.
    pub fn is_fresh(&self, window: Duration) -> bool {
        self.age() < window
    }
}

/// A session remembered under its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSession {
    pub session_id: String,
    pub model_id: String,
    pub expires_at: Instant,
}

impl CachedSession {
    /// Cache `session_id` for `model_id`, valid for `ttl` from now.
    pub fn new(session_id: impl Into<String>, model_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            session_id: session_id.into(),
            model_id: model_id.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
