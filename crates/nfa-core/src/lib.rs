#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod services;
pub mod settings;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    ActiveSession, CachedSession, ChatMessage, ModelList, ModelRecord, SessionGrant,
    UpstreamChatRequest,
};
pub use ports::{ByteStream, MarketplaceError, MarketplacePort};
pub use services::{
    DEFAULT_SWEEP_INTERVAL, MATCH_THRESHOLD, MODEL_CACHE_TTL, ModelResolver,
    NOT_REGISTERED_MESSAGE, ResolveError, SessionError, SessionStore,
};
pub use settings::{
    CredentialSettings, DEFAULT_API_PORT, DEFAULT_SESSION_DURATION, DEFAULT_SESSION_EXPIRATION,
    MarketplaceApiMode, ProxySettings, SettingsError, session_expiration_from,
};
pub use utils::{DurationParseError, levenshtein, parse_duration, similarity};
