//! In-process services built on top of the ports.
//!
//! Both services own their caches and receive the marketplace port through
//! their constructor, so each test can build an isolated instance.

mod model_resolver;
mod session_store;

pub use model_resolver::{
    MATCH_THRESHOLD, MODEL_CACHE_TTL, ModelResolver, NOT_REGISTERED_MESSAGE, ResolveError,
    best_match,
};
pub use session_store::{DEFAULT_SWEEP_INTERVAL, SessionError, SessionStore};
