//! Model handle resolution.
//!
//! Clients name models loosely ("gpt4", "GPT-4 "). The resolver fetches the
//! marketplace listing, picks the closest name by [`similarity`] and caches
//! the outcome per handle for an hour.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::ModelRecord;
use crate::ports::{MarketplaceError, MarketplacePort};
use crate::utils::similarity;

/// How long a resolved handle stays cached.
pub const MODEL_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Minimum similarity for a model name to match a handle.
pub const MATCH_THRESHOLD: f64 = 0.8;

/// Client-facing message for every handle validation failure.
pub const NOT_REGISTERED_MESSAGE: &str = "No Supported Model Has Been Registered";

/// Errors from model resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("model handle cannot be empty")]
    EmptyHandle,

    #[error("no matching model found for '{handle}'")]
    NoMatch { handle: String },

    #[error("failed to fetch models: {0}")]
    Fetch(#[source] MarketplaceError),

    /// Normalized form returned by [`ModelResolver::validate_handle`].
    #[error("No Supported Model Has Been Registered")]
    NotRegistered,
}

#[derive(Debug, Clone)]
struct CachedModel {
    record: ModelRecord,
    created: Instant,
}

/// Resolves model handles to marketplace records.
pub struct ModelResolver {
    marketplace: Arc<dyn MarketplacePort>,
    cache: RwLock<HashMap<String, CachedModel>>,
    ttl: Duration,
}

impl fmt::Debug for ModelResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelResolver")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl ModelResolver {
    /// Create a resolver with the standard one hour cache.
    pub fn new(marketplace: Arc<dyn MarketplacePort>) -> Self {
        Self {
            marketplace,
            cache: RwLock::new(HashMap::new()),
            ttl: MODEL_CACHE_TTL,
        }
    }

    /// Resolve `handle` to the best matching marketplace model.
    pub async fn resolve(&self, handle: &str) -> Result<ModelRecord, ResolveError> {
        let handle = handle.trim();
        if handle.is_empty() {
            return Err(ResolveError::EmptyHandle);
        }

        if let Some(record) = self.cached(handle).await {
            debug!(handle, model_id = %record.id, "Model cache hit");
            return Ok(record);
        }

        debug!(handle, "Model cache miss, fetching marketplace listing");
        let models = self
            .marketplace
            .list_models()
            .await
            .map_err(ResolveError::Fetch)?;

        let Some((record, score)) = best_match(handle, &models) else {
            return Err(ResolveError::NoMatch {
                handle: handle.to_string(),
            });
        };
        if score < MATCH_THRESHOLD {
            debug!(handle, closest = %record.name, score, "Closest model below threshold");
            return Err(ResolveError::NoMatch {
                handle: handle.to_string(),
            });
        }

        info!(handle, model_id = %record.id, model_name = %record.name, score, "Resolved model handle");
        let record = record.clone();
        self.cache.write().await.insert(
            handle.to_string(),
            CachedModel {
                record: record.clone(),
                created: Instant::now(),
            },
        );
        Ok(record)
    }

    /// Resolve `handle` and return only the marketplace id.
    pub async fn resolve_model_id(&self, handle: &str) -> Result<String, ResolveError> {
        self.resolve(handle).await.map(|record| record.id)
    }

    /// Resolve `handle` for a client request.
    ///
    /// Internal failures (fetch errors, empty handles, weak matches) are
    /// logged and collapsed into [`ResolveError::NotRegistered`].
    pub async fn validate_handle(&self, handle: &str) -> Result<String, ResolveError> {
        match self.resolve_model_id(handle).await {
            Ok(id) => Ok(id),
            Err(ResolveError::NotRegistered) => Err(ResolveError::NotRegistered),
            Err(e) => {
                warn!(handle, error = %e, "Model handle validation failed");
                Err(ResolveError::NotRegistered)
            }
        }
    }

    /// Number of cached handles, including stale ones not yet replaced.
    pub async fn cached_handles(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn cached(&self, handle: &str) -> Option<ModelRecord> {
        let cache = self.cache.read().await;
        cache
            .get(handle)
            .filter(|entry| entry.created.elapsed() < self.ttl)
            .map(|entry| entry.record.clone())
    }
}

/// Pick the model whose name is most similar to `handle`.
///
/// Ties keep the first model in list order. Models scoring 0.0 never match.
pub fn best_match<'a>(handle: &str, models: &'a [ModelRecord]) -> Option<(&'a ModelRecord, f64)> {
    let mut best: Option<(&ModelRecord, f64)> = None;
    for model in models {
        let score = similarity(handle, &model.name);
        let current = best.map_or(0.0, |(_, s)| s);
        if score > current {
            best = Some((model, score));
        }
    }
    best
}
