//! Session reuse and token caching.
//!
//! The store keeps two maps behind separate locks:
//!
//! - **active**: one [`ActiveSession`] per model id, reused while younger
//!   than the expiration window.
//! - **tokens**: [`CachedSession`] entries keyed by session token, so a
//!   client presenting a known `session_id` header skips resolution.
//!
//! Neither lock is held across a marketplace call. Two cold requests for the
//! same model may therefore both open a session; the last one to finish wins
//! the active slot, and both tokens stay valid in the token cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{ActiveSession, CachedSession};
use crate::ports::{MarketplaceError, MarketplacePort};

/// How often the background sweep runs.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Errors from session establishment.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create session for model {model_id}: {source}")]
    Create {
        model_id: String,
        #[source]
        source: MarketplaceError,
    },
}

impl SessionError {
    /// The marketplace failure behind this error.
    pub const fn marketplace_error(&self) -> &MarketplaceError {
        match self {
            Self::Create { source, .. } => source,
        }
    }
}

/// In-memory session cache shared by all request handlers.
pub struct SessionStore {
    marketplace: Arc<dyn MarketplacePort>,
    window: Duration,
    active: Mutex<HashMap<String, ActiveSession>>,
    tokens: RwLock<HashMap<String, CachedSession>>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store whose sessions are reused for `window`.
    pub fn new(marketplace: Arc<dyn MarketplacePort>, window: Duration) -> Self {
        Self {
            marketplace,
            window,
            active: Mutex::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// The reuse window.
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Return the live session for `model_id`, opening one if needed.
    pub async fn ensure_session(
        &self,
        model_id: &str,
        stake: Option<&str>,
    ) -> Result<ActiveSession, SessionError> {
        {
            let mut active = self.active.lock().await;
            if let Some(existing) = active.get(model_id) {
                if existing.is_fresh(self.window) {
                    debug!(model_id, session_id = %existing.session_id, "Reusing active session");
                    return Ok(existing.clone());
                }
                debug!(model_id, "Active session expired, evicting");
                active.remove(model_id);
            }
        }

        let grant = self
            .marketplace
            .open_session(model_id, stake)
            .await
            .map_err(|source| SessionError::Create {
                model_id: model_id.to_string(),
                source,
            })?;

        let session = ActiveSession::new(grant.session_token, model_id);
        self.remember_token(&session.session_id, model_id).await;
        self.active
            .lock()
            .await
            .insert(model_id.to_string(), session.clone());

        info!(model_id, session_id = %session.session_id, "Opened new session");
        Ok(session)
    }

    /// Always open a fresh session and cache its token.
    ///
    /// The per-model active slot is left untouched.
    pub async fn open_session(
        &self,
        model_id: &str,
        stake: Option<&str>,
    ) -> Result<CachedSession, SessionError> {
        let grant = self
            .marketplace
            .open_session(model_id, stake)
            .await
            .map_err(|source| SessionError::Create {
                model_id: model_id.to_string(),
                source,
            })?;

        Ok(self.remember_token(&grant.session_token, model_id).await)
    }

    /// Look up a session by token. Expired entries are removed.
    pub async fn lookup_token(&self, token: &str) -> Option<CachedSession> {
        {
            let tokens = self.tokens.read().await;
            match tokens.get(token) {
                None => return None,
                Some(cached) if !cached.is_expired() => return Some(cached.clone()),
                Some(_) => {}
            }
        }

        let mut tokens = self.tokens.write().await;
        // Re-check under the write lock; the token may have been refreshed.
        if tokens.get(token).is_some_and(CachedSession::is_expired) {
            debug!(session_id = token, "Cached session expired, evicting");
            tokens.remove(token);
            return None;
        }
        tokens.get(token).cloned()
    }

    /// Evict expired sessions from both maps and return how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let window = self.window;
        let evicted_active = {
            let mut active = self.active.lock().await;
            let before = active.len();
            active.retain(|_, session| session.is_fresh(window));
            before - active.len()
        };
        let evicted_tokens = {
            let mut tokens = self.tokens.write().await;
            let before = tokens.len();
            tokens.retain(|_, cached| !cached.is_expired());
            before - tokens.len()
        };

        let evicted = evicted_active + evicted_tokens;
        if evicted > 0 {
            info!(
                active = evicted_active,
                tokens = evicted_tokens,
                "Swept expired sessions"
            );
        }
        evicted
    }

    /// Number of models with a session in the active map.
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Number of tokens in the token cache.
    pub async fn cached_token_count(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Current active session for `model_id`, fresh or not.
    pub async fn active_session(&self, model_id: &str) -> Option<ActiveSession> {
        self.active.lock().await.get(model_id).cloned()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `every` until `cancel` fires.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        every: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(interval_secs = every.as_secs(), "Starting session sweeper");

            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Session sweeper cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        store.sweep_expired().await;
                    }
                }
            }
        })
    }

    async fn remember_token(&self, session_id: &str, model_id: &str) -> CachedSession {
        let cached = CachedSession::new(session_id, model_id, self.window);
        self.tokens
            .write()
            .await
            .insert(session_id.to_string(), cached.clone());
        cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticMarketplace;

    const WINDOW: Duration = Duration::from_secs(60);

    fn store() -> (Arc<StaticMarketplace>, Arc<SessionStore>) {
        let market = Arc::new(StaticMarketplace::new());
        let store = Arc::new(SessionStore::new(market.clone(), WINDOW));
        (market, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_session_reuses_within_window() {
        let (market, store) = store();

        let first = store.ensure_session("model1", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second = store.ensure_session("model1", None).await.unwrap();

        assert_eq!(first.session_id, second.session_id);
        assert_eq!(market.session_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_session_replaces_stale_entry() {
        let (market, store) = store();

        let first = store.ensure_session("model1", None).await.unwrap();
        tokio::time::advance(WINDOW).await;
        let second = store.ensure_session("model1", None).await.unwrap();

        assert_ne!(first.session_id, second.session_id);
        assert_eq!(market.session_calls(), 2);
        assert_eq!(store.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_ensure_session_registers_token() {
        let (_, store) = store();

        let session = store.ensure_session("model1", Some("1000")).await.unwrap();
        let cached = store.lookup_token(&session.session_id).await.unwrap();
        assert_eq!(cached.model_id, "model1");
    }

    #[tokio::test]
    async fn test_ensure_session_failure_stores_nothing() {
        let market = Arc::new(StaticMarketplace::new().failing_sessions("service unavailable"));
        let store = SessionStore::new(market, WINDOW);

        let err = store.ensure_session("model1", None).await.unwrap_err();
        assert!(matches!(
            err.marketplace_error(),
            MarketplaceError::RetriesExhausted { .. }
        ));
        assert_eq!(store.active_count().await, 0);
        assert_eq!(store.cached_token_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_session_always_creates() {
        let (market, store) = store();

        let a = store.open_session("model1", None).await.unwrap();
        let b = store.open_session("model1", None).await.unwrap();

        assert_ne!(a.session_id, b.session_id);
        assert_eq!(market.session_calls(), 2);
        assert_eq!(store.cached_token_count().await, 2);
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_open_session_forwards_stake() {
        let (market, store) = store();

        store.open_session("model1", Some("500")).await.unwrap();
        assert_eq!(market.last_stake().as_deref(), Some("500"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_token_evicts_expired() {
        let (_, store) = store();

        let cached = store.open_session("model1", None).await.unwrap();
        assert!(store.lookup_token(&cached.session_id).await.is_some());

        tokio::time::advance(WINDOW).await;
        assert!(store.lookup_token(&cached.session_id).await.is_none());
        assert_eq!(store.cached_token_count().await, 0);
    }

    #[tokio::test]
    async fn test_lookup_unknown_token() {
        let (_, store) = store();
        assert!(store.lookup_token("missing").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_only_expired() {
        let (_, store) = store();

        store.ensure_session("old-model", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        store.ensure_session("new-model", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        // old-model is 65s old, new-model 20s; one active entry and one token go.
        assert_eq!(store.sweep_expired().await, 2);
        assert!(store.active_session("old-model").await.is_none());
        assert!(store.active_session("new-model").await.is_some());
        assert_eq!(store.cached_token_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_on_interval() {
        let (_, store) = store();
        let cancel = CancellationToken::new();
        let handle = store.spawn_sweeper(DEFAULT_SWEEP_INTERVAL, cancel.clone());

        store.ensure_session("model1", None).await.unwrap();
        assert_eq!(store.active_count().await, 1);

        tokio::time::sleep(DEFAULT_SWEEP_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(store.active_count().await, 0);
        assert_eq!(store.cached_token_count().await, 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_cancel() {
        let (_, store) = store();
        let cancel = CancellationToken::new();
        let handle = store.spawn_sweeper(Duration::from_secs(3600), cancel.clone());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
