//! Public configuration for the marketplace client.

use std::time::Duration;

use nfa_core::{CredentialSettings, DEFAULT_SESSION_DURATION, MarketplaceApiMode, ProxySettings};

/// Fee sent with every session request, in wei.
pub const DEFAULT_FEE: &str = "300000000000";

/// Configuration for [`MarketplaceClient`](crate::MarketplaceClient).
///
/// # Example
///
/// ```
/// use nfa_marketplace::MarketplaceClientConfig;
/// use std::time::Duration;
///
/// let config = MarketplaceClientConfig::new("http://marketplace:9000", "http://consumer:8082")
///     .with_session_duration(Duration::from_secs(5400))
///     .with_retry_delay(Duration::from_millis(10));
/// ```
#[derive(Debug, Clone)]
pub struct MarketplaceClientConfig {
    pub(crate) marketplace_url: String,
    pub(crate) consumer_url: String,
    pub(crate) credentials: CredentialSettings,
    pub(crate) api_mode: MarketplaceApiMode,
    pub(crate) session_duration: Duration,
    pub(crate) fee: String,
    pub(crate) direct_payment: bool,
    pub(crate) failover: bool,
    /// Total attempts for retried calls, including the first.
    pub(crate) max_attempts: u8,
    /// Attempt `n` is followed by `n * retry_delay` before the next one.
    pub(crate) retry_delay: Duration,
    pub(crate) models_timeout: Duration,
    pub(crate) session_timeout: Duration,
    pub(crate) chat_timeout: Duration,
}

impl MarketplaceClientConfig {
    /// Defaults for the given marketplace and consumer node base URLs.
    pub fn new(marketplace_url: impl Into<String>, consumer_url: impl Into<String>) -> Self {
        Self {
            marketplace_url: marketplace_url.into(),
            consumer_url: consumer_url.into(),
            credentials: CredentialSettings::default(),
            api_mode: MarketplaceApiMode::Standard,
            session_duration: DEFAULT_SESSION_DURATION,
            fee: DEFAULT_FEE.to_string(),
            direct_payment: false,
            failover: false,
            max_attempts: 3,
            retry_delay: Duration::from_secs(1),
            models_timeout: Duration::from_secs(30),
            session_timeout: Duration::from_secs(60),
            chat_timeout: Duration::from_secs(5 * 60),
        }
    }

    /// Derive the client configuration from process settings.
    pub fn from_settings(settings: &ProxySettings) -> Self {
        Self::new(&settings.marketplace_url, &settings.consumer_node_url)
            .with_credentials(settings.credentials.clone())
            .with_api_mode(settings.api_mode)
            .with_session_duration(settings.session_duration)
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: CredentialSettings) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub const fn with_api_mode(mut self, mode: MarketplaceApiMode) -> Self {
        self.api_mode = mode;
        self
    }

    /// Duration requested for new sessions. Defaults to one hour.
    #[must_use]
    pub const fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    #[must_use]
    pub fn with_fee(mut self, fee: impl Into<String>) -> Self {
        self.fee = fee.into();
        self
    }

    #[must_use]
    pub const fn with_direct_payment(mut self, direct_payment: bool) -> Self {
        self.direct_payment = direct_payment;
        self
    }

    #[must_use]
    pub const fn with_failover(mut self, failover: bool) -> Self {
        self.failover = failover;
        self
    }

    /// Set the total number of attempts for retried calls.
    ///
    /// Defaults to 3. Values below 1 are treated as 1.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    /// Set the linear backoff step. Defaults to one second.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_models_timeout(mut self, timeout: Duration) -> Self {
        self.models_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_chat_timeout(mut self, timeout: Duration) -> Self {
        self.chat_timeout = timeout;
        self
    }

    /// Attempts used for session creation under the configured API mode.
    pub(crate) const fn session_attempts(&self) -> u8 {
        match self.api_mode {
            MarketplaceApiMode::Standard => self.max_attempts,
            MarketplaceApiMode::Simplified => 1,
        }
    }

    pub(crate) const fn uses_auth(&self) -> bool {
        matches!(self.api_mode, MarketplaceApiMode::Standard)
    }
}
