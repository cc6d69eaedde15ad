//! Marketplace and consumer node client.

mod chat;
mod models;
mod sessions;

use reqwest::RequestBuilder;
use tokio::sync::OnceCell;
use url::Url;

use crate::config::MarketplaceClientConfig;
use crate::credentials::Credentials;
use crate::error::{ClientError, ClientResult};
use crate::http::RetryPolicy;

/// Client for the marketplace API and the consumer node chat endpoint.
///
/// Cheap to share behind an `Arc`; the underlying connection pool and the
/// resolved credentials are reused across calls.
#[derive(Debug)]
pub struct MarketplaceClient {
    http: reqwest::Client,
    config: MarketplaceClientConfig,
    marketplace_url: Url,
    consumer_url: Url,
    credentials: OnceCell<Credentials>,
}

impl MarketplaceClient {
    /// Build a client. Fails on malformed base URLs.
    pub fn new(config: MarketplaceClientConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("nfa-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            marketplace_url: Url::parse(&config.marketplace_url)?,
            consumer_url: Url::parse(&config.consumer_url)?,
            config,
            credentials: OnceCell::new(),
        })
    }

    pub const fn config(&self) -> &MarketplaceClientConfig {
        &self.config
    }

    /// Credentials, resolved on first use and cached for the client's lifetime.
    pub async fn credentials(&self) -> ClientResult<&Credentials> {
        let credentials = self
            .credentials
            .get_or_try_init(|| Credentials::load(&self.config.credentials))
            .await?;
        Ok(credentials)
    }

    /// `Authorization` header value, or `None` when the API mode skips auth.
    async fn authorization(&self) -> ClientResult<Option<String>> {
        if !self.config.uses_auth() {
            return Ok(None);
        }
        Ok(Some(self.credentials().await?.authorization_header()))
    }

    fn retry_policy(&self, max_attempts: u8) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: self.config.retry_delay,
        }
    }

    fn with_auth(request: RequestBuilder, authorization: Option<&str>) -> RequestBuilder {
        match authorization {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }
}

/// Append path `segments` to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ClientError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
