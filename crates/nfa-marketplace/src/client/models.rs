//! Model listing.

use nfa_core::{ModelList, ModelRecord};
use reqwest::header::ACCEPT;
use tracing::debug;

use super::{MarketplaceClient, endpoint};
use crate::error::{ClientError, ClientResult};
use crate::http::send_with_retry;

impl MarketplaceClient {
    /// `GET {marketplace}/blockchain/models`.
    pub async fn fetch_models(&self) -> ClientResult<Vec<ModelRecord>> {
        let url = endpoint(&self.marketplace_url, &["blockchain", "models"])?;
        let authorization = self.authorization().await?;
        let policy = self.retry_policy(self.config.max_attempts);

        let body = send_with_retry("models request", policy, || {
            let request = self
                .http
                .get(url.clone())
                .header(ACCEPT, "application/json")
                .timeout(self.config.models_timeout);
            Self::with_auth(request, authorization.as_deref())
        })
        .await?;

        let list: ModelList = serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
            context: "models response",
            message: e.to_string(),
        })?;
        debug!(count = list.models.len(), "Fetched marketplace models");
        Ok(list.models)
    }
}
