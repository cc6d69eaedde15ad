//! Session creation.

use chrono::Utc;
use nfa_core::{MarketplaceApiMode, SessionGrant};
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{MarketplaceClient, endpoint};
use crate::error::{ClientError, ClientResult};
use crate::http::send_with_retry;

/// Body of `POST /blockchain/models/{id}/session`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest<'a> {
    /// Whole seconds, as a string.
    session_duration: String,
    direct_payment: bool,
    failover: bool,
    fee: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stake: Option<&'a str>,
}

/// Standard mode answers `sessionID`, simplified mode `sessionId`.
#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(rename = "sessionID", alias = "sessionId")]
    session_id: String,
}

impl MarketplaceClient {
    /// `POST {marketplace}/blockchain/models/{model_id}/session`.
    pub async fn create_session(
        &self,
        model_id: &str,
        stake: Option<&str>,
    ) -> ClientResult<SessionGrant> {
        let url = endpoint(
            &self.marketplace_url,
            &["blockchain", "models", model_id, "session"],
        )?;
        let authorization = self.authorization().await?;
        let policy = self.retry_policy(self.config.session_attempts());

        let payload = match self.config.api_mode {
            MarketplaceApiMode::Standard => Some(SessionRequest {
                session_duration: self.config.session_duration.as_secs().to_string(),
                direct_payment: self.config.direct_payment,
                failover: self.config.failover,
                fee: &self.config.fee,
                stake,
            }),
            MarketplaceApiMode::Simplified => None,
        };

        let body = send_with_retry("session creation", policy, || {
            let mut request = self
                .http
                .post(url.clone())
                .header(ACCEPT, "application/json")
                .timeout(self.config.session_timeout);
            if let Some(payload) = &payload {
                request = request.json(payload);
            }
            Self::with_auth(request, authorization.as_deref())
        })
        .await?;

        let response: SessionResponse =
            serde_json::from_slice(&body).map_err(|e| ClientError::Decode {
                context: "session response",
                message: e.to_string(),
            })?;
        if response.session_id.is_empty() {
            return Err(ClientError::Decode {
                context: "session response",
                message: "empty session id".to_string(),
            });
        }

        let ttl = chrono::Duration::from_std(self.config.session_duration)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        info!(model_id, session_id = %response.session_id, "Created marketplace session");
        Ok(SessionGrant {
            session_token: response.session_id,
            expires_at: Utc::now() + ttl,
        })
    }
}
