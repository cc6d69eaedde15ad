//! Verbatim forwarding of `/blockchain/models` routes to the marketplace.

use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::debug;

use crate::error::HttpError;

/// Timeout for a passthrough round trip.
pub const PASSTHROUGH_TIMEOUT: Duration = Duration::from_secs(10);

/// Headers that should NOT be forwarded (hop-by-hop headers).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    // Recomputed for the new connection
    "host",
    "content-length",
];

/// Check if a header should be forwarded.
fn should_forward_header(name: &str) -> bool {
    let lower = name.to_lowercase();
    !HOP_BY_HOP_HEADERS.contains(&lower.as_str())
}

fn filtered(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| should_forward_header(name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Forwards requests to the marketplace unchanged.
#[derive(Debug, Clone)]
pub struct Passthrough {
    client: reqwest::Client,
    base_url: String,
}

impl Passthrough {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PASSTHROUGH_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Forward `method uri` with `headers` and `body`, returning upstream's
    /// status, headers and body.
    pub async fn forward(
        &self,
        method: Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, HttpError> {
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        let url = format!("{}{}", self.base_url, path_and_query);
        debug!(%method, %url, "Forwarding to marketplace");

        let response = self
            .client
            .request(method, &url)
            .headers(filtered(headers))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let headers = filtered(response.headers());
        let bytes = response.bytes().await?;
        debug!(status = status.as_u16(), len = bytes.len(), "Marketplace responded");

        let mut builder = Response::builder().status(status);
        if let Some(target) = builder.headers_mut() {
            target.extend(headers);
        }
        Ok(builder
            .body(Body::from(bytes))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
    }
}
