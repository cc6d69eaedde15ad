//! Mapping of request failures to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use nfa_core::{MarketplaceError, ResolveError, SessionError};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// A request failure, before anything was streamed to the caller.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error(transparent)]
    ModelNotFound(#[from] ResolveError),

    #[error("Error creating session: {0}")]
    Session(#[from] SessionError),

    #[error("Error forwarding request: {0}")]
    Upstream(#[from] MarketplaceError),

    #[error("Failed to forward request: {0}")]
    Passthrough(#[from] reqwest::Error),
}

impl HttpError {
    /// Status code and body for this error.
    pub fn to_parts(&self) -> (StatusCode, ErrorResponse) {
        let message = self.to_string();
        match self {
            Self::InvalidRequest(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::invalid_request(message),
            ),
            Self::ModelNotFound(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::model_not_found(message),
            ),
            Self::Session(e) => classify(e.marketplace_error(), message),
            Self::Upstream(e) => classify(e, message),
            Self::Passthrough(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::upstream_error(message),
            ),
        }
    }
}

fn classify(err: &MarketplaceError, message: String) -> (StatusCode, ErrorResponse) {
    match err {
        MarketplaceError::Rejected(_) => (
            StatusCode::BAD_REQUEST,
            ErrorResponse::upstream_rejected(message),
        ),
        MarketplaceError::Unauthorized(_) | MarketplaceError::ChatRejected { .. } => (
            StatusCode::BAD_GATEWAY,
            ErrorResponse::upstream_rejected(message),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::upstream_error(message),
        ),
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_parts();
        error!(status = status.as_u16(), error = %self, "Request failed");
        (status, Json(body)).into_response()
    }
}
