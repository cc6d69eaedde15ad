//! Wire types for the OpenAI-compatible front.

use nfa_core::ChatMessage;
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/chat/completions`.
///
/// `stream` is accepted but ignored: responses are always streamed.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    /// Amount to stake in wei when a new session has to be opened.
    #[serde(default)]
    pub stake_amount: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

/// Error response matching OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: None,
            },
        }
    }

    /// Create an error response with a code.
    pub fn with_code(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: Some(code.into()),
            },
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_code(message, "invalid_request_error", "invalid_request")
    }

    pub fn model_not_found(message: impl Into<String>) -> Self {
        Self::with_code(message, "invalid_request_error", "model_not_found")
    }

    /// Upstream refused the request.
    pub fn upstream_rejected(message: impl Into<String>) -> Self {
        Self::with_code(message, "upstream_error", "upstream_rejected")
    }

    /// Upstream could not be reached or kept failing.
    pub fn upstream_error(message: impl Into<String>) -> Self {
        Self::with_code(message, "server_error", "upstream_error")
    }
}
