//! Basic-Auth credentials for the consumer node.

use std::fmt;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nfa_core::CredentialSettings;
use thiserror::Error;
use tracing::debug;

/// Failure to find usable credentials.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    #[error("CONSUMER_USERNAME environment variable is required")]
    MissingUsername,

    #[error("no credentials found in cookie file or environment")]
    NotFound,
}

/// A username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Resolve credentials from the cookie file, then the configured pair.
    ///
    /// The cookie file must contain exactly `user:password`. A missing,
    /// unreadable or malformed file falls through to the configured values.
    pub async fn load(settings: &CredentialSettings) -> Result<Self, CredentialsError> {
        if let Some(credentials) = read_cookie_file(&settings.cookie_path).await {
            debug!(path = %settings.cookie_path.display(), "Using credentials from cookie file");
            return Ok(credentials);
        }

        let username = settings
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(CredentialsError::MissingUsername)?;
        let password = settings
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(CredentialsError::NotFound)?;

        debug!("Using credentials from environment");
        Ok(Self::new(username, password))
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

async fn read_cookie_file(path: &Path) -> Option<Credentials> {
    let contents = tokio::fs::read_to_string(path).await.ok()?;
    let parts: Vec<&str> = contents.trim().split(':').collect();
    match parts.as_slice() {
        [username, password] => Some(Credentials::new(*username, *password)),
        _ => {
            debug!(path = %path.display(), "Ignoring malformed cookie file");
            None
        }
    }
}
