//! Process configuration.
//!
//! Loaded once at startup from the environment (after the binary has applied
//! any `.env` file) and read-only afterwards.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::utils::{DurationParseError, parse_duration};

/// Default listen port for the proxy.
pub const DEFAULT_API_PORT: u16 = 8081;

/// Default marketplace session duration.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(60 * 60);

/// Default reuse window for an open session.
pub const DEFAULT_SESSION_EXPIRATION: Duration = Duration::from_secs(1800);

/// Shortest reuse window accepted from the environment.
const MIN_SESSION_EXPIRATION_SECS: u64 = 60;

/// Default location of the `user:password` credentials file.
pub const DEFAULT_COOKIE_PATH: &str = ".cookie";

/// Which marketplace session API the upstream speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MarketplaceApiMode {
    /// Authenticated session creation with a JSON payload and retries.
    #[default]
    Standard,
    /// Legacy variant: bare POST, no credentials, a single attempt.
    Simplified,
}

impl FromStr for MarketplaceApiMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standard" => Ok(Self::Standard),
            "simplified" => Ok(Self::Simplified),
            other => Err(SettingsError::InvalidApiMode(other.to_string())),
        }
    }
}

impl fmt::Display for MarketplaceApiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Simplified => f.write_str("simplified"),
        }
    }
}

/// Where Basic-Auth credentials come from.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSettings {
    /// File holding `user:password`; consulted first.
    pub cookie_path: PathBuf,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            cookie_path: PathBuf::from(DEFAULT_COOKIE_PATH),
            username: None,
            password: None,
        }
    }
}

impl fmt::Debug for CredentialSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSettings")
            .field("cookie_path", &self.cookie_path)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid port '{value}' in {key}")]
    InvalidPort { key: &'static str, value: String },

    #[error("invalid {key}: {source}")]
    InvalidDuration {
        key: &'static str,
        #[source]
        source: DurationParseError,
    },

    #[error("unknown marketplace API mode '{0}' (expected 'standard' or 'simplified')")]
    InvalidApiMode(String),
}

/// Proxy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    /// Consumer node base URL; chat completions are forwarded here.
    pub consumer_node_url: String,
    /// Marketplace base URL for model listing and session creation.
    pub marketplace_url: String,
    pub port: u16,
    /// Duration requested when opening a marketplace session.
    pub session_duration: Duration,
    /// How long an open session is reused for its model.
    pub session_expiration: Duration,
    pub credentials: CredentialSettings,
    pub api_mode: MarketplaceApiMode,
    /// Whether the background session sweep runs.
    pub sweep_enabled: bool,
}

impl ProxySettings {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to read variables. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let consumer_node_url = get("CONSUMER_NODE_URL")
            .map(|url| normalize_url(&url))
            .ok_or(SettingsError::Missing("CONSUMER_NODE_URL"))?;
        let marketplace_url = get("MARKETPLACE_URL")
            .map_or_else(|| consumer_node_url.clone(), |url| normalize_url(&url));

        let port = match (get("PORT"), get("INTERNAL_API_PORT")) {
            (Some(value), _) => parse_port("PORT", &value)?,
            (None, Some(value)) => parse_port("INTERNAL_API_PORT", &value)?,
            (None, None) => DEFAULT_API_PORT,
        };

        let session_duration = match get("SESSION_DURATION") {
            Some(value) => parse_duration(&value).map_err(|source| {
                SettingsError::InvalidDuration {
                    key: "SESSION_DURATION",
                    source,
                }
            })?,
            None => DEFAULT_SESSION_DURATION,
        };

        let session_expiration =
            session_expiration_from(get("SESSION_EXPIRATION_SECONDS").as_deref());

        let credentials = CredentialSettings {
            cookie_path: get("COOKIE_FILE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_COOKIE_PATH), PathBuf::from),
            username: get("CONSUMER_USERNAME"),
            password: get("CONSUMER_PASSWORD"),
        };

        let api_mode = match get("MARKETPLACE_API_MODE") {
            Some(value) => value.parse()?,
            None => MarketplaceApiMode::default(),
        };

        let sweep_enabled = get("SESSION_SWEEP").is_none_or(|value| {
            !matches!(
                value.to_ascii_lowercase().as_str(),
                "false" | "0" | "off" | "no"
            )
        });

        Ok(Self {
            consumer_node_url,
            marketplace_url,
            port,
            session_duration,
            session_expiration,
            credentials,
            api_mode,
            sweep_enabled,
        })
    }
}

/// Interpret `SESSION_EXPIRATION_SECONDS`.
///
/// Missing means the default. Values that are not integers or are below one
/// minute fall back to the default with a warning.
pub fn session_expiration_from(value: Option<&str>) -> Duration {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return DEFAULT_SESSION_EXPIRATION;
    };

    match raw.parse::<u64>() {
        Ok(secs) if secs >= MIN_SESSION_EXPIRATION_SECS => Duration::from_secs(secs),
        Ok(secs) => {
            warn!(
                value = secs,
                minimum = MIN_SESSION_EXPIRATION_SECS,
                default = DEFAULT_SESSION_EXPIRATION.as_secs(),
                "SESSION_EXPIRATION_SECONDS too small, using default"
            );
            DEFAULT_SESSION_EXPIRATION
        }
        Err(_) => {
            warn!(
                value = raw,
                default = DEFAULT_SESSION_EXPIRATION.as_secs(),
                "SESSION_EXPIRATION_SECONDS is not an integer, using default"
            );
            DEFAULT_SESSION_EXPIRATION
        }
    }
}

fn parse_port(key: &'static str, value: &str) -> Result<u16, SettingsError> {
    value
        .parse::<u16>()
        .ok()
        .filter(|port| *port != 0)
        .ok_or_else(|| SettingsError::InvalidPort {
            key,
            value: value.to_string(),
        })
}

fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ProxySettings, SettingsError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ProxySettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = load(&[("CONSUMER_NODE_URL", "http://consumer:8082/")]).unwrap();
        assert_eq!(settings.consumer_node_url, "http://consumer:8082");
        assert_eq!(settings.marketplace_url, "http://consumer:8082");
        assert_eq!(settings.port, DEFAULT_API_PORT);
        assert_eq!(settings.session_duration, DEFAULT_SESSION_DURATION);
        assert_eq!(settings.session_expiration, DEFAULT_SESSION_EXPIRATION);
        assert_eq!(settings.credentials.cookie_path, PathBuf::from(".cookie"));
        assert_eq!(settings.api_mode, MarketplaceApiMode::Standard);
        assert!(settings.sweep_enabled);
    }

    #[test]
    fn test_consumer_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CONSUMER_NODE_URL environment variable is required"
        );
        assert!(matches!(
            load(&[("CONSUMER_NODE_URL", "  ")]),
            Err(SettingsError::Missing("CONSUMER_NODE_URL"))
        ));
    }

    #[test]
    fn test_port_precedence() {
        let settings = load(&[
            ("CONSUMER_NODE_URL", "http://c"),
            ("PORT", "9001"),
            ("INTERNAL_API_PORT", "9002"),
        ])
        .unwrap();
        assert_eq!(settings.port, 9001);

        let settings = load(&[("CONSUMER_NODE_URL", "http://c"), ("INTERNAL_API_PORT", "9002")])
            .unwrap();
        assert_eq!(settings.port, 9002);

        assert!(matches!(
            load(&[("CONSUMER_NODE_URL", "http://c"), ("PORT", "http")]),
            Err(SettingsError::InvalidPort { key: "PORT", .. })
        ));
    }

    #[test]
    fn test_session_duration() {
        let settings = load(&[
            ("CONSUMER_NODE_URL", "http://c"),
            ("SESSION_DURATION", "1h30m"),
        ])
        .unwrap();
        assert_eq!(settings.session_duration, Duration::from_secs(5400));

        let err = load(&[("CONSUMER_NODE_URL", "http://c"), ("SESSION_DURATION", "soon")])
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidDuration { .. }));
    }

    #[test]
    fn test_session_expiration_fallbacks() {
        assert_eq!(session_expiration_from(None), DEFAULT_SESSION_EXPIRATION);
        assert_eq!(
            session_expiration_from(Some("600")),
            Duration::from_secs(600)
        );
        assert_eq!(session_expiration_from(Some("60")), Duration::from_secs(60));
        assert_eq!(
            session_expiration_from(Some("59")),
            DEFAULT_SESSION_EXPIRATION
        );
        assert_eq!(
            session_expiration_from(Some("half an hour")),
            DEFAULT_SESSION_EXPIRATION
        );
        assert_eq!(
            session_expiration_from(Some("-5")),
            DEFAULT_SESSION_EXPIRATION
        );
    }

    #[test]
    fn test_marketplace_url_and_credentials() {
        let settings = load(&[
            ("CONSUMER_NODE_URL", "http://c"),
            ("MARKETPLACE_URL", "http://market:9000/"),
            ("COOKIE_FILE_PATH", "/run/secrets/cookie"),
            ("CONSUMER_USERNAME", "admin"),
            ("CONSUMER_PASSWORD", "hunter2"),
        ])
        .unwrap();
        assert_eq!(settings.marketplace_url, "http://market:9000");
        assert_eq!(
            settings.credentials.cookie_path,
            PathBuf::from("/run/secrets/cookie")
        );
        assert_eq!(settings.credentials.username.as_deref(), Some("admin"));

        let debug = format!("{:?}", settings.credentials);
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_api_mode_and_sweep() {
        let settings = load(&[
            ("CONSUMER_NODE_URL", "http://c"),
            ("MARKETPLACE_API_MODE", "Simplified"),
            ("SESSION_SWEEP", "off"),
        ])
        .unwrap();
        assert_eq!(settings.api_mode, MarketplaceApiMode::Simplified);
        assert!(!settings.sweep_enabled);

        assert!(matches!(
            load(&[("CONSUMER_NODE_URL", "http://c"), ("MARKETPLACE_API_MODE", "v3")]),
            Err(SettingsError::InvalidApiMode(_))
        ));
    }
}
