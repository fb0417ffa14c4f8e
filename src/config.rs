//! Client configuration.
//!
//! Built from defaults, then `KBCHAT_*` environment variables, then CLI flags.
//!
//! ```ignore
//! use kbchat::config::ClientConfig;
//!
//! let config = ClientConfig::from_env()?
//!     .with_base_url("http://localhost:8000")
//!     .with_ping_interval(Duration::from_secs(30));
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::stream::DecoderConfig;

/// Backend URL used when `KBCHAT_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// How often an open chat pings the backend to keep its session alive.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(60);

pub const ENV_URL: &str = "KBCHAT_URL";
pub const ENV_TOKEN: &str = "KBCHAT_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "KBCHAT_REFRESH_TOKEN";
pub const ENV_AGENT: &str = "KBCHAT_AGENT";
pub const ENV_PING_SECS: &str = "KBCHAT_PING_SECS";
pub const ENV_STRIP_PREFIX: &str = "KBCHAT_STRIP_PREFIX";

/// Invalid configuration value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a whole number of seconds, got '{value}'")]
    InvalidSeconds { name: &'static str, value: String },

    #[error("{name} must be a single character or 'none', got '{value}'")]
    InvalidPrefix { name: &'static str, value: String },

    #[error("{name} must start with http:// or https://, got '{value}'")]
    InvalidUrl { name: &'static str, value: String },
}

/// Settings shared by the client and the CLI.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend root, without the `/api` suffix
    pub base_url: String,
    /// Bearer token sent with every request
    pub access_token: Option<String>,
    /// Used to renew the bearer token once the backend rejects it
    pub refresh_token: Option<String>,
    /// Agent used for new messages; `None` lets the CLI pick the first model
    pub agent: Option<String>,
    /// Keepalive interval while a chat is open
    pub ping_interval: Duration,
    /// Wire format of streamed answers
    pub decoder: DecoderConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            refresh_token: None,
            agent: None,
            ping_interval: DEFAULT_PING_INTERVAL,
            decoder: DecoderConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a ClientConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backend URL. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the bearer token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Set the agent used for new messages.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set the keepalive interval.
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the stream wire format.
    pub fn with_decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }

    /// Create config from `KBCHAT_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_URL).filter(|v| !v.is_empty()) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    name: ENV_URL,
                    value: url,
                });
            }
            config = config.with_base_url(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|v| !v.is_empty()) {
            config = config.with_access_token(token);
        }
        if let Some(token) = lookup(ENV_REFRESH_TOKEN).filter(|v| !v.is_empty()) {
            config = config.with_refresh_token(token);
        }
        if let Some(agent) = lookup(ENV_AGENT).filter(|v| !v.is_empty()) {
            config = config.with_agent(agent);
        }
        if let Some(secs) = lookup(ENV_PING_SECS) {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSeconds {
                    name: ENV_PING_SECS,
                    value: secs.clone(),
                })?;
            config = config.with_ping_interval(Duration::from_secs(secs));
        }
        if let Some(prefix) = lookup(ENV_STRIP_PREFIX) {
            config.decoder = config.decoder.with_prefix(parse_prefix(&prefix)?);
        }

        Ok(config)
    }
}

/// Parse a fragment prefix setting: one character, or `none`/empty for no stripping.
pub fn parse_prefix(value: &str) -> Result<Option<char>, ConfigError> {
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Some(c)),
        _ => Err(ConfigError::InvalidPrefix {
            name: ENV_STRIP_PREFIX,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.access_token.is_none());
        assert!(config.refresh_token.is_none());
        assert!(config.agent.is_none());
        assert_eq!(config.ping_interval, Duration::from_secs(60));
        assert_eq!(config.decoder.fragment_prefix_to_strip, Some(','));
    }

    #[test]
    fn test_builder_chain() {
        let config = ClientConfig::new()
            .with_base_url("https://chat.example.com/")
            .with_access_token("tok")
            .with_agent("coder")
            .with_ping_interval(Duration::from_secs(5));
        assert_eq!(config.base_url, "https://chat.example.com");
        assert_eq!(config.access_token.as_deref(), Some("tok"));
        assert_eq!(config.agent.as_deref(), Some("coder"));
        assert_eq!(config.ping_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_all_vars() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_URL, "http://10.0.0.2:8000"),
            (ENV_TOKEN, "abc"),
            (ENV_AGENT, "default"),
            (ENV_PING_SECS, "15"),
            (ENV_STRIP_PREFIX, "none"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.access_token.as_deref(), Some("abc"));
        assert_eq!(config.agent.as_deref(), Some("default"));
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.decoder.fragment_prefix_to_strip, None);
    }

    #[test]
    fn test_from_lookup_empty_values_ignored() {
        let config =
            ClientConfig::from_lookup(lookup(&[(ENV_URL, ""), (ENV_TOKEN, "")])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_from_lookup_bad_seconds() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_PING_SECS, "soon")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidSeconds {
                name: ENV_PING_SECS,
                value: "soon".to_string()
            }
        );
    }

    #[test]
    fn test_from_lookup_bad_url() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_URL, "localhost:8000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn test_parse_prefix() {
        assert_eq!(parse_prefix(","), Ok(Some(',')));
        assert_eq!(parse_prefix(""), Ok(None));
        assert_eq!(parse_prefix("NONE"), Ok(None));
        assert!(parse_prefix(",,").is_err());
    }
}
