//! Tests for loading configuration from the process environment.
//!
//! These mutate process-wide variables, so they run serially.

use std::time::Duration;

use kbchat::config::{
    ClientConfig, ConfigError, DEFAULT_BASE_URL, ENV_AGENT, ENV_PING_SECS, ENV_REFRESH_TOKEN,
    ENV_STRIP_PREFIX, ENV_TOKEN, ENV_URL,
};
use serial_test::serial;

const ALL_VARS: [&str; 6] = [
    ENV_URL,
    ENV_TOKEN,
    ENV_REFRESH_TOKEN,
    ENV_AGENT,
    ENV_PING_SECS,
    ENV_STRIP_PREFIX,
];

fn clear_env() {
    for name in ALL_VARS {
        std::env::remove_var(name);
    }
}

#[test]
#[serial]
fn test_from_env_without_variables() {
    clear_env();

    let config = ClientConfig::from_env().unwrap();
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
    assert!(config.access_token.is_none());
    assert_eq!(config.decoder.fragment_prefix_to_strip, Some(','));
}

#[test]
#[serial]
fn test_from_env_reads_every_variable() {
    clear_env();
    std::env::set_var(ENV_URL, "https://chat.example.com/");
    std::env::set_var(ENV_TOKEN, "env-token");
    std::env::set_var(ENV_REFRESH_TOKEN, "env-refresh");
    std::env::set_var(ENV_AGENT, "coder");
    std::env::set_var(ENV_PING_SECS, "0");
    std::env::set_var(ENV_STRIP_PREFIX, "none");

    let config = ClientConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.base_url, "https://chat.example.com");
    assert_eq!(config.access_token.as_deref(), Some("env-token"));
    assert_eq!(config.refresh_token.as_deref(), Some("env-refresh"));
    assert_eq!(config.agent.as_deref(), Some("coder"));
    assert_eq!(config.ping_interval, Duration::ZERO);
    assert_eq!(config.decoder.fragment_prefix_to_strip, None);
}

#[test]
#[serial]
fn test_from_env_rejects_bad_prefix() {
    clear_env();
    std::env::set_var(ENV_STRIP_PREFIX, "::");

    let result = ClientConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(ConfigError::InvalidPrefix { .. })));
}
