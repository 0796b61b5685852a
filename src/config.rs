//! Quiz API client configuration
//!
//! The client reads its settings from the process environment, after
//! loading a `.env` file if one is present.

use std::env;

use dotenvy::dotenv;
use web_time::Duration;

use crate::error::{Error, Result};

/// Environment variable holding the base URL of the quiz API
pub const API_URL_VAR: &str = "QUIZ_API_URL";

/// Environment variable holding the request timeout in seconds
pub const TIMEOUT_VAR: &str = "QUIZ_API_TIMEOUT_SECS";

/// Request timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for [`crate::client::QuizClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the quiz API, without a trailing slash
    pub api_base_url: String,
    /// Timeout applied to every request
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Creates a configuration for `api_base_url` with the default timeout
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url.into()),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads the configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is missing or the timeout
    /// is not a whole number of seconds.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let api_base_url = get_env(&lookup, API_URL_VAR)?;
        let request_timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => Duration::from_secs(parse_timeout(&raw)?),
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            api_base_url: normalize_base_url(api_base_url),
            request_timeout,
        })
    }
}

fn get_env<F: Fn(&str) -> Option<String>>(lookup: F, name: &str) -> Result<String> {
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("Missing environment variable: {name}")))
}

fn parse_timeout(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|e| Error::Config(format!("Invalid value for {TIMEOUT_VAR}: {e}")))
}

fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_new_strips_trailing_slashes() {
        let config = ClientConfig::new("https://api.example.com//");

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.request_timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(" 30 ").unwrap(), 30);
        assert!(matches!(parse_timeout("soon"), Err(Error::Config(_))));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_get_env_missing() {
        let error = get_env(lookup(&[]), "PROCTOR_TEST_VARIABLE").unwrap_err();
        assert!(error.to_string().contains("PROCTOR_TEST_VARIABLE"));

        let error = get_env(lookup(&[("PROCTOR_TEST_VARIABLE", "  ")]), "PROCTOR_TEST_VARIABLE");
        assert!(matches!(error, Err(Error::Config(_))));
    }

    #[test]
    fn test_from_lookup_uses_default_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[(API_URL_VAR, "https://api.example.com/")]))
            .unwrap();

        assert_eq!(config, ClientConfig::new("https://api.example.com"));
    }

    #[test]
    fn test_from_lookup_reads_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://api.example.com"),
            (TIMEOUT_VAR, "25"),
        ]))
        .unwrap();

        assert_eq!(config.request_timeout, Duration::from_secs(25));
    }

    #[test]
    fn test_from_lookup_requires_base_url() {
        let error = ClientConfig::from_lookup(lookup(&[(TIMEOUT_VAR, "25")])).unwrap_err();

        assert!(error.to_string().contains(API_URL_VAR));
    }

    #[test]
    fn test_from_lookup_rejects_bad_timeout() {
        let error = ClientConfig::from_lookup(lookup(&[
            (API_URL_VAR, "https://api.example.com"),
            (TIMEOUT_VAR, "ten"),
        ]))
        .unwrap_err();

        assert!(error.to_string().contains(TIMEOUT_VAR));
    }
}
