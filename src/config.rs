//! Client configuration
//!
//! The API key is passed explicitly into the client instead of living in
//! process-wide state. [`ClientConfig::from_env`] covers the common case of
//! reading it from the environment.

use crate::error::{RemoveBgError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default API base, including the version segment
pub const DEFAULT_BASE_URL: &str = "https://api.remove.bg/v1.0";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "REMOVEBG_API_KEY";
/// Environment variable overriding the base URL
pub const BASE_URL_ENV: &str = "REMOVEBG_BASE_URL";
/// Environment variable holding the request timeout in milliseconds
pub const TIMEOUT_ENV: &str = "REMOVEBG_TIMEOUT_MS";

/// How the processed image is returned by the removal endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEncoding {
    /// JSON body with `result_b64` (`Accept: application/json`)
    #[default]
    Json,
    /// Raw image body (`Accept: image/*`)
    Binary,
}

impl ResponseEncoding {
    #[must_use]
    pub fn accept_header(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Binary => "image/*, application/zip",
        }
    }
}

/// Configuration for [`crate::RemoveBgClient`]
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key sent as `X-Api-Key`
    pub api_key: String,

    /// Base URL without trailing slash
    pub base_url: String,

    /// Request timeout in milliseconds (None = no timeout)
    pub timeout_ms: Option<u64>,

    /// Encoding requested by `remove_background`
    pub response_encoding: ResponseEncoding,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("response_encoding", &self.response_encoding)
            .finish()
    }
}

fn redact(key: &str) -> String {
    if key.len() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", key.get(key.len() - 4..).unwrap_or_default())
    }
}

impl ClientConfig {
    /// Create a configuration builder
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Configuration with defaults and the given key
    pub fn new<S: Into<String>>(api_key: S) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// Read `REMOVEBG_API_KEY`, `REMOVEBG_BASE_URL` and `REMOVEBG_TIMEOUT_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV).ok_or_else(|| {
            RemoveBgError::invalid_config(format!("{} is not set", API_KEY_ENV))
        })?;

        let mut builder = Self::builder().api_key(api_key);
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            builder = builder.base_url(base_url);
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let timeout_ms = raw.trim().parse::<u64>().map_err(|_| {
                RemoveBgError::invalid_config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    TIMEOUT_ENV, raw
                ))
            })?;
            builder = builder.timeout_ms(timeout_ms);
        }
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RemoveBgError::invalid_config("API key cannot be empty"));
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(RemoveBgError::invalid_config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_ms == Some(0) {
            return Err(RemoveBgError::invalid_config(
                "Timeout must be greater than 0 ms",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Full URL of an endpoint below the base, e.g. `removebg`
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClientConfig {
                api_key: String::new(),
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_ms: None,
                response_encoding: ResponseEncoding::default(),
            },
        }
    }

    #[must_use]
    pub fn api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    #[must_use]
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.config.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = Some(timeout_ms);
        self
    }

    #[must_use]
    pub fn response_encoding(mut self, encoding: ResponseEncoding) -> Self {
        self.config.response_encoding = encoding;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("key-123").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout().is_none());
        assert_eq!(config.response_encoding, ResponseEncoding::Json);
        assert_eq!(config.endpoint("removebg"), "https://api.remove.bg/v1.0/removebg");
    }

    #[test]
    fn test_validation() {
        assert!(ClientConfig::new("").is_err());
        assert!(ClientConfig::new("   ").is_err());
        assert!(ClientConfig::builder()
            .api_key("k")
            .base_url("ftp://api.remove.bg")
            .build()
            .is_err());
        assert!(ClientConfig::builder().api_key("k").timeout_ms(0).build().is_err());
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let config = ClientConfig::builder()
            .api_key("k")
            .base_url("http://localhost:8080/v1.0/")
            .timeout_ms(1500)
            .build()
            .unwrap();
        assert_eq!(config.endpoint("/account"), "http://localhost:8080/v1.0/account");
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, "abcdef"),
            (TIMEOUT_ENV, "2500"),
        ]))
        .unwrap();
        assert_eq!(config.api_key, "abcdef");
        assert_eq!(config.timeout_ms, Some(2500));

        let err = ClientConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV));

        let err = ClientConfig::from_lookup(lookup_from(&[
            (API_KEY_ENV, "abcdef"),
            (TIMEOUT_ENV, "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("milliseconds"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClientConfig::new("super-secret-key-9876").unwrap();
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("super-secret"));
        assert!(debug_str.contains("****9876"));
    }

    #[test]
    fn test_serde_roundtrip_keeps_encoding() {
        let config = ClientConfig::builder()
            .api_key("k")
            .response_encoding(ResponseEncoding::Binary)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"binary\""));
    }
}
