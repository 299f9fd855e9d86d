//! Client configuration
//!
//! Settings can be assembled three ways, and mixed:
//!
//! - builder setters on [`ClientConfig`]
//! - environment variables via [`ClientConfig::from_env`]
//! - a TOML document via [`ClientConfig::from_toml_str`] / [`ClientConfig::load`]
//!
//! The API key may always be left out; it then falls back to
//! `TOOLBRIDGE_API_KEY` when the client is built.
//!
//! # Example
//!
//! ```
//! use toolbridge::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::new("api-key")
//!     .with_base_url("https://platform.example.com")
//!     .with_auth_mod_base_url("https://auth.example.com")
//!     .with_poll_interval(Duration::from_millis(250))
//!     .with_metadata("tenant", Some("acme".to_string()));
//!
//! assert!(config.validate().is_ok());
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use toolbridge_core::{Authentication, KeyValuePair};

/// Platform URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8082";
/// Interval between authentication status polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// API key variable
pub const API_KEY_ENV: &str = "TOOLBRIDGE_API_KEY";
/// Platform URL variable
pub const BASE_URL_ENV: &str = "TOOLBRIDGE_BASE_URL";
/// Authentication module URL variable
pub const AUTH_MOD_BASE_URL_ENV: &str = "TOOLBRIDGE_AUTH_MOD_BASE_URL";
/// Request timeout variable (milliseconds)
pub const TIMEOUT_MS_ENV: &str = "TOOLBRIDGE_TIMEOUT_MS";
/// Poll interval variable (milliseconds)
pub const POLL_INTERVAL_MS_ENV: &str = "TOOLBRIDGE_POLL_INTERVAL_MS";

/// Configuration errors; fatal at construction
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No API key given and none in the environment
    #[error(
        "The api_key client option must be set either by passing api_key to the SDK or by setting the {API_KEY_ENV} environment variable"
    )]
    MissingApiKey,

    /// No authentication module URL
    #[error("Authentication module base URL is required, in case one or more tools requires authentication")]
    MissingAuthModuleUrl,

    /// A URL setting does not parse
    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl {
        /// Setting name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// A setting has an unusable value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue {
        /// Setting name
        field: &'static str,
        /// Offending value
        value: String,
    },

    /// TOML document failed to parse
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Configuration file could not be read
    #[error("Failed to read configuration: {0}")]
    Io(String),
}

/// Settings fixed for the lifetime of a client
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    /// Platform base URL
    pub base_url: String,
    /// API key; falls back to `TOOLBRIDGE_API_KEY`
    pub api_key: Option<String>,
    /// Authentication module base URL, used for landing pages
    pub auth_mod_base_url: Option<String>,
    /// Credential scope attached to every execution request
    pub authentication: Authentication,
    /// Per-request timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Interval between authentication status polls in milliseconds
    pub poll_interval_ms: u64,
    /// Metadata attached to every request
    pub metadata: Vec<KeyValuePair>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            auth_mod_base_url: None,
            authentication: Authentication::default(),
            timeout_ms: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            metadata: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Config with an explicit API key and defaults elsewhere
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Load settings from `TOOLBRIDGE_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        config.api_key = lookup(API_KEY_ENV);
        config.auth_mod_base_url = lookup(AUTH_MOD_BASE_URL_ENV);
        if let Some(raw) = lookup(TIMEOUT_MS_ENV) {
            config.timeout_ms = Some(parse_millis(TIMEOUT_MS_ENV, &raw)?);
        }
        if let Some(raw) = lookup(POLL_INTERVAL_MS_ENV) {
            config.poll_interval_ms = parse_millis(POLL_INTERVAL_MS_ENV, &raw)?;
        }
        Ok(config)
    }

    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` if the document is not valid
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        toml::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or
    /// `ConfigError::Parse` if it is not valid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&document)
    }

    /// Builder: set platform base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder: set authentication module base URL
    #[must_use]
    pub fn with_auth_mod_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_mod_base_url = Some(url.into());
        self
    }

    /// Builder: set credential scope
    #[must_use]
    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    /// Builder: set per-request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(duration_millis(timeout));
        self
    }

    /// Builder: set status poll interval
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_millis(interval);
        self
    }

    /// Builder: append a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Option<String>) -> Self {
        self.metadata.push(KeyValuePair::new(key, value));
        self
    }

    /// Per-request timeout
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Status poll interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Explicit API key, else `TOOLBRIDGE_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingApiKey` if neither is set
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Authentication module base URL
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingAuthModuleUrl` if unset or empty
    pub fn auth_module_url(&self) -> Result<&str, ConfigError> {
        self.auth_mod_base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::MissingAuthModuleUrl)
    }

    /// Check every setting a client needs
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve_api_key()?;
        check_url("base_url", &self.base_url)?;
        check_url("auth_mod_base_url", self.auth_module_url()?)?;
        self.checked_poll_interval()?;
        Ok(())
    }

    /// Poll interval, rejecting zero
    pub(crate) fn checked_poll_interval(&self) -> Result<Duration, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_ms",
                value: "0".to_string(),
            });
        }
        Ok(self.poll_interval())
    }
}

fn check_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    reqwest::Url::parse(value)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
}

fn parse_millis(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
