//! Configuration
//!
//! Connection settings for a Parse server plus stitch defaults, loaded from
//! YAML and overridable through environment variables.
//!
//! ```yaml
//! parse:
//!   server_url: https://example.com/parse
//!   application_id: my-app
//!   rest_api_key: secret
//!   rate_limit:
//!     requests_per_second: 5
//! stitch:
//!   super_stitch: true
//! ```

use crate::error::{Error, Result};
use crate::http::RateLimiterConfig;
use crate::pagination::{StitchLimits, MAX_QUERIES, PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Environment variable overriding `parse.server_url`
pub const ENV_SERVER_URL: &str = "PARSE_SERVER_URL";
/// Environment variable overriding `parse.application_id`
pub const ENV_APPLICATION_ID: &str = "PARSE_APPLICATION_ID";
/// Environment variable overriding `parse.rest_api_key`
pub const ENV_REST_API_KEY: &str = "PARSE_REST_API_KEY";
/// Environment variable overriding `parse.master_key`
pub const ENV_MASTER_KEY: &str = "PARSE_MASTER_KEY";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Parse server connection
    #[serde(default)]
    pub parse: ParseConfig,

    /// Stitch defaults
    #[serde(default)]
    pub stitch: StitchConfig,
}

impl Config {
    /// Parse a config from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Apply overrides from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    #[must_use]
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        self.parse = self.parse.with_env_from(lookup);
        self
    }
}

// ============================================================================
// Parse Connection
// ============================================================================

/// Connection settings for a Parse server
#[derive(Clone, Serialize, Deserialize)]
pub struct ParseConfig {
    /// Server mount point, e.g. `https://example.com/parse`
    #[serde(default)]
    pub server_url: String,

    /// Application id (`X-Parse-Application-Id`)
    #[serde(default)]
    pub application_id: String,

    /// REST API key (`X-Parse-REST-API-Key`)
    #[serde(default)]
    pub rest_api_key: Option<String>,

    /// Master key, sent only when a call asks for `useMasterKey`
    #[serde(default)]
    pub master_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional throttle on outgoing requests
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("stitch-query/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            application_id: String::new(),
            rest_api_key: None,
            master_key: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            rate_limit: None,
        }
    }
}

impl std::fmt::Debug for ParseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseConfig")
            .field("server_url", &self.server_url)
            .field("application_id", &self.application_id)
            .field("has_rest_api_key", &self.rest_api_key.is_some())
            .field("has_master_key", &self.master_key.is_some())
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl ParseConfig {
    /// Create a new config builder
    pub fn builder() -> ParseConfigBuilder {
        ParseConfigBuilder::default()
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Apply overrides from an arbitrary variable lookup
    #[must_use]
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL) {
            self.server_url = url;
        }
        if let Some(app_id) = lookup(ENV_APPLICATION_ID) {
            self.application_id = app_id;
        }
        if let Some(key) = lookup(ENV_REST_API_KEY) {
            self.rest_api_key = Some(key);
        }
        if let Some(key) = lookup(ENV_MASTER_KEY) {
            self.master_key = Some(key);
        }
        self
    }

    /// Check required fields and parse the server URL
    pub fn validate(&self) -> Result<Url> {
        if self.server_url.trim().is_empty() {
            return Err(Error::missing_field("parse.server_url"));
        }
        if self.application_id.trim().is_empty() {
            return Err(Error::missing_field("parse.application_id"));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value(
                "parse.timeout_secs",
                "must be greater than zero",
            ));
        }

        let url = Url::parse(&self.server_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::invalid_value(
                "parse.server_url",
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }
}

/// Builder for [`ParseConfig`]
#[derive(Default)]
pub struct ParseConfigBuilder {
    config: ParseConfig,
}

impl ParseConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into();
        self
    }

    /// Set the application id
    pub fn application_id(mut self, id: impl Into<String>) -> Self {
        self.config.application_id = id.into();
        self
    }

    /// Set the REST API key
    pub fn rest_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.rest_api_key = Some(key.into());
        self
    }

    /// Set the master key
    pub fn master_key(mut self, key: impl Into<String>) -> Self {
        self.config.master_key = Some(key.into());
        self
    }

    /// Set the request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Build the config
    pub fn build(self) -> ParseConfig {
        self.config
    }
}

// ============================================================================
// Stitch Defaults
// ============================================================================

/// Defaults applied to stitch calls made by the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchConfig {
    /// Enable super-stitch unless overridden
    #[serde(default)]
    pub super_stitch: bool,

    /// Records per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Offset pages per cursor window
    #[serde(default = "default_max_queries")]
    pub max_queries: usize,
}

fn default_page_size() -> usize {
    PAGE_SIZE
}

fn default_max_queries() -> usize {
    MAX_QUERIES
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            super_stitch: false,
            page_size: PAGE_SIZE,
            max_queries: MAX_QUERIES,
        }
    }
}

impl StitchConfig {
    /// Limits to hand to the stitcher
    ///
    /// `page_size` is capped at [`PAGE_SIZE`], the most a Parse server
    /// returns per request.
    pub fn limits(&self) -> StitchLimits {
        if self.page_size > PAGE_SIZE {
            warn!(
                "stitch.page_size {} exceeds the server cap, using {PAGE_SIZE}",
                self.page_size
            );
        }
        StitchLimits::new(self.page_size.min(PAGE_SIZE), self.max_queries)
    }
}
