//! Server configuration file.

use std::path::Path;
use std::time::Duration;

use egide_jwt::{ConfigError, StrategyConfig};
use serde::Deserialize;

use crate::directory::Account;

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// HTTP settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Per-request timeout, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Largest request body buffered for token extraction.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl HttpConfig {
    /// Request timeout as a duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Known accounts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DirectoryConfig {
    /// Accounts, keyed by token subject.
    #[serde(default)]
    pub accounts: Vec<Account>,
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// HTTP settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Authentication strategy.
    pub strategy: StrategyConfig,

    /// Known accounts.
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl ServerConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}
