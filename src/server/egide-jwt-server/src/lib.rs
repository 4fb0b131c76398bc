//! # Egide JWT Server
//!
//! HTTP host for the [`egide_jwt`] bearer-token strategy.
//!
//! Requests to protected routes are shaped into an [`egide_jwt::AuthRequest`],
//! run through the configured strategy and answered according to the outcome:
//! success reaches the handler, failure is a 401 with a bearer challenge and
//! errors are a 500.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod auth;
pub mod config;
pub mod directory;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use egide_jwt::{ConfigError, JwtStrategy};

pub use config::ServerConfig;
pub use directory::{Account, Directory};
pub use routes::router;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Strategy protecting `/v1/auth`.
    pub strategy: Arc<JwtStrategy<Account>>,
    /// Largest body buffered for token extraction.
    pub max_body_bytes: usize,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl AppState {
    /// Builds the state from a loaded configuration.
    pub fn from_config(config: ServerConfig) -> Result<Self, ConfigError> {
        let directory = Directory::new(config.directory.accounts);
        let strategy = config.strategy.into_builder()?.build(directory)?;

        Ok(Self {
            strategy: Arc::new(strategy),
            max_body_bytes: config.http.max_body_bytes,
            request_timeout: config.http.request_timeout(),
        })
    }
}
