//! # Egide JWT
//!
//! Bearer-token authentication strategy for Egide.
//!
//! A [`JwtStrategy`] locates a token in a request, resolves the key that
//! should verify it, verifies it and hands the claims to an application
//! [`IdentityVerifier`]. Every attempt ends in exactly one [`AuthOutcome`].
//!
//! ## Components
//!
//! - [`extract`]: composable token extractors
//! - [`key`]: fixed keys, per-request key providers, `kid` key sets
//! - [`options`]: verification options and legacy option merging
//! - [`verifier`]: token verification (backed by `jsonwebtoken`)
//! - [`strategy`]: the authentication state machine
//! - [`config`]: TOML configuration
//!
//! ## Example
//!
//! ```no_run
//! use egide_jwt::{
//!     extract, FnIdentityVerifier, IdentityDecision, KeyMaterial, StrategyBuilder,
//! };
//!
//! # fn main() -> Result<(), egide_jwt::ConfigError> {
//! let strategy = StrategyBuilder::new(extract::from_auth_header_as_bearer_token())
//!     .secret_or_key(KeyMaterial::secret("change-me-to-a-long-random-secret"))
//!     .issuer(["https://api.nubster.com"])
//!     .build(FnIdentityVerifier::new(|_request, claims| {
//!         Ok(match claims.sub() {
//!             Some(sub) => IdentityDecision::found(sub.to_string()),
//!             None => IdentityDecision::rejected(),
//!         })
//!     }))?;
//! # let _ = strategy;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod extract;
pub mod identity;
pub mod key;
pub mod options;
pub mod outcome;
pub mod request;
pub mod strategy;
pub mod verifier;

pub use config::{KeyConfig, PublicKeyType, StrategyConfig};
pub use error::{BoxError, CallbackPanic, ConfigError, FailReason, StrategyError, VerifyError};
pub use extract::{BoxedExtractor, ExtractorChain, ExtractorSpec, TokenExtractor};
pub use identity::{FnIdentityVerifier, IdentityDecision, IdentityVerifier};
pub use key::{FnKeyProvider, KeyFamily, KeyMaterial, KeyProvider, KeySet, KeySource};
pub use options::{ExplicitVerifyOptions, LegacyVerifyOptions, OneOrMany, VerificationOptions};
pub use outcome::AuthOutcome;
pub use request::AuthRequest;
pub use strategy::{JwtStrategy, Strategy, StrategyBuilder, DEFAULT_STRATEGY_NAME};
pub use verifier::{Claims, JsonWebTokenVerifier, TokenVerifier};

// Re-exported so callers can name algorithms without a direct dependency.
pub use jsonwebtoken::Algorithm;
