//! Declarative strategy configuration.
//!
//! A [`StrategyConfig`] is the TOML form of a [`StrategyBuilder`]:
//!
//! ```toml
//! name = "jwt"
//! secret = "change-me-to-a-long-random-secret"
//! issuer = "https://api.nubster.com"
//! audience = ["egide"]
//!
//! [[extractors]]
//! from = "bearer"
//!
//! [[extractors]]
//! from = "query"
//! param = "access_token"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::extract::{chain_from_specs, ExtractorSpec};
use crate::key::{KeyMaterial, KeySet};
use crate::options::{LegacyVerifyOptions, OneOrMany};
use crate::strategy::{StrategyBuilder, DEFAULT_STRATEGY_NAME};

/// Kind of a PEM public key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicKeyType {
    /// RSA key (RS*/PS* algorithms).
    #[default]
    Rsa,
    /// Elliptic-curve key (ES* algorithms).
    Ec,
    /// Ed25519 key (EdDSA).
    Ed,
}

/// One key, in any of its accepted encodings.
#[derive(Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyConfig {
    /// Shared secret, as text.
    pub secret: Option<String>,
    /// Shared secret, base64-encoded.
    pub secret_base64: Option<String>,
    /// PEM-encoded public key.
    pub public_key_pem: Option<String>,
    /// Kind of `public_key_pem`; RSA when omitted.
    pub public_key_type: Option<PublicKeyType>,
}

impl KeyConfig {
    /// Decodes the configured key, if any.
    pub fn material(&self) -> Result<Option<KeyMaterial>, ConfigError> {
        let sources = [
            self.secret.is_some(),
            self.secret_base64.is_some(),
            self.public_key_pem.is_some(),
        ];
        if sources.iter().filter(|set| **set).count() > 1 {
            return Err(ConfigError::ConflictingKeySources);
        }
        if self.public_key_type.is_some() && self.public_key_pem.is_none() {
            return Err(ConfigError::Invalid(
                "public_key_type requires public_key_pem".to_string(),
            ));
        }

        let key = if let Some(secret) = &self.secret {
            KeyMaterial::secret(secret)
        } else if let Some(encoded) = &self.secret_base64 {
            let decoded = BASE64
                .decode(encoded.trim())
                .map_err(|e| ConfigError::InvalidKey(format!("secret_base64: {e}")))?;
            KeyMaterial::secret(decoded)
        } else if let Some(pem) = &self.public_key_pem {
            match self.public_key_type.unwrap_or_default() {
                PublicKeyType::Rsa => KeyMaterial::rsa_pem(pem),
                PublicKeyType::Ec => KeyMaterial::ec_pem(pem),
                PublicKeyType::Ed => KeyMaterial::ed_pem(pem),
            }
        } else {
            return Ok(None);
        };

        key.validate()?;
        Ok(Some(key))
    }
}

impl fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("secret_base64", &self.secret_base64.as_ref().map(|_| "<redacted>"))
            .field("public_key_pem", &self.public_key_pem.is_some())
            .field("public_key_type", &self.public_key_type)
            .finish()
    }
}

fn default_name() -> String {
    DEFAULT_STRATEGY_NAME.to_string()
}

fn default_extractors() -> Vec<ExtractorSpec> {
    vec![ExtractorSpec::Bearer]
}

/// Strategy configuration as read from TOML.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrategyConfig {
    /// Strategy name.
    #[serde(default = "default_name")]
    pub name: String,

    /// Token locations, tried in order.
    #[serde(default = "default_extractors")]
    pub extractors: Vec<ExtractorSpec>,

    /// Shared secret, as text.
    #[serde(default)]
    pub secret: Option<String>,

    /// Shared secret, base64-encoded.
    #[serde(default)]
    pub secret_base64: Option<String>,

    /// PEM-encoded public key.
    #[serde(default)]
    pub public_key_pem: Option<String>,

    /// Kind of `public_key_pem`.
    #[serde(default)]
    pub public_key_type: Option<PublicKeyType>,

    /// Keys selected by the token's `kid` header.
    #[serde(default)]
    pub keys: BTreeMap<String, KeyConfig>,

    /// Entry of `keys` used when the token has no known `kid`.
    #[serde(default)]
    pub default_key: Option<String>,

    /// Allowed signing algorithms.
    #[serde(default)]
    pub algorithms: Option<Vec<Algorithm>>,

    /// Accepted audiences.
    #[serde(default)]
    pub audience: Option<OneOrMany>,

    /// Accepted issuers.
    #[serde(default)]
    pub issuer: Option<OneOrMany>,

    /// Skip `exp` validation.
    #[serde(default)]
    pub ignore_expiration: Option<bool>,

    /// Hand the request to the identity verifier.
    #[serde(default)]
    pub pass_request: bool,

    /// Legacy option bag.
    #[serde(default)]
    pub json_web_token_options: Option<LegacyVerifyOptions>,
}

impl fmt::Debug for StrategyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyConfig")
            .field("name", &self.name)
            .field("extractors", &self.extractors)
            .field("fixed_key", &self.fixed_key())
            .field("keys", &self.keys)
            .field("default_key", &self.default_key)
            .field("algorithms", &self.algorithms)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("ignore_expiration", &self.ignore_expiration)
            .field("pass_request", &self.pass_request)
            .field("json_web_token_options", &self.json_web_token_options)
            .finish()
    }
}

impl StrategyConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Token locations in lookup order, e.g. `query:access_token, authorization:bearer`.
    pub fn extractor_summary(&self) -> String {
        let locations: Vec<_> = self.extractors.iter().map(ExtractorSpec::describe).collect();
        locations.join(", ")
    }

    fn fixed_key(&self) -> KeyConfig {
        KeyConfig {
            secret: self.secret.clone(),
            secret_base64: self.secret_base64.clone(),
            public_key_pem: self.public_key_pem.clone(),
            public_key_type: self.public_key_type,
        }
    }

    fn key_set(&self) -> Result<Option<KeySet>, ConfigError> {
        if self.keys.is_empty() {
            return match &self.default_key {
                Some(_) => Err(ConfigError::Invalid(
                    "default_key requires a keys table".to_string(),
                )),
                None => Ok(None),
            };
        }

        let mut set = KeySet::new();
        for (kid, entry) in &self.keys {
            let key = entry
                .material()?
                .ok_or_else(|| ConfigError::Invalid(format!("key {kid:?} has no material")))?;
            set = set.with_key(kid.as_str(), key);
        }
        if let Some(kid) = &self.default_key {
            let key = self
                .keys
                .get(kid)
                .map(KeyConfig::material)
                .transpose()?
                .flatten()
                .ok_or_else(|| ConfigError::Invalid(format!("key {kid:?} has no material")))?;
            set = set.with_default(key);
        }
        Ok(Some(set))
    }

    /// Turns the configuration into a builder.
    pub fn into_builder(self) -> Result<StrategyBuilder, ConfigError> {
        if self.extractors.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one extractor is required".to_string(),
            ));
        }
        if let Some(kid) = &self.default_key {
            if !self.keys.contains_key(kid) {
                return Err(ConfigError::Invalid(format!(
                    "default_key {kid:?} is not in the keys table"
                )));
            }
        }

        let fixed = self.fixed_key().material()?;
        let key_set = self.key_set()?;

        let mut builder = StrategyBuilder::new(chain_from_specs(&self.extractors))
            .name(self.name)
            .pass_request(self.pass_request);
        if let Some(key) = fixed {
            builder = builder.secret_or_key(key);
        }
        if let Some(set) = key_set {
            builder = builder.key_provider(set);
        }
        if let Some(algorithms) = self.algorithms {
            builder = builder.algorithms(algorithms);
        }
        if let Some(audience) = self.audience {
            builder = builder.audience(Vec::from(audience));
        }
        if let Some(issuer) = self.issuer {
            builder = builder.issuer(Vec::from(issuer));
        }
        if let Some(ignore) = self.ignore_expiration {
            builder = builder.ignore_expiration(ignore);
        }
        if let Some(legacy) = self.json_web_token_options {
            builder = builder.legacy_options(legacy);
        }
        Ok(builder)
    }
}
