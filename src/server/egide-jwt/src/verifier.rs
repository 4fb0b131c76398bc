//! Token verification.
//!
//! The strategy delegates signature and claim checks to a [`TokenVerifier`].
//! [`JsonWebTokenVerifier`] is the production implementation; tests and
//! integrations can inject their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VerifyError;
use crate::key::KeyMaterial;
use crate::options::VerificationOptions;

/// Verified, decoded token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Value);

impl Claims {
    /// Wraps a decoded payload.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Get a claim by key.
    pub fn claim(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Convenience accessor for `sub`.
    pub fn sub(&self) -> Option<&str> {
        self.claim("sub").and_then(Value::as_str)
    }

    /// Convenience accessor for `iss`.
    pub fn iss(&self) -> Option<&str> {
        self.claim("iss").and_then(Value::as_str)
    }

    /// Convenience accessor for `aud`.
    pub fn aud(&self) -> Option<&Value> {
        self.claim("aud")
    }

    /// Convenience accessor for `exp`.
    pub fn exp(&self) -> Option<i64> {
        self.claim("exp").and_then(Value::as_i64)
    }

    /// Raw payload.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the wrapper.
    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Verifies a token against a key.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Checks the signature and claims of `token`.
    async fn verify(
        &self,
        token: &str,
        key: &KeyMaterial,
        options: &VerificationOptions,
    ) -> Result<Claims, VerifyError>;
}

/// Verifier backed by the `jsonwebtoken` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWebTokenVerifier;

impl JsonWebTokenVerifier {
    /// Synchronous verification, shared by the trait implementation.
    pub fn verify_sync(
        &self,
        token: &str,
        key: &KeyMaterial,
        options: &VerificationOptions,
    ) -> Result<Claims, VerifyError> {
        let decoding_key = key.decoding_key()?;
        let validation = options.validation_for(key.family())?;
        let data = jsonwebtoken::decode::<Value>(token, &decoding_key, &validation)?;
        Ok(Claims(data.claims))
    }
}

#[async_trait]
impl TokenVerifier for JsonWebTokenVerifier {
    async fn verify(
        &self,
        token: &str,
        key: &KeyMaterial,
        options: &VerificationOptions,
    ) -> Result<Claims, VerifyError> {
        self.verify_sync(token, key, options)
    }
}
