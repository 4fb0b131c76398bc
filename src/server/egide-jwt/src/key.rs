//! Key material and key resolution.
//!
//! A strategy resolves the verification key per request, either from a
//! fixed key or from a [`KeyProvider`]. Exactly one of the two is allowed.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::{BoxError, ConfigError, VerifyError};
use crate::request::AuthRequest;

/// Family of a verification key, used to pick default algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// Shared secret (HMAC).
    Symmetric,
    /// RSA public key.
    Rsa,
    /// Elliptic-curve public key.
    Ec,
    /// Ed25519 public key.
    Ed,
}

impl KeyFamily {
    /// Family of keys usable with `alg`.
    pub fn of(alg: Algorithm) -> Self {
        match alg {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Self::Symmetric,
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Self::Rsa,
            Algorithm::ES256 | Algorithm::ES384 => Self::Ec,
            Algorithm::EdDSA => Self::Ed,
        }
    }

    /// Algorithms accepted for this family when none are configured.
    pub fn default_algorithms(self) -> Vec<Algorithm> {
        match self {
            Self::Symmetric => vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512],
            Self::Rsa => vec![
                Algorithm::RS256,
                Algorithm::RS384,
                Algorithm::RS512,
                Algorithm::PS256,
                Algorithm::PS384,
                Algorithm::PS512,
            ],
            Self::Ec => vec![Algorithm::ES256, Algorithm::ES384],
            Self::Ed => vec![Algorithm::EdDSA],
        }
    }
}

/// Material used to verify a token signature.
///
/// Secret bytes are wiped on drop and never printed via `Debug`.
#[derive(Clone)]
pub enum KeyMaterial {
    /// Shared secret.
    Secret(Zeroizing<Vec<u8>>),
    /// PEM-encoded RSA public key.
    RsaPem(Vec<u8>),
    /// PEM-encoded EC public key.
    EcPem(Vec<u8>),
    /// PEM-encoded Ed25519 public key.
    EdPem(Vec<u8>),
}

impl KeyMaterial {
    /// Creates a shared-secret key.
    pub fn secret(secret: impl AsRef<[u8]>) -> Self {
        Self::Secret(Zeroizing::new(secret.as_ref().to_vec()))
    }

    /// Creates an RSA public key from PEM.
    pub fn rsa_pem(pem: impl AsRef<[u8]>) -> Self {
        Self::RsaPem(pem.as_ref().to_vec())
    }

    /// Creates an EC public key from PEM.
    pub fn ec_pem(pem: impl AsRef<[u8]>) -> Self {
        Self::EcPem(pem.as_ref().to_vec())
    }

    /// Creates an Ed25519 public key from PEM.
    pub fn ed_pem(pem: impl AsRef<[u8]>) -> Self {
        Self::EdPem(pem.as_ref().to_vec())
    }

    /// Key family.
    pub fn family(&self) -> KeyFamily {
        match self {
            Self::Secret(_) => KeyFamily::Symmetric,
            Self::RsaPem(_) => KeyFamily::Rsa,
            Self::EcPem(_) => KeyFamily::Ec,
            Self::EdPem(_) => KeyFamily::Ed,
        }
    }

    /// True for shared secrets.
    pub fn is_symmetric(&self) -> bool {
        self.family() == KeyFamily::Symmetric
    }

    /// Builds the `jsonwebtoken` decoding key.
    pub fn decoding_key(&self) -> Result<DecodingKey, VerifyError> {
        let key = match self {
            Self::Secret(secret) => {
                if secret.is_empty() {
                    return Err(VerifyError::Key("empty secret".to_string()));
                }
                DecodingKey::from_secret(secret)
            },
            Self::RsaPem(pem) => DecodingKey::from_rsa_pem(pem)?,
            Self::EcPem(pem) => DecodingKey::from_ec_pem(pem)?,
            Self::EdPem(pem) => DecodingKey::from_ed_pem(pem)?,
        };
        Ok(key)
    }

    /// Checks that the material can be used, for construction-time validation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.decoding_key()
            .map(|_| ())
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        f.debug_tuple("KeyMaterial").field(&self.family()).finish()
    }
}

/// Resolves the verification key for a request.
///
/// Implementations may perform I/O (remote key stores, tenant lookups).
/// Returning `Ok(None)` is a contract violation: the strategy reports it as a
/// fatal [`StrategyError`](crate::StrategyError), not as a failed login.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Returns the key that should verify `token`.
    async fn resolve(
        &self,
        request: &AuthRequest,
        token: &str,
    ) -> Result<Option<KeyMaterial>, BoxError>;
}

/// Synchronous key lookup callback.
pub type KeyFn =
    Arc<dyn Fn(&AuthRequest, &str) -> Result<Option<KeyMaterial>, BoxError> + Send + Sync>;

/// Adapts a synchronous callback into a [`KeyProvider`].
pub struct FnKeyProvider {
    lookup: KeyFn,
}

impl FnKeyProvider {
    /// Wraps `lookup`.
    pub fn new(
        lookup: impl Fn(&AuthRequest, &str) -> Result<Option<KeyMaterial>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            lookup: Arc::new(lookup),
        }
    }
}

#[async_trait]
impl KeyProvider for FnKeyProvider {
    async fn resolve(
        &self,
        request: &AuthRequest,
        token: &str,
    ) -> Result<Option<KeyMaterial>, BoxError> {
        (self.lookup)(request, token)
    }
}

/// Errors reported by [`KeySet`].
#[derive(Debug, Error)]
pub enum KeySetError {
    /// The token names a key id that is not configured.
    #[error("no key configured for kid {0:?}")]
    UnknownKid(Option<String>),
}

/// Picks a key by the `kid` header of the (not yet verified) token.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, KeyMaterial>,
    default: Option<KeyMaterial>,
}

impl KeySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the key for `kid`.
    pub fn with_key(mut self, kid: impl Into<String>, key: KeyMaterial) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    /// Key used when the token has no `kid` or an unknown one.
    pub fn with_default(mut self, key: KeyMaterial) -> Self {
        self.default = Some(key);
        self
    }

    /// Number of registered key ids.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no key id is registered.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn lookup(&self, kid: Option<&str>) -> Option<&KeyMaterial> {
        kid.and_then(|kid| self.keys.get(kid))
            .or(self.default.as_ref())
    }
}

#[async_trait]
impl KeyProvider for KeySet {
    async fn resolve(
        &self,
        _request: &AuthRequest,
        token: &str,
    ) -> Result<Option<KeyMaterial>, BoxError> {
        let header = jsonwebtoken::decode_header(token)?;
        match self.lookup(header.kid.as_deref()) {
            Some(key) => Ok(Some(key.clone())),
            None => Err(KeySetError::UnknownKid(header.kid).into()),
        }
    }
}

/// How a strategy obtains its verification key.
#[derive(Clone)]
pub enum KeySource {
    /// The same key for every request.
    Fixed(KeyMaterial),
    /// A key looked up per request.
    Provider(Arc<dyn KeyProvider>),
}

impl KeySource {
    /// Selects the key source, rejecting both or neither being supplied.
    pub fn new(
        fixed: Option<KeyMaterial>,
        provider: Option<Arc<dyn KeyProvider>>,
    ) -> Result<Self, ConfigError> {
        match (fixed, provider) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingKeySources),
            (Some(key), None) => Ok(Self::Fixed(key)),
            (None, Some(provider)) => Ok(Self::Provider(provider)),
            (None, None) => Err(ConfigError::MissingKeySource),
        }
    }

    /// Resolves the key for `token`.
    pub async fn resolve<'a>(
        &'a self,
        request: &AuthRequest,
        token: &str,
    ) -> Result<Option<Cow<'a, KeyMaterial>>, BoxError> {
        match self {
            Self::Fixed(key) => Ok(Some(Cow::Borrowed(key))),
            Self::Provider(provider) => Ok(provider.resolve(request, token).await?.map(Cow::Owned)),
        }
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(key) => f.debug_tuple("Fixed").field(key).finish(),
            Self::Provider(_) => f.write_str("Provider(..)"),
        }
    }
}
