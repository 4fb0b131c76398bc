//! Authentication error types.

use std::fmt;

use thiserror::Error;

/// Boxed error used by caller-supplied collaborators (key providers,
/// identity verifiers, custom token verifiers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while assembling a strategy.
///
/// These are fatal and surface before any request is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Both a fixed key and a key provider were supplied.
    #[error("cannot specify both a fixed key and a key provider")]
    ConflictingKeySources,

    /// Neither a fixed key nor a key provider was supplied.
    #[error("a fixed key or a key provider must be provided")]
    MissingKeySource,

    /// Key material could not be decoded.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration is syntactically valid but inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fatal runtime conditions that are not per-request outcomes.
///
/// A host must not treat these as "unauthenticated": they indicate a defect
/// in a collaborator supplied at construction.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The key provider reported success without producing a key.
    #[error("key provider succeeded without returning a key")]
    MissingKey,

    /// The key provider returned key material that cannot verify tokens.
    #[error("key provider returned an unusable key: {0}")]
    UnusableKey(String),
}

/// A caller-supplied collaborator panicked instead of returning.
#[derive(Debug, Error)]
#[error("{callback} panicked: {message}")]
pub struct CallbackPanic {
    /// Which collaborator panicked.
    pub callback: &'static str,
    /// Panic payload, when it was a string.
    pub message: String,
}

/// Errors reported by a token verifier.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Signature, claim or format validation failed.
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// Resolved key could not be turned into a decoding key.
    #[error("unusable verification key: {0}")]
    Key(String),

    /// No algorithm is allowed for the resolved key.
    #[error("no allowed algorithm for this key")]
    NoAlgorithm,

    /// Error from a custom verifier.
    #[error(transparent)]
    Other(BoxError),
}

/// Why a request was not authenticated.
///
/// Every variant is an expected outcome: the host may try another strategy
/// or answer 401.
#[derive(Debug)]
pub enum FailReason {
    /// No extractor located a token.
    NoAuthToken,

    /// The key provider reported an error.
    KeyResolution(BoxError),

    /// The token did not verify against the resolved key.
    InvalidToken(VerifyError),

    /// The identity verifier found no identity for the claims.
    Rejected(Option<String>),
}

impl FailReason {
    /// Message suitable for a client-facing challenge.
    pub fn message(&self) -> String {
        match self {
            Self::Rejected(Some(info)) => info.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAuthToken => f.write_str("no auth token"),
            Self::KeyResolution(e) => write!(f, "key resolution failed: {e}"),
            Self::InvalidToken(e) => write!(f, "{e}"),
            Self::Rejected(Some(info)) => write!(f, "rejected: {info}"),
            Self::Rejected(None) => f.write_str("rejected"),
        }
    }
}
