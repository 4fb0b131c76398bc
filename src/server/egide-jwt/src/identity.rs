//! Mapping verified claims to an application identity.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::request::AuthRequest;
use crate::verifier::Claims;

/// Result of looking up an identity for verified claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityDecision<I> {
    /// The claims belong to a known identity.
    Found {
        /// Application identity.
        identity: I,
        /// Optional information forwarded to the host.
        info: Option<String>,
    },
    /// The claims are valid but no identity matches them.
    NotFound {
        /// Optional reason forwarded to the host.
        info: Option<String>,
    },
}

impl<I> IdentityDecision<I> {
    /// Identity found, no extra info.
    pub fn found(identity: I) -> Self {
        Self::Found {
            identity,
            info: None,
        }
    }

    /// Identity found, with info.
    pub fn found_with_info(identity: I, info: impl Into<String>) -> Self {
        Self::Found {
            identity,
            info: Some(info.into()),
        }
    }

    /// No identity, with a reason.
    pub fn not_found(info: impl Into<String>) -> Self {
        Self::NotFound {
            info: Some(info.into()),
        }
    }

    /// No identity, without a reason.
    pub fn rejected() -> Self {
        Self::NotFound { info: None }
    }
}

/// Application callback deciding who the verified claims belong to.
///
/// `Err` means the lookup itself broke (database down, remote directory
/// unreachable) and is reported as an error outcome, distinct from
/// [`IdentityDecision::NotFound`].
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Identity type produced on success.
    type Identity: Send;

    /// Decides on `claims`.
    ///
    /// `request` is `Some` only when the strategy is configured to pass the
    /// request through.
    async fn verify(
        &self,
        request: Option<&AuthRequest>,
        claims: Claims,
    ) -> Result<IdentityDecision<Self::Identity>, BoxError>;
}

/// Synchronous identity callback.
pub type IdentityFn<I> = Arc<
    dyn Fn(Option<&AuthRequest>, &Claims) -> Result<IdentityDecision<I>, BoxError> + Send + Sync,
>;

/// Adapts a synchronous callback into an [`IdentityVerifier`].
pub struct FnIdentityVerifier<I> {
    callback: IdentityFn<I>,
    _identity: PhantomData<fn() -> I>,
}

impl<I> FnIdentityVerifier<I> {
    /// Wraps `callback`.
    pub fn new(
        callback: impl Fn(Option<&AuthRequest>, &Claims) -> Result<IdentityDecision<I>, BoxError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            callback: Arc::new(callback),
            _identity: PhantomData,
        }
    }
}

#[async_trait]
impl<I: Send + 'static> IdentityVerifier for FnIdentityVerifier<I> {
    type Identity = I;

    async fn verify(
        &self,
        request: Option<&AuthRequest>,
        claims: Claims,
    ) -> Result<IdentityDecision<I>, BoxError> {
        (self.callback)(request, &claims)
    }
}
