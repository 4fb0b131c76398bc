//! JWT bearer authentication strategy.
//!
//! One attempt runs extract → resolve key → verify token → verify identity and
//! returns exactly one [`AuthOutcome`]. The strategy holds only its
//! construction-time configuration and can be shared across tasks.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use jsonwebtoken::Algorithm;
use tracing::{debug, error, warn};

use crate::error::{CallbackPanic, ConfigError, FailReason, StrategyError};
use crate::extract::{BoxedExtractor, TokenExtractor};
use crate::identity::{IdentityDecision, IdentityVerifier};
use crate::key::{KeyMaterial, KeyProvider, KeySource};
use crate::options::{ExplicitVerifyOptions, LegacyVerifyOptions, VerificationOptions};
use crate::outcome::AuthOutcome;
use crate::request::AuthRequest;
use crate::verifier::{JsonWebTokenVerifier, TokenVerifier};

/// Default strategy name.
pub const DEFAULT_STRATEGY_NAME: &str = "jwt";

/// Host-facing authentication strategy.
///
/// `Err` is reserved for defects in a collaborator and must not be treated
/// as "unauthenticated".
#[async_trait]
pub trait Strategy: Send + Sync {
    /// Identity produced on success.
    type Identity: Send;

    /// Name the host registers the strategy under.
    fn name(&self) -> &str;

    /// Runs one authentication attempt.
    async fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> Result<AuthOutcome<Self::Identity>, StrategyError>;
}

/// Bearer-token strategy.
pub struct JwtStrategy<I> {
    name: String,
    extractor: BoxedExtractor,
    keys: KeySource,
    options: VerificationOptions,
    verifier: Arc<dyn TokenVerifier>,
    identity: Arc<dyn IdentityVerifier<Identity = I>>,
    pass_request: bool,
}

impl<I> JwtStrategy<I> {
    /// Merged verification options.
    pub fn options(&self) -> &VerificationOptions {
        &self.options
    }

    /// Whether the identity verifier receives the request.
    pub fn passes_request(&self) -> bool {
        self.pass_request
    }

    fn panicked(&self, e: CallbackPanic) -> AuthOutcome<I> {
        warn!(strategy = %self.name, callback = e.callback, error = %e, "Callback panicked");
        AuthOutcome::Error(Box::new(e))
    }
}

impl<I> fmt::Debug for JwtStrategy<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtStrategy")
            .field("name", &self.name)
            .field("keys", &self.keys)
            .field("options", &self.options)
            .field("pass_request", &self.pass_request)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<I: Send + 'static> Strategy for JwtStrategy<I> {
    type Identity = I;

    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self, request: &AuthRequest) -> Result<AuthOutcome<I>, StrategyError> {
        let Some(token) = self.extractor.extract(request) else {
            debug!(strategy = %self.name, "No auth token in request");
            return Ok(AuthOutcome::fail_with_status(
                FailReason::NoAuthToken,
                StatusCode::UNAUTHORIZED,
            ));
        };

        let resolved = guarded("key provider", || self.keys.resolve(request, &token)).await;
        let key = match resolved {
            Ok(Ok(Some(key))) => key,
            Ok(Ok(None)) => {
                error!(strategy = %self.name, "Key provider returned no key");
                return Err(StrategyError::MissingKey);
            },
            Ok(Err(e)) => {
                debug!(strategy = %self.name, error = %e, "Key resolution failed");
                return Ok(AuthOutcome::fail(FailReason::KeyResolution(e)));
            },
            Err(e) => return Ok(self.panicked(e)),
        };
        // Fixed keys were checked by the builder; provider keys are checked per attempt.
        if let Cow::Owned(provided) = &key {
            if let Err(e) = provided.validate() {
                error!(
                    strategy = %self.name,
                    error = %e,
                    "Key provider returned an unusable key"
                );
                return Err(StrategyError::UnusableKey(e.to_string()));
            }
        }

        let verified = guarded("token verifier", || {
            self.verifier.verify(&token, &key, &self.options)
        })
        .await;
        let claims = match verified {
            Ok(Ok(claims)) => claims,
            Ok(Err(e)) => {
                debug!(strategy = %self.name, error = %e, "Token verification failed");
                return Ok(AuthOutcome::fail(FailReason::InvalidToken(e)));
            },
            Err(e) => return Ok(self.panicked(e)),
        };
        debug!(strategy = %self.name, sub = ?claims.sub(), "Token verified");

        let request = self.pass_request.then_some(request);
        let decision = guarded("identity verifier", || self.identity.verify(request, claims)).await;

        let outcome = match decision {
            Ok(Ok(IdentityDecision::Found { identity, info })) => {
                debug!(strategy = %self.name, "Identity verified");
                AuthOutcome::Success { identity, info }
            },
            Ok(Ok(IdentityDecision::NotFound { info })) => {
                debug!(strategy = %self.name, info = ?info, "Identity rejected");
                AuthOutcome::fail(FailReason::Rejected(info))
            },
            Ok(Err(e)) => {
                warn!(strategy = %self.name, error = %e, "Identity verification errored");
                AuthOutcome::Error(e)
            },
            Err(e) => self.panicked(e),
        };
        Ok(outcome)
    }
}

/// Runs a collaborator call, turning a panic raised while creating or polling
/// its future into a [`CallbackPanic`].
async fn guarded<F, Fut>(callback: &'static str, call: F) -> Result<Fut::Output, CallbackPanic>
where
    F: FnOnce() -> Fut,
    Fut: Future,
{
    let future = panic::catch_unwind(AssertUnwindSafe(call))
        .map_err(|payload| callback_panic(callback, payload.as_ref()))?;
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|payload| callback_panic(callback, payload.as_ref()))
}

fn callback_panic(callback: &'static str, payload: &(dyn Any + Send)) -> CallbackPanic {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    CallbackPanic { callback, message }
}

/// Builder for [`JwtStrategy`].
///
/// Exactly one of [`secret_or_key`](Self::secret_or_key) and
/// [`key_provider`](Self::key_provider) must be set.
pub struct StrategyBuilder {
    name: String,
    extractor: BoxedExtractor,
    key: Option<KeyMaterial>,
    key_provider: Option<Arc<dyn KeyProvider>>,
    explicit: ExplicitVerifyOptions,
    legacy: LegacyVerifyOptions,
    verifier: Arc<dyn TokenVerifier>,
    pass_request: bool,
}

impl StrategyBuilder {
    /// Creates a builder using `extractor` to locate tokens.
    pub fn new(extractor: impl TokenExtractor + 'static) -> Self {
        Self {
            name: DEFAULT_STRATEGY_NAME.to_string(),
            extractor: Arc::new(extractor),
            key: None,
            key_provider: None,
            explicit: ExplicitVerifyOptions::default(),
            legacy: LegacyVerifyOptions::default(),
            verifier: Arc::new(JsonWebTokenVerifier),
            pass_request: false,
        }
    }

    /// Overrides the strategy name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fixed verification key.
    pub fn secret_or_key(mut self, key: KeyMaterial) -> Self {
        self.key = Some(key);
        self
    }

    /// Per-request key provider.
    pub fn key_provider(self, provider: impl KeyProvider + 'static) -> Self {
        self.shared_key_provider(Arc::new(provider))
    }

    /// Per-request key provider, already shared.
    pub fn shared_key_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.key_provider = Some(provider);
        self
    }

    /// Allowed signing algorithms.
    pub fn algorithms(mut self, algorithms: impl IntoIterator<Item = Algorithm>) -> Self {
        self.explicit.algorithms = Some(algorithms.into_iter().collect());
        self
    }

    /// Accepted audiences.
    pub fn audience<S: Into<String>>(mut self, audience: impl IntoIterator<Item = S>) -> Self {
        self.explicit.audience = Some(audience.into_iter().map(Into::into).collect());
        self
    }

    /// Accepted issuers.
    pub fn issuer<S: Into<String>>(mut self, issuer: impl IntoIterator<Item = S>) -> Self {
        self.explicit.issuer = Some(issuer.into_iter().map(Into::into).collect());
        self
    }

    /// Skip `exp` validation.
    pub fn ignore_expiration(mut self, ignore: bool) -> Self {
        self.explicit.ignore_expiration = Some(ignore);
        self
    }

    /// Legacy option bag; explicit settings take precedence over it.
    pub fn legacy_options(mut self, legacy: LegacyVerifyOptions) -> Self {
        self.legacy = legacy;
        self
    }

    /// Replaces the token verifier.
    pub fn token_verifier(mut self, verifier: impl TokenVerifier + 'static) -> Self {
        self.verifier = Arc::new(verifier);
        self
    }

    /// Hands the request to the identity verifier.
    pub fn pass_request(mut self, pass: bool) -> Self {
        self.pass_request = pass;
        self
    }

    /// Validates the configuration and builds the strategy.
    pub fn build<V>(self, identity: V) -> Result<JwtStrategy<V::Identity>, ConfigError>
    where
        V: IdentityVerifier + 'static,
    {
        let keys = KeySource::new(self.key, self.key_provider)?;
        let options = VerificationOptions::merge(self.explicit, self.legacy);
        if let KeySource::Fixed(key) = &keys {
            key.validate()?;
            if options.algorithms_for(key.family()).is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "no configured algorithm accepts a {:?} key",
                    key.family()
                )));
            }
        }

        Ok(JwtStrategy {
            name: self.name,
            extractor: self.extractor,
            keys,
            options,
            verifier: self.verifier,
            identity: Arc::new(identity),
            pass_request: self.pass_request,
        })
    }
}

impl fmt::Debug for StrategyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyBuilder")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("key_provider", &self.key_provider.is_some())
            .field("explicit", &self.explicit)
            .field("legacy", &self.legacy)
            .field("pass_request", &self.pass_request)
            .finish_non_exhaustive()
    }
}
