//! Verification options and their backward-compatible assembly.
//!
//! Options come from two places: explicit fields set on the strategy, and a
//! legacy option bag kept for older configurations. [`VerificationOptions::merge`]
//! combines them once, at construction. Explicit fields always win; the
//! legacy bag only fills gaps and supplies the knobs that have no explicit
//! counterpart.

use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;

use crate::error::VerifyError;
use crate::key::KeyFamily;

/// A string or a list of strings, as accepted for `aud` and `iss`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single value.
    One(String),
    /// Several accepted values.
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

/// Explicitly configured verification fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitVerifyOptions {
    /// Allowed signing algorithms.
    pub algorithms: Option<Vec<Algorithm>>,
    /// Accepted audiences.
    pub audience: Option<Vec<String>>,
    /// Accepted issuers.
    pub issuer: Option<Vec<String>>,
    /// Skip `exp` validation.
    pub ignore_expiration: Option<bool>,
}

/// Legacy option bag.
///
/// Field names follow the older configuration format; camelCase spellings
/// are accepted as aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LegacyVerifyOptions {
    /// Allowed signing algorithms.
    pub algorithms: Option<Vec<Algorithm>>,
    /// Accepted audiences.
    pub audience: Option<OneOrMany>,
    /// Accepted issuers.
    pub issuer: Option<OneOrMany>,
    /// Skip `exp` validation.
    #[serde(alias = "ignoreExpiration")]
    pub ignore_expiration: Option<bool>,
    /// Skip `nbf` validation.
    #[serde(alias = "ignoreNotBefore")]
    pub ignore_not_before: Option<bool>,
    /// Clock tolerance in seconds for `exp` and `nbf`.
    #[serde(alias = "clockTolerance")]
    pub clock_tolerance: Option<u64>,
    /// Required `sub` value.
    pub subject: Option<String>,
}

/// Immutable options handed to the token verifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationOptions {
    /// Allowed algorithms; `None` derives them from the key family.
    pub algorithms: Option<Vec<Algorithm>>,
    /// Accepted audiences; `None` disables the check.
    pub audience: Option<Vec<String>>,
    /// Accepted issuers; `None` disables the check.
    pub issuer: Option<Vec<String>>,
    /// Skip `exp` validation.
    pub ignore_expiration: bool,
    /// Skip `nbf` validation.
    pub ignore_not_before: bool,
    /// Clock tolerance in seconds.
    pub leeway: u64,
    /// Required `sub` value.
    pub subject: Option<String>,
}

impl VerificationOptions {
    /// Merges explicit fields over the legacy bag.
    pub fn merge(explicit: ExplicitVerifyOptions, legacy: LegacyVerifyOptions) -> Self {
        Self {
            algorithms: explicit.algorithms.or(legacy.algorithms),
            audience: explicit.audience.or(legacy.audience.map(Vec::from)),
            issuer: explicit.issuer.or(legacy.issuer.map(Vec::from)),
            ignore_expiration: explicit
                .ignore_expiration
                .or(legacy.ignore_expiration)
                .unwrap_or(false),
            ignore_not_before: legacy.ignore_not_before.unwrap_or(false),
            leeway: legacy.clock_tolerance.unwrap_or(0),
            subject: legacy.subject,
        }
    }

    /// Algorithms accepted for a key of `family`.
    ///
    /// A configured allow-list is narrowed to the algorithms that can use a
    /// key of this family.
    pub fn algorithms_for(&self, family: KeyFamily) -> Vec<Algorithm> {
        match &self.algorithms {
            Some(algorithms) => algorithms
                .iter()
                .copied()
                .filter(|alg| KeyFamily::of(*alg) == family)
                .collect(),
            None => family.default_algorithms(),
        }
    }

    /// Builds the `jsonwebtoken` validation for a key of `family`.
    pub fn validation_for(&self, family: KeyFamily) -> Result<Validation, VerifyError> {
        let algorithms = self.algorithms_for(family);
        let first = *algorithms.first().ok_or(VerifyError::NoAlgorithm)?;

        let mut validation = Validation::new(first);
        validation.algorithms = algorithms;
        // A claim is required only when an expected value is configured.
        validation.required_spec_claims.clear();
        validation.leeway = self.leeway;
        validation.validate_exp = !self.ignore_expiration;
        validation.validate_nbf = !self.ignore_not_before;

        match &self.audience {
            Some(audience) => {
                validation.set_audience(audience);
                validation.required_spec_claims.insert("aud".to_string());
            },
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(issuer);
            validation.required_spec_claims.insert("iss".to_string());
        }
        if let Some(subject) = &self.subject {
            validation.sub = Some(subject.clone());
            validation.required_spec_claims.insert("sub".to_string());
        }

        Ok(validation)
    }
}
