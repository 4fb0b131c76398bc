//! Token extraction rules.
//!
//! A rule looks for a candidate token in one place of an [`AuthRequest`].
//! Rules never fail: malformed input degrades to `None` so that a chain can
//! move on to the next location.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use http::header::AUTHORIZATION;
use http::HeaderValue;
use serde::Deserialize;
use url::form_urlencoded;

use crate::request::AuthRequest;

/// Default scheme for [`from_auth_header_as_bearer_token`].
pub const BEARER_AUTH_SCHEME: &str = "bearer";

/// Locates a token inside a request.
pub trait TokenExtractor: Send + Sync {
    /// Returns the candidate token, or `None` when this location holds none.
    fn extract(&self, request: &AuthRequest) -> Option<String>;
}

impl<F> TokenExtractor for F
where
    F: Fn(&AuthRequest) -> Option<String> + Send + Sync,
{
    fn extract(&self, request: &AuthRequest) -> Option<String> {
        self(request)
    }
}

/// Shared, type-erased extraction rule.
pub type BoxedExtractor = Arc<dyn TokenExtractor>;

fn non_empty(token: &str) -> Option<String> {
    (!token.is_empty()).then(|| token.to_string())
}

/// Reads a named header.
#[derive(Debug, Clone)]
pub struct HeaderExtractor {
    name: String,
}

impl TokenExtractor for HeaderExtractor {
    fn extract(&self, request: &AuthRequest) -> Option<String> {
        let value = request.headers().get(self.name.as_str())?;
        non_empty(value.to_str().ok()?)
    }
}

/// Reads a named field of the parsed body.
#[derive(Debug, Clone)]
pub struct BodyFieldExtractor {
    field: String,
}

impl TokenExtractor for BodyFieldExtractor {
    fn extract(&self, request: &AuthRequest) -> Option<String> {
        let value = request.body()?.get(&self.field)?;
        non_empty(value.as_str()?)
    }
}

/// Reads a named URL query parameter.
#[derive(Debug, Clone)]
pub struct QueryParamExtractor {
    param: String,
}

impl TokenExtractor for QueryParamExtractor {
    fn extract(&self, request: &AuthRequest) -> Option<String> {
        let query = request.query()?;
        form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == self.param.as_str())
            .and_then(|(_, value)| non_empty(&value))
    }
}

/// Reads the `authorization` header when it uses the configured scheme.
#[derive(Debug, Clone)]
pub struct AuthSchemeExtractor {
    scheme: String,
}

impl TokenExtractor for AuthSchemeExtractor {
    fn extract(&self, request: &AuthRequest) -> Option<String> {
        let header = parse_auth_header_value(request.headers().get(AUTHORIZATION)?)?;
        if header.scheme.eq_ignore_ascii_case(&self.scheme) {
            non_empty(header.value)
        } else {
            None
        }
    }
}

/// Ordered fallback over several rules; the first token found wins.
#[derive(Clone, Default)]
pub struct ExtractorChain {
    extractors: Vec<BoxedExtractor>,
}

impl ExtractorChain {
    /// Creates an empty chain, which never finds a token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule with lower priority than the ones already present.
    pub fn push(mut self, extractor: impl TokenExtractor + 'static) -> Self {
        self.extractors.push(Arc::new(extractor));
        self
    }

    /// Number of rules in the chain.
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// True if the chain holds no rules.
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl fmt::Debug for ExtractorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorChain")
            .field("len", &self.extractors.len())
            .finish()
    }
}

impl TokenExtractor for ExtractorChain {
    fn extract(&self, request: &AuthRequest) -> Option<String> {
        self.extractors.iter().find_map(|e| e.extract(request))
    }
}

/// Extracts the token from the header `name`.
pub fn from_header(name: impl Into<String>) -> HeaderExtractor {
    HeaderExtractor {
        name: name.into().to_ascii_lowercase(),
    }
}

/// Extracts the token from the body field `field`.
pub fn from_body_field(field: impl Into<String>) -> BodyFieldExtractor {
    BodyFieldExtractor {
        field: field.into(),
    }
}

/// Extracts the token from the URL query parameter `param`.
pub fn from_url_query_parameter(param: impl Into<String>) -> QueryParamExtractor {
    QueryParamExtractor {
        param: param.into(),
    }
}

/// Extracts the token from `authorization: <scheme> <token>`.
///
/// The scheme comparison is case-insensitive.
pub fn from_auth_header_with_scheme(scheme: impl Into<String>) -> AuthSchemeExtractor {
    AuthSchemeExtractor {
        scheme: scheme.into(),
    }
}

/// Extracts the token from `authorization: Bearer <token>`.
pub fn from_auth_header_as_bearer_token() -> AuthSchemeExtractor {
    from_auth_header_with_scheme(BEARER_AUTH_SCHEME)
}

/// Combines rules in priority order.
pub fn from_extractors<I>(extractors: I) -> ExtractorChain
where
    I: IntoIterator<Item = BoxedExtractor>,
{
    ExtractorChain {
        extractors: extractors.into_iter().collect(),
    }
}

/// A parsed `authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthHeader<'a> {
    /// Authentication scheme, as sent.
    pub scheme: &'a str,
    /// Credential following the scheme.
    pub value: &'a str,
}

/// Splits `<scheme> <value>` on the first whitespace run.
///
/// Anything after the value is ignored; fewer than two components yields
/// `None`.
pub fn parse_auth_header(header: &str) -> Option<AuthHeader<'_>> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    let value = parts.next()?;
    Some(AuthHeader { scheme, value })
}

/// Like [`parse_auth_header`], for a raw header value that may not be text.
pub fn parse_auth_header_value(header: &HeaderValue) -> Option<AuthHeader<'_>> {
    parse_auth_header(header.to_str().ok()?)
}

/// Declarative extraction rule, as written in configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum ExtractorSpec {
    /// A named header.
    Header {
        /// Header name.
        name: String,
    },
    /// A field of the parsed body.
    BodyField {
        /// Field name.
        field: String,
    },
    /// A URL query parameter.
    Query {
        /// Parameter name.
        param: String,
    },
    /// The `authorization` header with a given scheme.
    AuthScheme {
        /// Expected scheme.
        scheme: String,
    },
    /// The `authorization` header with the bearer scheme.
    Bearer,
}

impl ExtractorSpec {
    /// Builds the rule described by this entry.
    pub fn build(&self) -> BoxedExtractor {
        match self {
            Self::Header { name } => Arc::new(from_header(name.as_str())),
            Self::BodyField { field } => Arc::new(from_body_field(field.as_str())),
            Self::Query { param } => Arc::new(from_url_query_parameter(param.as_str())),
            Self::AuthScheme { scheme } => Arc::new(from_auth_header_with_scheme(scheme.as_str())),
            Self::Bearer => Arc::new(from_auth_header_as_bearer_token()),
        }
    }

    /// Short human-readable location, for logs.
    pub fn describe(&self) -> Cow<'static, str> {
        match self {
            Self::Header { name } => format!("header:{name}").into(),
            Self::BodyField { field } => format!("body:{field}").into(),
            Self::Query { param } => format!("query:{param}").into(),
            Self::AuthScheme { scheme } => format!("authorization:{scheme}").into(),
            Self::Bearer => Cow::Borrowed("authorization:bearer"),
        }
    }
}

/// Builds one chain from several specs, preserving their order.
pub fn chain_from_specs(specs: &[ExtractorSpec]) -> ExtractorChain {
    from_extractors(specs.iter().map(ExtractorSpec::build))
}
