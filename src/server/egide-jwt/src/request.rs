//! Request record read by the extraction rules.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{Map, Value};

/// Framework-agnostic view of an inbound request.
///
/// Adapters shape a transport request into this record once; the pipeline
/// only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<Map<String, Value>>,
}

impl AuthRequest {
    /// Creates a request for `url` (path plus optional query, e.g. `/a?b=c`).
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Replaces the header map.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds one header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the parsed body.
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the parsed body from a JSON value; non-objects clear it.
    pub fn with_json_body(mut self, body: Value) -> Self {
        self.body = match body {
            Value::Object(map) => Some(map),
            _ => None,
        };
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request target as received (path and query).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Header map.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Parsed body, if the adapter produced one.
    pub fn body(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref()
    }

    /// Raw query component, without the leading `?` or any fragment.
    pub fn query(&self) -> Option<&str> {
        let (_, rest) = self.url.split_once('?')?;
        Some(rest.split_once('#').map_or(rest, |(q, _)| q))
    }
}
