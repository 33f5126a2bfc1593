//! # Request
//!
//! Transport-neutral request handed to the [`RestHandler`](super::RestHandler).

use std::borrow::Cow;
use std::collections::HashMap;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;

/// One incoming request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Path below the mount point, e.g. `/users/42`
    pub path: String,
    /// Decoded query parameters
    pub params: HashMap<String, String>,
    pub headers: HeaderMap,
    /// Raw body; empty when none was sent
    pub body: Vec<u8>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Adds a header; invalid values are ignored
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, body: &Value) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        self.with_body(bytes)
    }

    /// Non-empty, percent-decoded path segments.
    ///
    /// A segment that does not decode to UTF-8 is kept as sent.
    pub fn segments(&self) -> Vec<Cow<'_, str>> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).unwrap_or(Cow::Borrowed(s)))
            .collect()
    }

    /// `If-Match` header value, when present and readable
    pub fn if_match(&self) -> Option<&str> {
        self.headers
            .get(header::IF_MATCH)
            .and_then(|v| v.to_str().ok())
    }
}
