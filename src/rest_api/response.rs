//! # Response Formatting
//!
//! Status, headers and JSON body produced by the handler.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::Value;

use super::errors::{ErrorResponse, RestError};

/// Header carrying the item count of list and bulk-delete responses
pub static X_TOTAL: HeaderName = HeaderName::from_static("x-total");

/// Handler response
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `None` for 204 responses
    pub body: Option<Value>,
}

impl Response {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Some(body),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.headers.insert(X_TOTAL.clone(), HeaderValue::from(total));
        self
    }

    /// Sets a strong, quoted ETag
    pub fn with_etag(mut self, etag: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(&format!("\"{}\"", etag)) {
            self.headers.insert(header::ETAG, value);
        }
        self
    }

    /// `X-Total` header value
    pub fn total(&self) -> Option<usize> {
        self.headers
            .get(&X_TOTAL)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    }

    /// ETag without quotes
    pub fn etag(&self) -> Option<&str> {
        self.headers
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim_matches('"'))
    }
}

impl From<RestError> for Response {
    fn from(err: RestError) -> Self {
        let status = err.status_code();
        let body = serde_json::to_value(ErrorResponse::from(err)).unwrap_or(Value::Null);
        Self::json(status, body)
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self.body {
            Some(body) => (self.status, self.headers, Json(body)).into_response(),
            None => (self.status, self.headers).into_response(),
        }
    }
}
