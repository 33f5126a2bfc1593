//! # REST API Errors
//!
//! Error types for the REST API module, and the JSON error envelope
//! `{"code": .., "message": .., "issues": {..}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::resource::StorageError;
use crate::schema::Issues;

/// Result type for REST operations
pub type RestResult<T> = Result<T, RestError>;

/// Client closed the request before a response was produced
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// REST API errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RestError {
    // ==================
    // Client Errors (4xx)
    // ==================
    /// No resource is bound at the request path
    #[error("Resource Not Found")]
    ResourceNotFound,

    /// The addressed item (or one of its parents) does not exist
    #[error("Not Found")]
    NotFound,

    /// The resource does not allow the requested mode
    #[error("Invalid method")]
    ModeNotAllowed,

    /// The HTTP method has no meaning for the path
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    /// Query parameters failed validation
    #[error("URL parameters contain error(s)")]
    InvalidParams(Issues),

    /// Request body failed schema validation
    #[error("Document contains error(s)")]
    InvalidDocument(Issues),

    /// Request body is not a JSON object
    #[error("Malformed body: {0}")]
    MalformedBody(String),

    /// Duplicate id or ETag mismatch
    #[error("Conflict")]
    Conflict,

    /// The request was cancelled by the caller
    #[error("Request canceled")]
    Canceled,

    // ==================
    // Server Errors (5xx)
    // ==================
    /// The resource has no storage backend
    #[error("No Storage Defined")]
    NotConfigured,

    /// The request deadline passed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Storage backend failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RestError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RestError::MalformedBody(_) => StatusCode::BAD_REQUEST,

            // 404 Not Found
            RestError::ResourceNotFound => StatusCode::NOT_FOUND,
            RestError::NotFound => StatusCode::NOT_FOUND,

            // 405 Method Not Allowed
            RestError::ModeNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            RestError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,

            RestError::Conflict => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            RestError::InvalidParams(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RestError::InvalidDocument(_) => StatusCode::UNPROCESSABLE_ENTITY,

            RestError::Canceled => StatusCode::from_u16(CLIENT_CLOSED_REQUEST)
                .unwrap_or(StatusCode::REQUEST_TIMEOUT),

            // 5xx
            RestError::NotConfigured => StatusCode::NOT_IMPLEMENTED,
            RestError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            RestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Validation issues carried by the error, if any
    pub fn issues(&self) -> Option<&Issues> {
        match self {
            RestError::InvalidParams(issues) | RestError::InvalidDocument(issues) => Some(issues),
            _ => None,
        }
    }
}

impl From<StorageError> for RestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => RestError::NotFound,
            StorageError::Conflict => RestError::Conflict,
            StorageError::Canceled => RestError::Canceled,
            StorageError::DeadlineExceeded => RestError::DeadlineExceeded,
            StorageError::Backend(reason) => RestError::Internal(reason),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Issues>,
}

impl From<RestError> for ErrorResponse {
    fn from(err: RestError) -> Self {
        let code = err.status_code().as_u16();
        let message = err.to_string();
        let issues = match err {
            RestError::InvalidParams(issues) | RestError::InvalidDocument(issues)
                if !issues.is_empty() =>
            {
                Some(issues)
            }
            _ => None,
        };
        Self {
            code,
            message,
            issues,
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::from(self));
        (status, body).into_response()
    }
}
