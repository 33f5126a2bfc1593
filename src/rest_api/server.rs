//! # REST API HTTP Server
//!
//! Axum adapter: one fallback route feeds every request to the
//! [`RestHandler`], so resource paths need no per-route registration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, Uri},
    response::IntoResponse,
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::resource::{Index, RequestContext};

use super::errors::RestError;
use super::handler::RestHandler;
use super::request::Request;
use super::response::Response;

/// REST API server state
pub struct RestServer {
    handler: RestHandler,
    request_timeout: Duration,
}

impl RestServer {
    pub fn new(index: Arc<Index>, request_timeout: Duration) -> Self {
        Self {
            handler: RestHandler::new(index),
            request_timeout,
        }
    }

    /// Build the Axum router
    pub fn router(self) -> Router {
        let state = Arc::new(self);

        Router::new()
            .fallback(dispatch_handler)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state)
    }
}

/// Shared state type
type ServerState = Arc<RestServer>;

/// Translates the HTTP request and runs it under the request deadline
async fn dispatch_handler(
    State(server): State<ServerState>,
    method: Method,
    uri: Uri,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let req = Request {
        method,
        path: uri.path().to_string(),
        params,
        headers,
        body: body.to_vec(),
    };
    let ctx = RequestContext::new().with_timeout(server.request_timeout);

    match tokio::time::timeout(server.request_timeout, server.handler.serve(&ctx, &req)).await {
        Ok(response) => response,
        Err(_) => Response::from(RestError::DeadlineExceeded),
    }
}
