//! # HTTP Server
//!
//! Binds the REST router to a TCP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::resource::Index;
use crate::rest_api::RestServer;

use super::config::HttpServerConfig;

/// HTTP server serving every resource of an [`Index`]
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(index: Arc<Index>) -> Self {
        Self::with_config(index, HttpServerConfig::default())
    }

    pub fn with_config(index: Arc<Index>, config: HttpServerConfig) -> Self {
        let router = RestServer::new(index, config.request_timeout()).router();
        Self { config, router }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self.config.socket_addr().parse().map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid socket address {}: {}", self.config.socket_addr(), e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "restlayer listening");
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
