//! # HTTP Server Module
//!
//! Serves a bound resource index over HTTP. Every path is handed to the REST
//! handler, which resolves it against the index.

pub mod config;
pub mod server;

pub use config::HttpServerConfig;
pub use server::HttpServer;
