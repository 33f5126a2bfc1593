//! # REST API Module
//!
//! Turns CRUD verbs on resource paths into validated, filtered and paginated
//! storage operations, with exact status codes and an `X-Total` count header.

pub mod errors;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use errors::{ErrorResponse, RestError, RestResult};
pub use handler::RestHandler;
pub use request::Request;
pub use response::{Response, X_TOTAL};
pub use server::RestServer;
