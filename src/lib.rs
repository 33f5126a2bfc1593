//! restlayer - schema-driven REST resources over pluggable storage
//!
//! Turns CRUD verbs into validated, filtered and paginated operations:
//!
//! ```text
//! request params -> query (parse + validate against schema)
//!                -> rest_api handler (storage bound? mode allowed?)
//!                -> resource Storer -> response (status, body, X-Total, ETag)
//! ```

pub mod cli;
pub mod http_server;
pub mod query;
pub mod resource;
pub mod rest_api;
pub mod schema;
pub mod storage;
