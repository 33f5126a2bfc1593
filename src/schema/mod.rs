//! Schema subsystem
//!
//! Schemas declare the fields of a resource and what may be done with them:
//! which fields can be filtered or sorted on, which are required or read-only,
//! and which value kind each field accepts.
//!
//! # Design Principles
//!
//! - Schemas are compiled once when a resource is bound
//! - Every field kind implements the same [`Validator`] contract
//! - Validation collects every issue instead of stopping at the first
//! - Values are normalised by their validator before they are stored or compared

mod errors;
mod issues;
mod kinds;
mod types;
mod validator;

pub use errors::{SchemaError, SchemaResult};
pub use issues::Issues;
pub use kinds::{FieldKind, StringPattern, Validator};
pub use types::{FieldDef, Schema, ID_FIELD};
pub use validator::{Document, DocumentValidator};

pub(crate) use kinds::parse_time;
