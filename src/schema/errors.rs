//! Schema definition errors
//!
//! These are raised while a schema is compiled at bind time, never while a
//! request is served. Request-time problems are reported as [`super::Issues`].

use thiserror::Error;

/// Result type for schema compilation
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Structural problems in a schema definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The same field name was declared twice
    #[error("duplicate field: {0}")]
    DuplicateField(String),

    /// Empty names, dotted names and `$`-prefixed names are reserved
    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    /// A default value does not satisfy the field's own validator
    #[error("field {field}: invalid default value: {reason}")]
    InvalidDefault { field: String, reason: String },

    /// A string pattern does not compile
    #[error("field {field}: invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },
}

impl SchemaError {
    /// Prefix the offending field with its parent path
    pub(crate) fn nested_in(self, parent: &str) -> Self {
        let join = |field: String| format!("{}.{}", parent, field);
        match self {
            SchemaError::DuplicateField(f) => SchemaError::DuplicateField(join(f)),
            SchemaError::InvalidFieldName(f) => SchemaError::InvalidFieldName(join(f)),
            SchemaError::InvalidDefault { field, reason } => SchemaError::InvalidDefault {
                field: join(field),
                reason,
            },
            SchemaError::InvalidPattern { field, reason } => SchemaError::InvalidPattern {
                field: join(field),
                reason,
            },
        }
    }
}
