//! Document validation against a schema
//!
//! Validation semantics:
//! - Undeclared fields are rejected
//! - Read-only fields may not be set by clients, or changed on update
//! - Nested objects are validated against the matching original sub-document
//! - The identity field may not change once an item exists
//! - Required fields must be present after defaults are applied
//! - `null` removes an optional field
//! - Every value passes through its field's validator and is stored normalised
//!
//! Validation never stops at the first problem; all issues are collected.

use serde_json::{Map, Value};

use super::issues::Issues;
use super::kinds::FieldKind;
use super::types::{Schema, ID_FIELD};

/// Document payload as stored in an item
pub type Document = Map<String, Value>;

/// Validates documents for create, replace and partial update
pub struct DocumentValidator<'a> {
    schema: &'a Schema,
    assigned: Option<&'a str>,
}

impl<'a> DocumentValidator<'a> {
    /// Creates a new validator bound to `schema`
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            assigned: None,
        }
    }

    /// Marks `field` as assigned by the server (a sub-resource's parent link).
    ///
    /// Its value is still validated, but read-only does not apply to it.
    pub fn with_assigned(mut self, field: Option<&'a str>) -> Self {
        self.assigned = field;
        self
    }

    /// Validates a new document.
    ///
    /// Read-only fields are rejected when present, defaults are applied to
    /// absent fields.
    pub fn validate_create(&self, payload: Document) -> Result<Document, Issues> {
        self.validate(payload, None)
    }

    /// Validates a full replacement of `original`.
    ///
    /// Read-only fields missing from `payload` keep their original value; any
    /// other value for them is rejected.
    pub fn validate_replace(
        &self,
        mut payload: Document,
        original: &Document,
    ) -> Result<Document, Issues> {
        self.keep_read_only(&mut payload, original);
        self.validate(payload, Some(original))
    }

    /// Validates a partial update: `patch` is merged over `original` first.
    ///
    /// A `null` in the patch removes the field.
    pub fn validate_update(&self, patch: Document, original: &Document) -> Result<Document, Issues> {
        let mut merged = original.clone();
        for (key, value) in patch {
            merged.insert(key, value);
        }
        self.validate(merged, Some(original))
    }

    fn keep_read_only(&self, payload: &mut Document, original: &Document) {
        for (name, def) in &self.schema.fields {
            if def.read_only && !payload.contains_key(name) {
                if let Some(value) = original.get(name) {
                    payload.insert(name.clone(), value.clone());
                }
            }
        }
    }

    /// Validates a nested document, replacing `original` when there is one
    fn validate_nested(
        &self,
        mut payload: Document,
        original: Option<&Document>,
    ) -> Result<Document, Issues> {
        if let Some(original) = original {
            self.keep_read_only(&mut payload, original);
        }
        self.validate(payload, original)
    }

    fn validate(&self, payload: Document, original: Option<&Document>) -> Result<Document, Issues> {
        let mut issues = Issues::new();
        let mut out = Document::new();

        for (name, value) in payload {
            let def = match self.schema.fields.get(&name) {
                Some(def) => def,
                None => {
                    issues.add(name, "invalid field");
                    continue;
                }
            };

            if def.read_only && self.assigned != Some(name.as_str()) {
                let unchanged = original.and_then(|o| o.get(&name)) == Some(&value);
                if !unchanged {
                    issues.add(name, "read-only");
                    continue;
                }
            }

            if name == ID_FIELD {
                if let Some(original_id) = original.and_then(|o| o.get(ID_FIELD)) {
                    if original_id != &value {
                        issues.add(name, "cannot be changed");
                        continue;
                    }
                }
            }

            if value.is_null() {
                continue;
            }

            if let (FieldKind::Object { schema }, Value::Object(sub)) = (&def.kind, &value) {
                let original_sub = original
                    .and_then(|o| o.get(&name))
                    .and_then(Value::as_object);
                match DocumentValidator::new(schema).validate_nested(sub.clone(), original_sub) {
                    Ok(normalised) => {
                        out.insert(name, Value::Object(normalised));
                    }
                    Err(nested) => issues.add(name, nested.to_string()),
                }
                continue;
            }

            match def.validate(&value) {
                Ok(normalised) => {
                    out.insert(name, normalised);
                }
                Err(reason) => issues.add(name, reason),
            }
        }

        for (name, def) in &self.schema.fields {
            if out.contains_key(name) || issues.get(name).is_some() {
                continue;
            }
            if original.is_none() {
                if let Some(default) = &def.default {
                    out.insert(name.clone(), default.clone());
                    continue;
                }
            }
            // the identity is assigned by the handler, not the payload
            if def.required && name != ID_FIELD {
                issues.add(name.clone(), "required");
            }
        }

        issues.into_result(out)
    }
}
