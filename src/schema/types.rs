//! Schema type definitions
//!
//! A schema is an ordered mapping from field name to [`FieldDef`]. Nested
//! documents are described with [`FieldKind::Object`] and addressed with
//! dotted paths (`address.city`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::errors::{SchemaError, SchemaResult};
use super::kinds::{FieldKind, Validator};

/// Name of the identity field every resource schema carries
pub const ID_FIELD: &str = "id";

/// Field definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDef {
    /// Value kind and its constraints
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether the field must be present on write
    #[serde(default)]
    pub required: bool,
    /// Whether clients may set the field
    #[serde(default)]
    pub read_only: bool,
    /// Whether filter predicates may reference the field
    #[serde(default)]
    pub filterable: bool,
    /// Whether sort clauses may reference the field
    #[serde(default)]
    pub sortable: bool,
    /// Value applied on create when the field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDef {
    /// Create an optional, non-queryable field of the given kind
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Field accepting any value
    pub fn any() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// The identity field implied when a schema does not declare one
    pub fn implied_id() -> Self {
        Self::new(FieldKind::string()).filterable().sortable()
    }

    /// Validate a value against this field's kind
    pub fn validate(&self, value: &Value) -> Result<Value, String> {
        self.kind.validate(value)
    }
}

/// Complete schema definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field definitions
    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,
}

impl Schema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from `(name, def)` pairs, rejecting duplicates
    pub fn from_fields<I, S>(fields: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = (S, FieldDef)>,
        S: Into<String>,
    {
        let mut schema = Schema::new();
        for (name, def) in fields {
            let name = name.into();
            if schema.fields.contains_key(&name) {
                return Err(SchemaError::DuplicateField(name));
            }
            schema.fields.insert(name, def);
        }
        Ok(schema)
    }

    /// Add or replace a field (builder style)
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Resolve a possibly dotted field path
    pub fn get(&self, path: &str) -> Option<&FieldDef> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let def = self.fields.get(head)?;
        match rest {
            None => Some(def),
            Some(rest) => match &def.kind {
                FieldKind::Object { schema } => schema.get(rest),
                _ => None,
            },
        }
    }

    /// Definition of the identity field.
    ///
    /// Compiled schemas always declare it; an uncompiled schema falls back to
    /// nothing and callers treat the id as an untyped string.
    pub fn id_field(&self) -> Option<&FieldDef> {
        self.fields.get(ID_FIELD)
    }

    /// Validates the schema structure and adds the implied identity field.
    ///
    /// Called once when a resource is bound.
    pub fn compile(mut self) -> SchemaResult<Self> {
        self.check_structure()?;
        self.fields
            .entry(ID_FIELD.to_string())
            .or_insert_with(FieldDef::implied_id);
        Ok(self)
    }

    fn check_structure(&self) -> SchemaResult<()> {
        for (name, def) in &self.fields {
            if name.is_empty() || name.contains('.') || name.starts_with('$') {
                return Err(SchemaError::InvalidFieldName(name.clone()));
            }

            def.kind
                .check_definition()
                .map_err(|reason| SchemaError::InvalidPattern {
                    field: name.clone(),
                    reason,
                })?;

            if let Some(default) = &def.default {
                def.validate(default)
                    .map_err(|reason| SchemaError::InvalidDefault {
                        field: name.clone(),
                        reason,
                    })?;
            }

            if let FieldKind::Object { schema } = &def.kind {
                schema.check_structure().map_err(|e| e.nested_in(name))?;
            }
        }
        Ok(())
    }

    /// Describe every field's accepted shape
    pub fn describe(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, def) in &self.fields {
            let mut shape = def.kind.describe();
            if let Some(obj) = shape.as_object_mut() {
                if def.read_only {
                    obj.insert("readOnly".into(), Value::Bool(true));
                }
                if let Some(default) = &def.default {
                    obj.insert("default".into(), default.clone());
                }
            }
            if def.required {
                required.push(Value::String(name.clone()));
            }
            properties.insert(name.clone(), shape);
        }
        let mut shape = json!({"type": "object", "properties": properties});
        if !required.is_empty() {
            shape["required"] = Value::Array(required);
        }
        shape
    }
}
