//! Field kinds and their value validators
//!
//! Supported kinds:
//! - any: accepts every value unchanged
//! - string: UTF-8 string with optional length bounds and pattern
//! - integer: 64-bit signed integer with optional bounds
//! - float: 64-bit floating point with optional bounds
//! - bool: boolean
//! - time: RFC 3339 timestamp, normalised to UTC
//! - object: nested document with its own schema
//! - array: list whose elements share one kind
//! - enum: string restricted to a fixed set
//!
//! Kinds defined outside this crate plug in through [`FieldKind::Custom`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::types::Schema;
use super::validator::DocumentValidator;

/// Value validation capability shared by every field kind.
///
/// `validate` returns the normalised value that should be stored or compared,
/// or a short human-readable reason.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Validate and normalise a raw value
    fn validate(&self, value: &Value) -> Result<Value, String>;

    /// Describe the accepted shape as a JSON object
    fn describe(&self) -> Value;

    /// Whether `$gt`, `$gte`, `$lt` and `$lte` make sense on this kind
    fn comparable(&self) -> bool {
        false
    }
}

/// Regular expression a string field must match.
///
/// Compiled when the schema is compiled and reused for every value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StringPattern {
    source: String,
    compiled: OnceLock<Regex>,
}

impl StringPattern {
    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn compile(&self) -> Result<&Regex, String> {
        if let Some(re) = self.compiled.get() {
            return Ok(re);
        }
        let re = Regex::new(&self.source).map_err(|e| e.to_string())?;
        Ok(self.compiled.get_or_init(|| re))
    }
}

impl From<String> for StringPattern {
    fn from(source: String) -> Self {
        Self {
            source,
            compiled: OnceLock::new(),
        }
    }
}

impl From<&str> for StringPattern {
    fn from(source: &str) -> Self {
        Self::from(source.to_string())
    }
}

impl From<StringPattern> for String {
    fn from(pattern: StringPattern) -> Self {
        pattern.source
    }
}

impl fmt::Display for StringPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Built-in field kinds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// No constraint on the value
    #[default]
    Any,
    /// UTF-8 string
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_len: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<StringPattern>,
    },
    /// 64-bit signed integer
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    /// 64-bit floating point
    Float {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Boolean
    Bool,
    /// RFC 3339 timestamp
    Time,
    /// Nested document
    Object { schema: Schema },
    /// Homogeneous array
    Array {
        values: Box<FieldKind>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min_len: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_len: Option<usize>,
    },
    /// One of a fixed set of strings
    Enum { allowed: Vec<String> },
    /// Validator supplied by the embedding application
    #[serde(skip)]
    Custom(Arc<dyn Validator>),
}

impl FieldKind {
    /// Unconstrained string
    pub fn string() -> Self {
        FieldKind::String {
            min_len: None,
            max_len: None,
            pattern: None,
        }
    }

    /// Unbounded integer
    pub fn integer() -> Self {
        FieldKind::Integer { min: None, max: None }
    }

    /// Unbounded float
    pub fn float() -> Self {
        FieldKind::Float { min: None, max: None }
    }

    /// Array of `values` without length bounds
    pub fn array(values: FieldKind) -> Self {
        FieldKind::Array {
            values: Box::new(values),
            min_len: None,
            max_len: None,
        }
    }

    /// Enumerated string set
    pub fn one_of<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldKind::Enum {
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the kind name for messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::String { .. } => "string",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Float { .. } => "float",
            FieldKind::Bool => "bool",
            FieldKind::Time => "time",
            FieldKind::Object { .. } => "object",
            FieldKind::Array { .. } => "array",
            FieldKind::Enum { .. } => "enum",
            FieldKind::Custom(_) => "custom",
        }
    }

    /// Convert a raw path segment (`/users/{id}`) into a value of this kind.
    ///
    /// Numeric kinds parse the segment; everything else keeps it as a string
    /// and leaves rejection to `validate`.
    pub fn parse_path_value(&self, raw: &str) -> Value {
        match self {
            FieldKind::Integer { .. } => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            FieldKind::Float { .. } => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            _ => Value::String(raw.to_string()),
        }
    }

    /// Checks the kind definition itself (patterns compile, nested schemas are sound)
    pub(crate) fn check_definition(&self) -> Result<(), String> {
        match self {
            FieldKind::String {
                pattern: Some(p), ..
            } => p.compile().map(|_| ()),
            FieldKind::Array { values, .. } => values.check_definition(),
            _ => Ok(()),
        }
    }
}

impl Validator for FieldKind {
    fn validate(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldKind::Any => Ok(value.clone()),
            FieldKind::String {
                min_len,
                max_len,
                pattern,
            } => {
                let s = value.as_str().ok_or("not a string")?;
                let len = s.chars().count();
                check_len(len, *min_len, *max_len)?;
                if let Some(pattern) = pattern {
                    if !pattern.compile()?.is_match(s) {
                        return Err(format!("does not match pattern {}", pattern));
                    }
                }
                Ok(value.clone())
            }
            FieldKind::Integer { min, max } => {
                let n = as_integer(value).ok_or("not an integer")?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("is lower than {}", min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("is greater than {}", max));
                    }
                }
                Ok(Value::from(n))
            }
            FieldKind::Float { min, max } => {
                let n = value.as_f64().ok_or("not a number")?;
                if let Some(min) = min {
                    if n < *min {
                        return Err(format!("is lower than {}", min));
                    }
                }
                if let Some(max) = max {
                    if n > *max {
                        return Err(format!("is greater than {}", max));
                    }
                }
                Ok(value.clone())
            }
            FieldKind::Bool => {
                if value.is_boolean() {
                    Ok(value.clone())
                } else {
                    Err("not a boolean".to_string())
                }
            }
            FieldKind::Time => {
                let s = value.as_str().ok_or("not a time")?;
                let parsed = parse_time(s).ok_or("not a time")?;
                Ok(Value::String(
                    parsed.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                ))
            }
            FieldKind::Object { schema } => {
                let obj = value.as_object().ok_or("not an object")?;
                DocumentValidator::new(schema)
                    .validate_create(obj.clone())
                    .map(Value::Object)
                    .map_err(|issues| issues.to_string())
            }
            FieldKind::Array {
                values,
                min_len,
                max_len,
            } => {
                let arr = value.as_array().ok_or("not an array")?;
                check_len(arr.len(), *min_len, *max_len)?;
                arr.iter()
                    .enumerate()
                    .map(|(i, elem)| {
                        values
                            .validate(elem)
                            .map_err(|reason| format!("invalid value at #{}: {}", i + 1, reason))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            FieldKind::Enum { allowed } => {
                let s = value.as_str().ok_or("not a string")?;
                if allowed.iter().any(|a| a == s) {
                    Ok(value.clone())
                } else {
                    Err(format!("not one of [{}]", allowed.join(", ")))
                }
            }
            FieldKind::Custom(validator) => validator.validate(value),
        }
    }

    fn describe(&self) -> Value {
        match self {
            FieldKind::Any => json!({}),
            FieldKind::String {
                min_len,
                max_len,
                pattern,
            } => {
                let mut shape = json!({"type": "string"});
                put_opt(&mut shape, "minLength", min_len.map(Value::from));
                put_opt(&mut shape, "maxLength", max_len.map(Value::from));
                put_opt(&mut shape, "pattern", pattern.as_ref().map(|p| Value::from(p.as_str())));
                shape
            }
            FieldKind::Integer { min, max } => {
                let mut shape = json!({"type": "integer"});
                put_opt(&mut shape, "minimum", min.map(Value::from));
                put_opt(&mut shape, "maximum", max.map(Value::from));
                shape
            }
            FieldKind::Float { min, max } => {
                let mut shape = json!({"type": "number"});
                put_opt(&mut shape, "minimum", min.map(Value::from));
                put_opt(&mut shape, "maximum", max.map(Value::from));
                shape
            }
            FieldKind::Bool => json!({"type": "boolean"}),
            FieldKind::Time => json!({"type": "string", "format": "date-time"}),
            FieldKind::Object { schema } => schema.describe(),
            FieldKind::Array {
                values,
                min_len,
                max_len,
            } => {
                let mut shape = json!({"type": "array", "items": values.describe()});
                put_opt(&mut shape, "minItems", min_len.map(Value::from));
                put_opt(&mut shape, "maxItems", max_len.map(Value::from));
                shape
            }
            FieldKind::Enum { allowed } => json!({"type": "string", "enum": allowed}),
            FieldKind::Custom(validator) => validator.describe(),
        }
    }

    fn comparable(&self) -> bool {
        match self {
            FieldKind::Any | FieldKind::Integer { .. } | FieldKind::Float { .. } | FieldKind::Time => true,
            FieldKind::Custom(validator) => validator.comparable(),
            _ => false,
        }
    }
}

/// Accepts integral floats (`3.0`) the way JSON clients tend to send them
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn check_len(len: usize, min: Option<usize>, max: Option<usize>) -> Result<(), String> {
    if let Some(min) = min {
        if len < min {
            return Err(format!("is shorter than {}", min));
        }
    }
    if let Some(max) = max {
        if len > max {
            return Err(format!("is longer than {}", max));
        }
    }
    Ok(())
}

fn put_opt(shape: &mut Value, key: &str, value: Option<Value>) {
    if let (Some(obj), Some(value)) = (shape.as_object_mut(), value) {
        obj.insert(key.to_string(), value);
    }
}

/// Parses an RFC 3339 timestamp into UTC
pub(crate) fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
