//! # Predicate Tree
//!
//! Filter expressions as a recursive sum type, with in-memory evaluation.

use std::fmt;

use regex::Regex;
use serde_json::{Map, Value};

use super::value::{compare_values, lookup, values_equal};

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    /// Get the operator string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Gt => "$gt",
            CompareOp::Gte => "$gte",
            CompareOp::Lt => "$lt",
            CompareOp::Lte => "$lte",
        }
    }
}

/// Membership operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOp {
    In,
    NotIn,
}

impl MembershipOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipOp::In => "$in",
            MembershipOp::NotIn => "$nin",
        }
    }
}

/// Compiled `$regex` operand
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.0.is_match(s)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `{field: value}`
    Equal { field: String, value: Value },
    /// `{field: {$ne: value}}`
    NotEqual { field: String, value: Value },
    /// `{field: {$gt: value}}` and friends
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// `{field: {$in: [..]}}` / `{field: {$nin: [..]}}`
    Membership {
        field: String,
        op: MembershipOp,
        values: Vec<Value>,
    },
    /// `{field: {$exists: bool}}`
    Exists { field: String, exists: bool },
    /// `{field: {$regex: "..."}}`
    Pattern { field: String, pattern: Pattern },
    /// Every child must match; siblings in one object are an implicit `And`
    And(Vec<Predicate>),
    /// At least one child must match
    Or(Vec<Predicate>),
}

impl Predicate {
    /// Create an equality predicate
    pub fn equal(field: impl Into<String>, value: Value) -> Self {
        Predicate::Equal {
            field: field.into(),
            value,
        }
    }

    /// Create a comparison predicate
    pub fn compare(field: impl Into<String>, op: CompareOp, value: Value) -> Self {
        Predicate::Compare {
            field: field.into(),
            op,
            value,
        }
    }

    /// Create an "in list" predicate
    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Predicate::Membership {
            field: field.into(),
            op: MembershipOp::In,
            values,
        }
    }

    /// Combine two predicates, flattening nested `And`s
    pub fn and(self, other: Predicate) -> Predicate {
        let mut children = match self {
            Predicate::And(children) => children,
            p => vec![p],
        };
        match other {
            Predicate::And(more) => children.extend(more),
            p => children.push(p),
        }
        Predicate::And(children)
    }

    /// Field referenced by a leaf; `None` for `And`/`Or`
    pub fn field(&self) -> Option<&str> {
        match self {
            Predicate::Equal { field, .. }
            | Predicate::NotEqual { field, .. }
            | Predicate::Compare { field, .. }
            | Predicate::Membership { field, .. }
            | Predicate::Exists { field, .. }
            | Predicate::Pattern { field, .. } => Some(field),
            Predicate::And(_) | Predicate::Or(_) => None,
        }
    }

    /// Check if a document matches this predicate
    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        match self {
            Predicate::Equal { field, value } => {
                lookup(doc, field).is_some_and(|v| values_equal(v, value))
            }
            Predicate::NotEqual { field, value } => {
                !lookup(doc, field).is_some_and(|v| values_equal(v, value))
            }
            Predicate::Compare { field, op, value } => {
                let ordering = match lookup(doc, field).and_then(|v| compare_values(v, value)) {
                    Some(o) => o,
                    None => return false,
                };
                match op {
                    CompareOp::Gt => ordering.is_gt(),
                    CompareOp::Gte => ordering.is_ge(),
                    CompareOp::Lt => ordering.is_lt(),
                    CompareOp::Lte => ordering.is_le(),
                }
            }
            Predicate::Membership { field, op, values } => {
                let found = lookup(doc, field)
                    .is_some_and(|v| values.iter().any(|candidate| values_equal(v, candidate)));
                match op {
                    MembershipOp::In => found,
                    MembershipOp::NotIn => !found,
                }
            }
            Predicate::Exists { field, exists } => lookup(doc, field).is_some() == *exists,
            Predicate::Pattern { field, pattern } => lookup(doc, field)
                .and_then(Value::as_str)
                .is_some_and(|s| pattern.is_match(s)),
            Predicate::And(children) => children.iter().all(|p| p.matches(doc)),
            Predicate::Or(children) => children.iter().any(|p| p.matches(doc)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |f: &mut fmt::Formatter<'_>, children: &[Predicate]| -> fmt::Result {
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", child)?;
            }
            Ok(())
        };
        match self {
            Predicate::Equal { field, value } => write!(f, "{{{}:{}}}", field, value),
            Predicate::NotEqual { field, value } => write!(f, "{{{}:{{$ne:{}}}}}", field, value),
            Predicate::Compare { field, op, value } => {
                write!(f, "{{{}:{{{}:{}}}}}", field, op.as_str(), value)
            }
            Predicate::Membership { field, op, values } => {
                write!(f, "{{{}:{{{}:{}}}}}", field, op.as_str(), Value::from(values.clone()))
            }
            Predicate::Exists { field, exists } => {
                write!(f, "{{{}:{{$exists:{}}}}}", field, exists)
            }
            Predicate::Pattern { field, pattern } => write!(
                f,
                "{{{}:{{$regex:{}}}}}",
                field,
                Value::from(pattern.as_str())
            ),
            Predicate::And(children) => {
                write!(f, "{{$and:[")?;
                list(f, children)?;
                write!(f, "]}}")
            }
            Predicate::Or(children) => {
                write!(f, "{{$or:[")?;
                list(f, children)?;
                write!(f, "]}}")
            }
        }
    }
}
