//! Sort order
//!
//! `sort=name,-age` sorts by `name` ascending, then `age` descending.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::value::{compare_total, lookup};

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub reversed: bool,
}

impl SortField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reversed: false,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reversed: true,
        }
    }
}

/// Ordered list of sort keys. Empty means "no explicit order".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sort(Vec<SortField>);

impl Sort {
    pub fn new(fields: Vec<SortField>) -> Self {
        Self(fields)
    }

    /// Parses `a,-b`. Field existence is checked by the query validator.
    pub fn parse(raw: &str) -> Result<Self, String> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut fields = Vec::new();
        for part in raw.split(',') {
            let part = part.trim();
            let (name, reversed) = match part.strip_prefix('-') {
                Some(name) => (name, true),
                None => (part, false),
            };
            if name.is_empty() {
                return Err("empty sort field".to_string());
            }
            fields.push(SortField {
                name: name.to_string(),
                reversed,
            });
        }
        Ok(Self(fields))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[SortField] {
        &self.0
    }

    /// Compares two documents key by key
    pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        for field in &self.0 {
            let ordering = compare_total(lookup(a, &field.name), lookup(b, &field.name));
            let ordering = if field.reversed {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            if field.reversed {
                write!(f, "-")?;
            }
            write!(f, "{}", field.name)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Sort {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Sort::parse(&raw)
    }
}

impl From<Sort> for String {
    fn from(sort: Sort) -> Self {
        sort.to_string()
    }
}
