//! Aggregated validation issues
//!
//! Issues are keyed by request parameter (`filter`, `sort`, `skip`, `limit`,
//! `page`) or by document field. Every key keeps its messages in the order they
//! were raised, and keys serialize in lexical order.

use std::collections::BTreeMap;

use serde::Serialize;

/// Ordered mapping from a parameter or field name to its messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Issues(BTreeMap<String, Vec<String>>);

impl Issues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one message under `key`
    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(message.into());
    }

    /// Record several messages under `key`
    pub fn extend(&mut self, key: &str, messages: impl IntoIterator<Item = String>) {
        for message in messages {
            self.add(key, message);
        }
    }

    /// Fold another set of issues in, prefixing their keys with `prefix.`
    pub fn merge_nested(&mut self, prefix: &str, nested: Issues) {
        for (key, messages) in nested.0 {
            self.extend(&format!("{}.{}", prefix, key), messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys with at least one message
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Turns an empty set into `Ok(value)` and anything else into `Err(self)`
    pub fn into_result<T>(self, value: T) -> Result<T, Issues> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for Issues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_keep_insertion_order() {
        let mut issues = Issues::new();
        issues.add("filter", "second");
        issues.add("filter", "third");
        issues.add("limit", "bad");

        assert_eq!(issues.len(), 2);
        assert_eq!(issues.get("filter").unwrap(), ["second", "third"]);
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut issues = Issues::new();
        issues.add("sort", "invalid sort field: foo");

        let json = serde_json::to_value(&issues).unwrap();
        assert_eq!(json, serde_json::json!({"sort": ["invalid sort field: foo"]}));
    }

    #[test]
    fn test_merge_nested_prefixes_keys() {
        let mut nested = Issues::new();
        nested.add("city", "required");

        let mut issues = Issues::new();
        issues.merge_nested("address", nested);

        assert_eq!(issues.get("address.city").unwrap(), ["required"]);
        assert_eq!(issues.to_string(), "address.city: required");
    }
}
