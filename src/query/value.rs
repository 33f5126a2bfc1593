//! Value lookup and ordering helpers shared by predicate evaluation and sorting

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::schema::parse_time;

/// Resolve a dotted path inside a document
pub fn lookup<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

/// Equality that treats `1` and `1.0` as the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

/// Orders two values of the same class.
///
/// Numbers compare numerically. Strings are keyed by (parsed instant, raw
/// text): RFC 3339 timestamps come first in chronological order, everything
/// else follows lexically. Mixed classes are unordered.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                return Some(x.cmp(&y));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(compare_strings(x, y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_strings(a: &str, b: &str) -> Ordering {
    match (parse_time(a), parse_time(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Total order used for sorting.
///
/// Ordering rules:
/// - missing < null < bool < number < string < array < object
/// - For same classes, natural ordering
pub fn compare_total(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let rank = |v: &Value| -> u8 {
                match v {
                    Value::Null => 0,
                    Value::Bool(_) => 1,
                    Value::Number(_) => 2,
                    Value::String(_) => 3,
                    Value::Array(_) => 4,
                    Value::Object(_) => 5,
                }
            };
            rank(a)
                .cmp(&rank(b))
                .then_with(|| compare_values(a, b).unwrap_or(Ordering::Equal))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_nested() {
        let doc = json!({"address": {"city": "Oslo"}, "name": "A"});
        let doc = doc.as_object().unwrap();

        assert_eq!(lookup(doc, "address.city"), Some(&json!("Oslo")));
        assert_eq!(lookup(doc, "name.first"), None);
        assert_eq!(lookup(doc, "missing"), None);
    }

    #[test]
    fn test_numbers_compare_across_representations() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert_eq!(compare_values(&json!(2), &json!(10.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(2), &json!("2")), None);
    }

    #[test]
    fn test_times_compare_chronologically() {
        // lexical order would put the fractional timestamp first
        let a = json!("2024-01-01T00:00:00Z");
        let b = json!("2024-01-01T00:00:00.5Z");
        assert_eq!(compare_values(&a, &b), Some(Ordering::Less));
    }

    #[test]
    fn test_mixed_strings_order_is_transitive() {
        let mut values = vec![
            json!("2024-01-01T10:00:00+09:00"),
            json!("2024-01-01T03:00:00Z"),
            json!("2024-01-01T05:00:00Z"),
            json!("2024-01-01T01:00:00Z"),
            json!("2024-01-01T07:00:00Z"),
            json!("2024-01-01T04:00:00Z"),
        ];
        // every pair agrees in both directions and chains consistently
        for a in &values {
            for b in &values {
                let ab = compare_values(a, b).unwrap();
                assert_eq!(ab.reverse(), compare_values(b, a).unwrap());
                for c in &values {
                    let bc = compare_values(b, c).unwrap();
                    if ab != Ordering::Greater && bc != Ordering::Greater {
                        assert_ne!(compare_values(a, c), Some(Ordering::Greater));
                    }
                }
            }
        }

        values.push(json!("2024-01-01T04:30:00 local"));
        values.sort_by(|a, b| compare_total(Some(a), Some(b)));
        assert_eq!(
            values,
            vec![
                json!("2024-01-01T01:00:00Z"),
                json!("2024-01-01T10:00:00+09:00"),
                json!("2024-01-01T03:00:00Z"),
                json!("2024-01-01T04:00:00Z"),
                json!("2024-01-01T05:00:00Z"),
                json!("2024-01-01T07:00:00Z"),
                json!("2024-01-01T04:30:00 local"),
            ]
        );
    }

    #[test]
    fn test_same_instant_falls_back_to_text() {
        let a = json!("2024-01-01T10:00:00+09:00");
        let b = json!("2024-01-01T01:00:00Z");
        assert_eq!(compare_values(&a, &b), Some(Ordering::Greater));
        assert_eq!(compare_values(&b, &a), Some(Ordering::Less));
    }

    #[test]
    fn test_total_order_ranks_classes() {
        assert_eq!(compare_total(None, Some(&json!(null))), Ordering::Less);
        assert_eq!(
            compare_total(Some(&json!(true)), Some(&json!(0))),
            Ordering::Less
        );
        assert_eq!(
            compare_total(Some(&json!("b")), Some(&json!("a"))),
            Ordering::Greater
        );
    }
}
