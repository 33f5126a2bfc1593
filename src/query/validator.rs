//! Query validation
//!
//! Turns raw request parameters into a [`Query`] checked against a schema.
//!
//! Validation semantics:
//! - Every filter leaf must reference a declared, filterable field
//! - Filter values are validated and normalised by the field's kind
//! - Range operators need a comparable kind
//! - Sort fields must be declared and sortable
//! - `skip`, `limit` and `page` must be well-formed integers
//!
//! All problems are collected into one [`Issues`] set keyed by parameter.

use std::collections::HashMap;

use serde_json::Value;

use crate::schema::{FieldDef, Issues, Schema, Validator};

use super::parser::parse_filter;
use super::predicate::Predicate;
use super::sort::Sort;
use super::types::{Query, Window};

/// `limit` value that disables windowing
pub const UNLIMITED: &str = "unlimited";

/// Query parameters as received, before any parsing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub skip: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

impl RawQuery {
    /// Picks the query parameters out of a request's parameter map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).cloned();
        Self {
            filter: get("filter"),
            sort: get("sort"),
            skip: get("skip"),
            limit: get("limit"),
            page: get("page"),
        }
    }
}

/// Requested limit before the default is applied
enum Limit {
    Absent,
    Unlimited,
    Max(usize),
}

/// Validates raw queries against one schema
pub struct QueryValidator<'a> {
    schema: &'a Schema,
    default_sort: Option<&'a Sort>,
}

impl<'a> QueryValidator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            default_sort: None,
        }
    }

    /// Sort applied when the request does not give one
    pub fn with_default_sort(mut self, sort: &'a Sort) -> Self {
        self.default_sort = Some(sort);
        self
    }

    /// Validates `raw`. `default_limit` applies when no `limit` is given.
    pub fn validate(&self, raw: &RawQuery, default_limit: Option<usize>) -> Result<Query, Issues> {
        let mut issues = Issues::new();
        let mut query = Query::new();

        if let Some(text) = &raw.filter {
            match parse_filter(text) {
                Ok(Some(predicate)) => {
                    let mut problems = Vec::new();
                    let predicate = self.check_predicate(predicate, &mut problems);
                    if problems.is_empty() {
                        query = query.with_predicate(predicate);
                    } else {
                        issues.extend("filter", problems);
                    }
                }
                Ok(None) => {}
                Err(e) => issues.add("filter", e.to_string()),
            }
        }

        match self.check_sort(raw.sort.as_deref()) {
            Ok(sort) => query = query.with_sort(sort),
            Err(problems) => issues.extend("sort", problems),
        }

        let skip = match raw.skip.as_deref().map(parse_count) {
            None => Some(0),
            Some(Ok(skip)) => Some(skip),
            Some(Err(message)) => {
                issues.add("skip", message);
                None
            }
        };

        let limit = match raw.limit.as_deref() {
            None => Some(Limit::Absent),
            Some(UNLIMITED) => Some(Limit::Unlimited),
            Some(text) => match parse_count(text) {
                Ok(n) => Some(Limit::Max(n)),
                Err(message) => {
                    issues.add("limit", message);
                    None
                }
            },
        };
        let limit = limit.map(|limit| match limit {
            Limit::Absent => default_limit,
            Limit::Unlimited => None,
            Limit::Max(n) => Some(n),
        });

        let page = match raw.page.as_deref() {
            None => None,
            Some(text) => match text.trim().parse::<usize>() {
                Ok(page) if page > 0 => Some(page),
                _ => {
                    issues.add("page", "must be a positive integer");
                    None
                }
            },
        };

        if let (Some(skip), Some(limit)) = (skip, limit) {
            let offset = match (page, limit) {
                (Some(page), Some(per_page)) => {
                    let offset = (page - 1)
                        .checked_mul(per_page)
                        .and_then(|start| start.checked_add(skip));
                    if offset.is_none() {
                        issues.add("page", "page is out of range");
                    }
                    offset
                }
                (Some(_), None) => {
                    issues.add("page", "cannot use page without a limit");
                    None
                }
                (None, _) => Some(skip),
            };
            if let Some(offset) = offset {
                if limit.is_some() || offset > 0 {
                    query = query.with_window(Window::new(offset, limit));
                }
            }
        }

        issues.into_result(query)
    }

    fn check_sort(&self, raw: Option<&str>) -> Result<Sort, Vec<String>> {
        let sort = match raw {
            Some(text) if !text.trim().is_empty() => Sort::parse(text).map_err(|e| vec![e])?,
            _ => return Ok(self.default_sort.cloned().unwrap_or_default()),
        };
        let problems: Vec<String> = sort
            .fields()
            .iter()
            .filter(|field| !self.schema.get(&field.name).is_some_and(|def| def.sortable))
            .map(|field| format!("invalid sort field: {}", field.name))
            .collect();
        if problems.is_empty() {
            Ok(sort)
        } else {
            Err(problems)
        }
    }

    /// Checks every leaf and rebuilds the tree with normalised values
    fn check_predicate(&self, predicate: Predicate, problems: &mut Vec<String>) -> Predicate {
        match predicate {
            Predicate::And(children) => Predicate::And(
                children
                    .into_iter()
                    .map(|child| self.check_predicate(child, problems))
                    .collect(),
            ),
            Predicate::Or(children) => Predicate::Or(
                children
                    .into_iter()
                    .map(|child| self.check_predicate(child, problems))
                    .collect(),
            ),
            leaf => self.check_leaf(leaf, problems),
        }
    }

    fn check_leaf(&self, leaf: Predicate, problems: &mut Vec<String>) -> Predicate {
        let field = leaf.field().unwrap_or_default().to_string();
        let def = match self.schema.get(&field) {
            Some(def) => def,
            None => {
                problems.push(format!("unknown filter field: {}", field));
                return leaf;
            }
        };
        if !def.filterable {
            problems.push(format!("field is not filterable: {}", field));
            return leaf;
        }

        match leaf {
            Predicate::Equal { field, value } => {
                let value = normalise(def, &field, value, problems);
                Predicate::Equal { field, value }
            }
            Predicate::NotEqual { field, value } => {
                let value = normalise(def, &field, value, problems);
                Predicate::NotEqual { field, value }
            }
            Predicate::Compare { field, op, value } => {
                if !def.kind.comparable() {
                    problems.push(format!(
                        "invalid filter expression for field {}: cannot use {} on {}",
                        field,
                        op.as_str(),
                        def.kind.type_name()
                    ));
                    return Predicate::Compare { field, op, value };
                }
                let value = normalise(def, &field, value, problems);
                Predicate::Compare { field, op, value }
            }
            Predicate::Membership { field, op, values } => {
                let values = values
                    .into_iter()
                    .map(|value| normalise(def, &field, value, problems))
                    .collect();
                Predicate::Membership { field, op, values }
            }
            other => other,
        }
    }
}

/// Runs `value` through the field's kind, recording a problem on failure
fn normalise(def: &FieldDef, field: &str, value: Value, problems: &mut Vec<String>) -> Value {
    match def.validate(&value) {
        Ok(normalised) => normalised,
        Err(reason) => {
            problems.push(format!(
                "invalid filter expression for field {}: {}",
                field, reason
            ));
            value
        }
    }
}

fn parse_count(text: &str) -> Result<usize, String> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| "must be a non-negative integer".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CompareOp;
    use crate::schema::FieldKind;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .field("foo", FieldDef::new(FieldKind::string()).filterable().sortable())
            .field("n", FieldDef::new(FieldKind::integer()).filterable().sortable())
            .field("secret", FieldDef::new(FieldKind::string()))
            .field("created", FieldDef::new(FieldKind::Time).filterable())
            .compile()
            .unwrap()
    }

    fn raw(pairs: &[(&str, &str)]) -> RawQuery {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        RawQuery::from_params(&params)
    }

    #[test]
    fn test_valid_filter_mirrors_parse() {
        let schema = schema();
        let query = QueryValidator::new(&schema)
            .validate(&raw(&[("filter", r#"{foo:"odd", n:{$gte:2}}"#)]), None)
            .unwrap();
        assert_eq!(
            query.predicate(),
            Some(&Predicate::And(vec![
                Predicate::equal("foo", json!("odd")),
                Predicate::compare("n", CompareOp::Gte, json!(2)),
            ]))
        );
        assert_eq!(query.window(), None);
    }

    #[test]
    fn test_unknown_and_unfilterable_fields() {
        let schema = schema();
        let validator = QueryValidator::new(&schema);

        let issues = validator
            .validate(&raw(&[("filter", r#"{bar:1}"#)]), None)
            .unwrap_err();
        assert_eq!(issues.get("filter").unwrap(), ["unknown filter field: bar"]);
        assert_eq!(issues.len(), 1);

        let issues = validator
            .validate(&raw(&[("filter", r#"{secret:"x"}"#)]), None)
            .unwrap_err();
        assert_eq!(
            issues.get("filter").unwrap(),
            ["field is not filterable: secret"]
        );
    }

    #[test]
    fn test_filter_values_are_checked() {
        let schema = schema();
        let validator = QueryValidator::new(&schema);

        let issues = validator
            .validate(&raw(&[("filter", r#"{n:"two"}"#)]), None)
            .unwrap_err();
        assert_eq!(
            issues.get("filter").unwrap(),
            ["invalid filter expression for field n: not an integer"]
        );

        let issues = validator
            .validate(&raw(&[("filter", r#"{foo:{$gt:"a"}}"#)]), None)
            .unwrap_err();
        assert_eq!(
            issues.get("filter").unwrap(),
            ["invalid filter expression for field foo: cannot use $gt on string"]
        );
    }

    #[test]
    fn test_filter_values_are_normalised() {
        let schema = schema();
        let query = QueryValidator::new(&schema)
            .validate(
                &raw(&[("filter", r#"{created:{$lt:"2024-01-01T02:00:00+02:00"}}"#)]),
                None,
            )
            .unwrap();
        assert_eq!(
            query.predicate(),
            Some(&Predicate::compare(
                "created",
                CompareOp::Lt,
                json!("2024-01-01T00:00:00Z")
            ))
        );
    }

    #[test]
    fn test_syntax_error_is_one_issue() {
        let schema = schema();
        let issues = QueryValidator::new(&schema)
            .validate(&raw(&[("filter", "invalid")]), None)
            .unwrap_err();
        assert_eq!(
            issues.get("filter").unwrap(),
            ["char 0: expected '{' got 'i'"]
        );
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_sort_checks() {
        let schema = schema();
        let validator = QueryValidator::new(&schema);

        let query = validator.validate(&raw(&[("sort", "-n,foo")]), None).unwrap();
        assert_eq!(query.sort().to_string(), "-n,foo");

        let issues = validator
            .validate(&raw(&[("sort", "n,secret,nope")]), None)
            .unwrap_err();
        assert_eq!(
            issues.get("sort").unwrap(),
            ["invalid sort field: secret", "invalid sort field: nope"]
        );

        let issues = validator.validate(&raw(&[("sort", "n,")]), None).unwrap_err();
        assert_eq!(issues.get("sort").unwrap(), ["empty sort field"]);
    }

    #[test]
    fn test_default_sort() {
        let schema = schema();
        let default_sort = Sort::parse("-n").unwrap();
        let validator = QueryValidator::new(&schema).with_default_sort(&default_sort);

        let query = validator.validate(&raw(&[]), None).unwrap();
        assert_eq!(query.sort(), &default_sort);

        let query = validator.validate(&raw(&[("sort", "foo")]), None).unwrap();
        assert_eq!(query.sort().to_string(), "foo");
    }

    #[test]
    fn test_window() {
        let schema = schema();
        let validator = QueryValidator::new(&schema);

        let query = validator.validate(&raw(&[]), Some(20)).unwrap();
        assert_eq!(query.window(), Some(Window::new(0, Some(20))));

        let query = validator
            .validate(&raw(&[("limit", "unlimited"), ("skip", "3")]), Some(20))
            .unwrap();
        assert_eq!(query.window(), Some(Window::new(3, None)));

        let query = validator
            .validate(&raw(&[("limit", "5"), ("page", "3"), ("skip", "1")]), None)
            .unwrap();
        assert_eq!(query.window(), Some(Window::new(11, Some(5))));
    }

    #[test]
    fn test_window_errors() {
        let schema = schema();
        let validator = QueryValidator::new(&schema);

        let issues = validator
            .validate(&raw(&[("limit", "-1"), ("skip", "x")]), None)
            .unwrap_err();
        assert_eq!(issues.get("limit").unwrap(), ["must be a non-negative integer"]);
        assert_eq!(issues.get("skip").unwrap(), ["must be a non-negative integer"]);

        let issues = validator.validate(&raw(&[("page", "0")]), None).unwrap_err();
        assert_eq!(issues.get("page").unwrap(), ["must be a positive integer"]);

        let issues = validator.validate(&raw(&[("page", "2")]), None).unwrap_err();
        assert_eq!(
            issues.get("page").unwrap(),
            ["cannot use page without a limit"]
        );
    }

    #[test]
    fn test_page_overflow_is_an_issue() {
        let schema = schema();
        let validator = QueryValidator::new(&schema);
        let max = usize::MAX.to_string();

        let issues = validator
            .validate(&raw(&[("page", &max), ("limit", "1000")]), None)
            .unwrap_err();
        assert_eq!(issues.get("page").unwrap(), ["page is out of range"]);

        let issues = validator
            .validate(&raw(&[("page", "2"), ("limit", &max), ("skip", "1")]), None)
            .unwrap_err();
        assert_eq!(issues.get("page").unwrap(), ["page is out of range"]);
    }

    #[test]
    fn test_issues_accumulate_across_parameters() {
        let schema = schema();
        let issues = QueryValidator::new(&schema)
            .validate(
                &raw(&[("filter", "{bar:1}"), ("sort", "zzz"), ("limit", "x")]),
                None,
            )
            .unwrap_err();
        assert_eq!(issues.len(), 3);
    }
}
