//! # Filter Parser
//!
//! Parses the `filter` request parameter into a [`Predicate`].
//!
//! The dialect is JSON-like with unquoted keys:
//!
//! ```text
//! {name: "Alice", age: {$gte: 18, $lt: 65}}
//! {$or: [{status: "draft"}, {status: {$in: ["review", "ready"]}}]}
//! {nickname: {$exists: false}, email: {$regex: "@example\\.com$"}}
//! ```
//!
//! The parser is purely syntactic: field names are not checked against any
//! schema. Errors carry the 0-based character offset of the offending token.

use serde_json::Value;
use thiserror::Error;

use super::predicate::{CompareOp, MembershipOp, Pattern, Predicate};

/// Result type for filter parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Syntax error with its character offset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("char {offset}: {message}")]
pub struct ParseError {
    /// 0-based character offset
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    fn expected(offset: usize, expected: &str, found: &str) -> Self {
        Self {
            offset,
            message: format!("expected {} got {}", expected, found),
        }
    }
}

/// Parse filter text. Blank text means "no filter".
pub fn parse_filter(text: &str) -> ParseResult<Option<Predicate>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut parser = FilterParser::new(text);
    parser.skip_ws();
    let predicate = parser.parse_object()?;
    parser.skip_ws();
    if parser.peek().is_some() {
        return Err(parser.unexpected("EOF"));
    }
    Ok(Some(predicate))
}

struct FilterParser {
    chars: Vec<char>,
    pos: usize,
}

impl FilterParser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Describes the token at the current position for error messages
    fn found(&self) -> String {
        match self.peek() {
            Some(c) => format!("'{}'", c),
            None => "EOF".to_string(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::expected(self.pos, expected, &self.found())
    }

    fn expect(&mut self, c: char) -> ParseResult<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", c)))
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// `{ member (, member)* }`
    fn parse_object(&mut self) -> ParseResult<Predicate> {
        self.expect('{')?;
        self.skip_ws();
        let mut members = Vec::new();
        if self.peek() == Some('}') {
            self.pos += 1;
            return Ok(Predicate::And(members));
        }
        loop {
            members.push(self.parse_member()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
        Ok(collapse(members))
    }

    fn parse_member(&mut self) -> ParseResult<Predicate> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some('$') {
            let op = self.read_word();
            return match op.as_str() {
                "$and" | "$or" => {
                    self.expect(':')?;
                    let children = self.parse_object_list()?;
                    Ok(if op == "$and" {
                        Predicate::And(children)
                    } else {
                        Predicate::Or(children)
                    })
                }
                _ => Err(ParseError::expected(
                    start,
                    "field name",
                    &format!("'{}'", op),
                )),
            };
        }

        let field = self.parse_field_name()?;
        self.expect(':')?;
        self.skip_ws();
        if self.peek() == Some('{') {
            self.parse_operators(field)
        } else {
            let value = self.parse_value()?;
            Ok(Predicate::Equal { field, value })
        }
    }

    fn parse_field_name(&mut self) -> ParseResult<String> {
        if self.peek() == Some('"') {
            let start = self.pos;
            let name = self.parse_string()?;
            if name.is_empty() {
                return Err(ParseError::expected(start, "field name", "'\"\"'"));
            }
            return Ok(name);
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-'))
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected("field name"));
        }
        Ok(self.slice(start, self.pos))
    }

    /// `$` followed by ASCII letters
    fn read_word(&mut self) -> String {
        let start = self.pos;
        self.pos += 1;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        self.slice(start, self.pos)
    }

    /// `[ object (, object)* ]`
    fn parse_object_list(&mut self) -> ParseResult<Vec<Predicate>> {
        self.expect('[')?;
        let mut children = Vec::new();
        loop {
            children.push(self.parse_object()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(children);
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    /// `{ $op: value (, $op: value)* }` applied to `field`
    fn parse_operators(&mut self, field: String) -> ParseResult<Predicate> {
        self.expect('{')?;
        let mut ops = Vec::new();
        loop {
            self.skip_ws();
            let start = self.pos;
            if self.peek() != Some('$') {
                return Err(self.unexpected("operator"));
            }
            let op = self.read_word();
            self.expect(':')?;
            self.skip_ws();
            let value_start = self.pos;
            let value = self.parse_value()?;
            let found = format!("'{}'", self.slice(value_start, self.pos));
            let field = field.clone();

            let predicate = match op.as_str() {
                "$ne" => Predicate::NotEqual { field, value },
                "$gt" | "$gte" | "$lt" | "$lte" => {
                    if !(value.is_number() || value.is_string()) {
                        return Err(ParseError::expected(value_start, "number or string", &found));
                    }
                    let op = match op.as_str() {
                        "$gt" => CompareOp::Gt,
                        "$gte" => CompareOp::Gte,
                        "$lt" => CompareOp::Lt,
                        _ => CompareOp::Lte,
                    };
                    Predicate::Compare { field, op, value }
                }
                "$in" | "$nin" => {
                    let values = match value {
                        Value::Array(values) => values,
                        _ => return Err(ParseError::expected(value_start, "array", &found)),
                    };
                    let op = if op == "$in" {
                        MembershipOp::In
                    } else {
                        MembershipOp::NotIn
                    };
                    Predicate::Membership { field, op, values }
                }
                "$exists" => match value {
                    Value::Bool(exists) => Predicate::Exists { field, exists },
                    _ => return Err(ParseError::expected(value_start, "boolean", &found)),
                },
                "$regex" => {
                    let source = match value.as_str() {
                        Some(s) => s,
                        None => return Err(ParseError::expected(value_start, "string", &found)),
                    };
                    let pattern = Pattern::new(source).map_err(|e| ParseError {
                        offset: value_start,
                        message: format!("invalid regex: {}", e),
                    })?;
                    Predicate::Pattern { field, pattern }
                }
                _ => {
                    return Err(ParseError::expected(
                        start,
                        "operator",
                        &format!("'{}'", op),
                    ))
                }
            };
            ops.push(predicate);

            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(collapse(ops));
                }
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }

    fn parse_value(&mut self) -> ParseResult<Value> {
        self.skip_ws();
        match self.peek() {
            Some('"') => self.parse_string().map(Value::String),
            Some('[') => self.parse_array(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                    self.pos += 1;
                }
                match self.slice(start, self.pos).as_str() {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    word => Err(ParseError::expected(start, "value", &format!("'{}'", word))),
                }
            }
            _ => Err(self.unexpected("value")),
        }
    }

    fn parse_array(&mut self) -> ParseResult<Value> {
        self.expect('[')?;
        self.skip_ws();
        let mut values = Vec::new();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(Value::Array(values));
        }
        loop {
            values.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Value::Array(values));
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }

    fn parse_number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.pos += 1;
        }
        let text = self.slice(start, self.pos);
        serde_json::from_str::<serde_json::Number>(&text)
            .map(Value::Number)
            .map_err(|_| ParseError::expected(start, "number", &format!("'{}'", text)))
    }

    /// Double-quoted JSON string; escapes are decoded by serde_json
    fn parse_string(&mut self) -> ParseResult<String> {
        let start = self.pos;
        self.pos += 1;
        loop {
            match self.peek() {
                None => {
                    // an escape right before EOF skips past the end
                    self.pos = self.pos.min(self.chars.len());
                    return Err(self.unexpected("'\"'"));
                }
                Some('\\') => self.pos += 2,
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        let raw = self.slice(start, self.pos);
        serde_json::from_str::<String>(&raw)
            .map_err(|_| ParseError::expected(start, "string", &format!("'{}'", raw)))
    }
}

/// One member stays bare, several become an implicit `And`
fn collapse(mut members: Vec<Predicate>) -> Predicate {
    if members.len() == 1 {
        members.remove(0)
    } else {
        Predicate::And(members)
    }
}
