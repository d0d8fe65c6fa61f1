//! Tagged values shared by rule literals and data records

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A literal in a rule, or an attribute value in a data record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Render the value the way it is written in a rule string
    pub fn to_literal(&self) -> String {
        match self {
            Value::String(s) if s.contains('\'') => format!("\"{}\"", s),
            Value::String(s) => format!("'{}'", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// A pair of values brought to a common type
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Coerced<'a> {
    Numbers(f64, f64),
    Strings(&'a str, &'a str),
    Booleans(bool, bool),
    Incomparable,
}

impl Coerced<'_> {
    /// Ordering of the coerced pair; `None` when no ordering is defined
    pub(crate) fn ordering(&self) -> Option<Ordering> {
        match self {
            Coerced::Numbers(a, b) => a.partial_cmp(b),
            Coerced::Strings(a, b) => Some(a.cmp(b)),
            Coerced::Booleans(..) | Coerced::Incomparable => None,
        }
    }

    pub(crate) fn equal(&self) -> bool {
        match self {
            Coerced::Numbers(a, b) => a == b,
            Coerced::Strings(a, b) => a == b,
            Coerced::Booleans(a, b) => a == b,
            Coerced::Incomparable => false,
        }
    }
}

/// Coerce a data value and a literal to a common type
///
/// Strings coerce to numbers only when they look numeric, and to booleans
/// only when they spell `true` or `false`.
pub(crate) fn coerce<'a>(actual: &'a Value, literal: &'a Value) -> Coerced<'a> {
    match (actual, literal) {
        (Value::Number(a), Value::Number(b)) => Coerced::Numbers(*a, *b),
        (Value::String(a), Value::String(b)) => Coerced::Strings(a, b),
        (Value::Boolean(a), Value::Boolean(b)) => Coerced::Booleans(*a, *b),
        (Value::Number(a), Value::String(s)) => match parse_numeric(s) {
            Some(b) => Coerced::Numbers(*a, b),
            None => Coerced::Incomparable,
        },
        (Value::String(s), Value::Number(b)) => match parse_numeric(s) {
            Some(a) => Coerced::Numbers(a, *b),
            None => Coerced::Incomparable,
        },
        (Value::Boolean(a), Value::String(s)) => match parse_boolean(s) {
            Some(b) => Coerced::Booleans(*a, b),
            None => Coerced::Incomparable,
        },
        (Value::String(s), Value::Boolean(b)) => match parse_boolean(s) {
            Some(a) => Coerced::Booleans(a, *b),
            None => Coerced::Incomparable,
        },
        (Value::Number(_), Value::Boolean(_)) | (Value::Boolean(_), Value::Number(_)) => {
            Coerced::Incomparable
        }
    }
}

fn parse_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    // f64::from_str also accepts "inf" and "nan", which are words here
    let numeric = !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s.chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E'));
    if numeric {
        s.parse().ok()
    } else {
        None
    }
}

fn parse_boolean(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
