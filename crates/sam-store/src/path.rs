//! Path tokens and the traversal interpreter.
//!
//! A path is a list of [`PathToken`]s applied left to right to a JSON value.
//! Traversal is total: any step that does not fit the current value's shape
//! yields `None` rather than an error, because a missing intermediate simply
//! means the controller has not reported that metric yet.

use std::fmt;

use serde_json::Value;

/// One traversal step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathToken {
    /// Object key. On arrays, a key that parses as an integer is used as an index.
    Key(String),
    /// Array index. On objects, the index is used as a stringified key.
    Index(usize),
    /// First array element whose field `attribute` equals `value`.
    Find {
        /// Field compared on each element.
        attribute: String,
        /// Expected field value, compared as text.
        value: String,
    },
}

impl PathToken {
    /// Array-search token.
    pub fn find(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Find {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Apply this token to one value.
    pub fn step<'a>(&self, current: &'a Value) -> Option<&'a Value> {
        match (self, current) {
            (Self::Key(key), Value::Object(map)) => map.get(key),
            (Self::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?),
            (Self::Index(index), Value::Array(items)) => items.get(*index),
            (Self::Index(index), Value::Object(map)) => map.get(&index.to_string()),
            (Self::Find { attribute, value }, Value::Array(items)) => items
                .iter()
                .find(|item| item.get(attribute).is_some_and(|field| scalar_eq(field, value))),
            _ => None,
        }
    }
}

impl From<&str> for PathToken {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for PathToken {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathToken {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Find { attribute, value } => write!(f, "[{attribute}={value}]"),
        }
    }
}

/// Compare a scalar field against its textual form.
fn scalar_eq(field: &Value, expected: &str) -> bool {
    match field {
        Value::String(s) => s == expected,
        Value::Number(n) => n.to_string() == expected,
        Value::Bool(b) => b.to_string() == expected,
        _ => false,
    }
}

/// Walk `path` from `root`. `null` at the end of the walk counts as absent.
pub fn resolve<'a>(root: &'a Value, path: &[PathToken]) -> Option<&'a Value> {
    let leaf = path.iter().try_fold(root, |current, token| token.step(current))?;
    (!leaf.is_null()).then_some(leaf)
}

/// Build a path from tokens: `path!["hull/currentState", "pressure"]`.
#[macro_export]
macro_rules! path {
    ($($token:expr),* $(,)?) => {
        vec![$($crate::PathToken::from($token)),*]
    };
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
