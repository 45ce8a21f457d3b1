//! SQL value model.
//!
//! [`Value`] is the escaping substrate of the builder: every user-supplied
//! value is converted into a `Value` before it is rendered into a statement,
//! and [`crate::Platform`] turns a `Value` into a dialect-correct literal.
//!
//! # Example
//! ```ignore
//! use sqlstack::Value;
//!
//! let v: Value = "O'Hara".into();     // Text, escaped on render
//! let n: Value = Value::Null;
//! let l: Value = vec![1, 2, 3].into(); // List, flattens into IN (...)
//! ```

use crate::ident::{Name, Sql};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A value destined for a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean, lowered per dialect (`true`/`false` or `1`/`0`)
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// Text, quoted and escaped on render
    Text(String),
    /// Timestamp, rendered as a quoted UTC string
    Timestamp(DateTime<Utc>),
    /// UUID, rendered as a quoted string
    Uuid(Uuid),
    /// JSON document, rendered as quoted serialized text
    Json(serde_json::Value),
    /// Sequence of scalars, rendered as a comma-joined literal list
    List(Vec<Value>),
    /// Pre-composed SQL fragment, rendered verbatim
    Raw(String),
    /// Identifier, dialect-quoted but not otherwise processed
    Name(String),
}

impl Value {
    /// Check whether this value renders as a list of literals.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Borrow the raw fragment if this value bypasses escaping.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Value::Raw(s) => Some(s),
            _ => None,
        }
    }

    /// Extract an integer, if this value holds one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Convert into a JSON value for typed row decoding.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Value::from(*f),
            Value::Text(s) | Value::Raw(s) | Value::Name(s) => {
                serde_json::Value::String(s.clone())
            }
            Value::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            Value::Uuid(u) => serde_json::Value::String(u.to_string()),
            Value::Json(j) => j.clone(),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Sql> for Value {
    fn from(v: Sql) -> Self {
        Value::Raw(v.into_string())
    }
}

impl From<Name> for Value {
    fn from(v: Name) -> Self {
        Value::Name(v.into_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(v: &[T]) -> Self {
        Value::List(v.iter().cloned().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_scalars() {
        assert_eq!(Value::from(1i32), Value::Int(1));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from("a"), Value::Text("a".into()));
        assert_eq!(Value::from(Option::<i32>::None), Value::Null);
    }

    #[test]
    fn from_list() {
        let v = Value::from(vec![1, 2]);
        assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2)]));
        assert!(v.is_list());
    }

    #[test]
    fn raw_bypass() {
        let v = Value::Raw("NOW()".into());
        assert_eq!(v.as_raw(), Some("NOW()"));
    }
}
