//! Structured query conditions.
//!
//! [`Op`] and [`QueryParam`] describe one WHERE condition as data
//! (field / operator / value / logic); [`QueryParams`] collects them and
//! renders into the builder via [`crate::Query::where_query_params`].
//!
//! # Example
//! ```ignore
//! use sqlstack::{Op, QueryParams};
//!
//! let params = QueryParams::new()
//!     .add("status", Op::eq("active"))
//!     .add_or("role", Op::in_list(["admin", "root"]));
//! let q = q.where_query_params(&params)?;
//! ```

use crate::error::{SqlError, SqlResult};
use crate::platform::Platform;
use crate::value::Value;

/// Joiner between WHERE elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    /// The uppercase SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Logic::And => "AND",
            Logic::Or => "OR",
        }
    }
}

impl std::fmt::Display for Logic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition operator with its value payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    Like(String),
    NotLike(String),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Between(Value, Value),
    NotBetween(Value, Value),
    IsNull,
    IsNotNull,
}

impl Op {
    /// Equality: `field = value`
    pub fn eq(value: impl Into<Value>) -> Self {
        Op::Eq(value.into())
    }

    /// Inequality: `field != value`
    pub fn ne(value: impl Into<Value>) -> Self {
        Op::Ne(value.into())
    }

    /// Greater than: `field > value`
    pub fn gt(value: impl Into<Value>) -> Self {
        Op::Gt(value.into())
    }

    /// Greater than or equal: `field >= value`
    pub fn gte(value: impl Into<Value>) -> Self {
        Op::Gte(value.into())
    }

    /// Less than: `field < value`
    pub fn lt(value: impl Into<Value>) -> Self {
        Op::Lt(value.into())
    }

    /// Less than or equal: `field <= value`
    pub fn lte(value: impl Into<Value>) -> Self {
        Op::Lte(value.into())
    }

    /// Pattern match: `field LIKE search`
    pub fn like(search: impl Into<String>) -> Self {
        Op::Like(search.into())
    }

    /// Negated pattern match: `field NOT LIKE search`
    pub fn not_like(search: impl Into<String>) -> Self {
        Op::NotLike(search.into())
    }

    /// Membership: `field IN (values…)`
    pub fn in_list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Op::In(values.into_iter().map(Into::into).collect())
    }

    /// Negated membership: `field NOT IN (values…)`
    pub fn not_in<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Op::NotIn(values.into_iter().map(Into::into).collect())
    }

    /// Range: `field BETWEEN from AND to`
    pub fn between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::Between(from.into(), to.into())
    }

    /// Negated range: `field NOT BETWEEN from AND to`
    pub fn not_between(from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Op::NotBetween(from.into(), to.into())
    }

    /// NULL check: `field IS NULL`
    pub fn is_null() -> Self {
        Op::IsNull
    }

    /// NULL check: `field IS NOT NULL`
    pub fn is_not_null() -> Self {
        Op::IsNotNull
    }
}

/// One structured WHERE condition.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParam {
    pub field: String,
    pub op: Op,
    pub logic: Logic,
}

impl QueryParam {
    /// Create a condition joined with AND.
    pub fn new(field: impl Into<String>, op: Op) -> Self {
        Self {
            field: field.into(),
            op,
            logic: Logic::And,
        }
    }

    /// Override the joiner logic.
    pub fn with_logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    /// Render the condition as a SQL fragment.
    pub fn render(&self, platform: &Platform) -> SqlResult<String> {
        let field = platform.prepare_name(&self.field);
        let esc = |v: &Value| platform.escape_value(v);
        Ok(match &self.op {
            Op::Eq(v) => format!("{field} = {}", esc(v)),
            Op::Ne(v) => format!("{field} != {}", esc(v)),
            Op::Gt(v) => format!("{field} > {}", esc(v)),
            Op::Gte(v) => format!("{field} >= {}", esc(v)),
            Op::Lt(v) => format!("{field} < {}", esc(v)),
            Op::Lte(v) => format!("{field} <= {}", esc(v)),
            Op::Like(s) => format!("{field} LIKE {}", platform.escape_like(s, true)),
            Op::NotLike(s) => format!("{field} NOT LIKE {}", platform.escape_like(s, true)),
            Op::In(values) => {
                if values.is_empty() {
                    return Err(SqlError::empty("IN value list"));
                }
                let list = values.iter().map(esc).collect::<Vec<_>>().join(", ");
                format!("{field} IN ({list})")
            }
            Op::NotIn(values) => {
                if values.is_empty() {
                    return Err(SqlError::empty("NOT IN value list"));
                }
                let list = values.iter().map(esc).collect::<Vec<_>>().join(", ");
                format!("{field} NOT IN ({list})")
            }
            Op::Between(from, to) => format!("{field} BETWEEN {} AND {}", esc(from), esc(to)),
            Op::NotBetween(from, to) => {
                format!("{field} NOT BETWEEN {} AND {}", esc(from), esc(to))
            }
            Op::IsNull => format!("{field} IS NULL"),
            Op::IsNotNull => format!("{field} IS NOT NULL"),
        })
    }
}

/// An ordered collection of [`QueryParam`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    items: Vec<QueryParam>,
}

impl QueryParams {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an AND-joined condition.
    pub fn add(mut self, field: impl Into<String>, op: Op) -> Self {
        self.items.push(QueryParam::new(field, op));
        self
    }

    /// Append an OR-joined condition.
    pub fn add_or(mut self, field: impl Into<String>, op: Op) -> Self {
        self.items.push(QueryParam::new(field, op).with_logic(Logic::Or));
        self
    }

    /// Append a pre-built condition.
    pub fn push(&mut self, param: QueryParam) {
        self.items.push(param);
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of conditions.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate the conditions in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &QueryParam> {
        self.items.iter()
    }
}
