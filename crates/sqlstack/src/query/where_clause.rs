//! WHERE family of the builder.
//!
//! Every call appends one element to the `where` key. An element is a list
//! of rendered condition parts plus a [`Logic`] slot; `or_`/`and_` rewrite
//! the last element's logic, which is both the internal joiner of a
//! multi-part element and the joiner toward the next element.

use crate::condition::{Logic, QueryParams};
use crate::database::Database;
use crate::error::{SqlError, SqlResult};
use crate::prepare;
use crate::query::stack::WhereClause;
use crate::query::{non_empty, Query};
use crate::value::Value;

impl<D: Database> Query<D> {
    fn push_where(mut self, clause: WhereClause) -> Self {
        self.stack_mut().wheres_mut().push(clause);
        self
    }

    fn push_part(self, part: String) -> Self {
        self.push_where(WhereClause::new(part))
    }

    // ==================== General forms ====================

    /// Add a WHERE condition string.
    ///
    /// A bare leading identifier is quoted (`id = 1` renders `"id" = 1`);
    /// expressions like `1=1` pass through untouched, which is the explicit
    /// opt-out for the UPDATE/DELETE WHERE requirement.
    pub fn where_(self, expr: &str) -> SqlResult<Self> {
        self.where_params(expr, &[])
    }

    /// Add a WHERE condition string with `?` placeholders.
    pub fn where_params(self, expr: &str, params: &[Value]) -> SqlResult<Self> {
        let expr = non_empty(expr, "where condition")?;
        let quoted = prepare::quote_leading_field(self.platform(), expr);
        let prepared = self.db().prepare(&quoted, params);
        Ok(self.push_part(prepared))
    }

    /// Add one grouped WHERE element from field/value pairs.
    ///
    /// Keys accept suffix operators: trailing `!` means `!=`, `<` and `>`
    /// their obvious meanings, default `=`. List values turn `=` into
    /// `IN (…)` and `!=` into `NOT IN (…)`; NULL values turn them into
    /// `IS [NOT] NULL`.
    pub fn where_map<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> SqlResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut parts = Vec::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            let (field, op) = split_suffix_op(&key)?;
            let field = self.db().escape_name(field);
            parts.push(match (op, &value) {
                (MapOp::Eq, Value::Null) => format!("{field} IS NULL"),
                (MapOp::Ne, Value::Null) => format!("{field} IS NOT NULL"),
                (MapOp::Eq, Value::List(_)) => {
                    format!("{field} IN ({})", self.db().escape(&value))
                }
                (MapOp::Ne, Value::List(_)) => {
                    format!("{field} NOT IN ({})", self.db().escape(&value))
                }
                (op, _) => format!("{field} {} {}", op.as_str(), self.db().escape(&value)),
            });
        }
        if parts.is_empty() {
            return Err(SqlError::empty("where data"));
        }
        Ok(self.push_where(WhereClause::group(parts)))
    }

    /// Render a [`QueryParams`] collection into the builder, one element per
    /// condition, keeping each condition's logic.
    pub fn where_query_params(mut self, params: &QueryParams) -> SqlResult<Self> {
        if params.is_empty() {
            return Err(SqlError::empty("query params"));
        }
        for param in params.iter() {
            let part = param.render(self.platform())?;
            self.stack_mut().wheres_mut().push(WhereClause {
                parts: vec![part],
                logic: param.logic,
            });
        }
        Ok(self)
    }

    // ==================== Comparison shortcuts ====================

    /// `field = value`; list values become `IN (…)`, NULL becomes `IS NULL`.
    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let value = value.into();
        let part = match &value {
            Value::Null => format!("{field} IS NULL"),
            Value::List(_) => format!("{field} IN ({})", self.db().escape(&value)),
            _ => format!("{field} = {}", self.db().escape(&value)),
        };
        Ok(self.push_part(part))
    }

    /// `field != value`; list values become `NOT IN (…)`, NULL becomes
    /// `IS NOT NULL`.
    pub fn where_ne(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let value = value.into();
        let part = match &value {
            Value::Null => format!("{field} IS NOT NULL"),
            Value::List(_) => format!("{field} NOT IN ({})", self.db().escape(&value)),
            _ => format!("{field} != {}", self.db().escape(&value)),
        };
        Ok(self.push_part(part))
    }

    /// `field = (sub-query)`.
    pub fn where_eq_query(self, field: &str, sub: &Query<D>) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let sql = sub.to_sql()?;
        Ok(self.push_part(format!("{field} = ({sql})")))
    }

    /// `field IS TRUE|FALSE|NULL`.
    pub fn where_is(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let keyword = is_keyword(value.into())?;
        Ok(self.push_part(format!("{field} IS {keyword}")))
    }

    /// `field IS NOT TRUE|FALSE|NULL`.
    pub fn where_is_not(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let keyword = is_keyword(value.into())?;
        Ok(self.push_part(format!("{field} IS NOT {keyword}")))
    }

    /// `field IN (values…)`. An empty list is an error.
    pub fn where_in<V: Into<Value>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(SqlError::empty("IN value list"));
        }
        let list = self.db().escape(&Value::List(values));
        Ok(self.push_part(format!("{field} IN ({list})")))
    }

    /// `field NOT IN (values…)`. An empty list is an error.
    pub fn where_not_in<V: Into<Value>>(
        self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(SqlError::empty("NOT IN value list"));
        }
        let list = self.db().escape(&Value::List(values));
        Ok(self.push_part(format!("{field} NOT IN ({list})")))
    }

    /// `field IN (sub-query)`.
    pub fn where_in_query(self, field: &str, sub: &Query<D>) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let sql = sub.to_sql()?;
        Ok(self.push_part(format!("{field} IN ({sql})")))
    }

    /// `field IS NULL`.
    pub fn where_null(self, field: &str) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        Ok(self.push_part(format!("{field} IS NULL")))
    }

    /// `field IS NOT NULL`.
    pub fn where_not_null(self, field: &str) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        Ok(self.push_part(format!("{field} IS NOT NULL")))
    }

    /// `field BETWEEN from AND to`.
    pub fn where_between(
        self,
        field: &str,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let part = format!(
            "{field} BETWEEN {} AND {}",
            self.db().escape(&from.into()),
            self.db().escape(&to.into())
        );
        Ok(self.push_part(part))
    }

    /// `field NOT BETWEEN from AND to`.
    pub fn where_not_between(
        self,
        field: &str,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let part = format!(
            "{field} NOT BETWEEN {} AND {}",
            self.db().escape(&from.into()),
            self.db().escape(&to.into())
        );
        Ok(self.push_part(part))
    }

    /// `field < value`.
    pub fn where_lt(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        self.compare(field, "<", value.into())
    }

    /// `field <= value`.
    pub fn where_lte(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        self.compare(field, "<=", value.into())
    }

    /// `field > value`.
    pub fn where_gt(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        self.compare(field, ">", value.into())
    }

    /// `field >= value`.
    pub fn where_gte(self, field: &str, value: impl Into<Value>) -> SqlResult<Self> {
        self.compare(field, ">=", value.into())
    }

    fn compare(self, field: &str, op: &str, value: Value) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let part = format!("{field} {op} {}", self.db().escape(&value));
        Ok(self.push_part(part))
    }

    // ==================== Patterns ====================

    /// `field LIKE search`. The search is a full pattern; use
    /// [`crate::Database::escape_like`] to embed user content in one.
    pub fn where_like(self, field: &str, search: &str) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let search = self.platform().quote_text(search);
        Ok(self.push_part(format!("{field} LIKE {search}")))
    }

    /// `field NOT LIKE search`.
    pub fn where_not_like(self, field: &str, search: &str) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let search = self.platform().quote_text(search);
        Ok(self.push_part(format!("{field} NOT LIKE {search}")))
    }

    /// Case-insensitive LIKE, lowered per dialect.
    pub fn where_ilike(self, field: &str, search: &str) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let search = self.platform().quote_text(search);
        let part = self.platform().format_ilike(&field, &search);
        Ok(self.push_part(part))
    }

    /// Case-insensitive NOT LIKE, lowered per dialect.
    pub fn where_not_ilike(self, field: &str, search: &str) -> SqlResult<Self> {
        let field = self.prep_field(field)?;
        let search = self.platform().quote_text(search);
        let part = self.platform().format_not_ilike(&field, &search);
        Ok(self.push_part(part))
    }

    // ==================== Sub-query predicates ====================

    /// `EXISTS (sub-query)`.
    pub fn where_exists(self, sub: &Query<D>) -> SqlResult<Self> {
        let sql = sub.to_sql()?;
        Ok(self.push_part(format!("EXISTS ({sql})")))
    }

    /// `NOT EXISTS (sub-query)`.
    pub fn where_not_exists(self, sub: &Query<D>) -> SqlResult<Self> {
        let sql = sub.to_sql()?;
        Ok(self.push_part(format!("NOT EXISTS ({sql})")))
    }

    /// Sample rows: `random() < p`.
    pub fn where_random(self, p: f64) -> Self {
        let part = format!("{} < {p}", self.platform().random_function());
        self.push_part(part)
    }

    // ==================== Flow ====================

    /// Set the last WHERE element's logic to OR.
    pub fn or_(self) -> SqlResult<Self> {
        self.set_last_logic(Logic::Or)
    }

    /// Set the last WHERE element's logic to AND.
    pub fn and_(self) -> SqlResult<Self> {
        self.set_last_logic(Logic::And)
    }

    fn set_last_logic(mut self, logic: Logic) -> SqlResult<Self> {
        let last = self
            .stack_mut()
            .wheres_mut()
            .last_mut()
            .ok_or(SqlError::NoPrecedingClause("where"))?;
        last.logic = logic;
        Ok(self)
    }

    fn prep_field(&self, field: &str) -> SqlResult<String> {
        let field = non_empty(field, "where field")?;
        Ok(self.db().escape_name(field))
    }
}

#[derive(Clone, Copy)]
enum MapOp {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl MapOp {
    fn as_str(self) -> &'static str {
        match self {
            MapOp::Eq => "=",
            MapOp::Ne => "!=",
            MapOp::Lt => "<",
            MapOp::Gt => ">",
        }
    }
}

fn split_suffix_op(key: &str) -> SqlResult<(&str, MapOp)> {
    let key = key.trim();
    if key.is_empty() {
        return Err(SqlError::empty("where field"));
    }
    let (head, op) = match key.as_bytes()[key.len() - 1] {
        b'!' => (&key[..key.len() - 1], MapOp::Ne),
        b'<' => (&key[..key.len() - 1], MapOp::Lt),
        b'>' => (&key[..key.len() - 1], MapOp::Gt),
        _ => (key, MapOp::Eq),
    };
    if head.is_empty() {
        return Err(SqlError::empty("where field"));
    }
    Ok((head, op))
}

fn is_keyword(value: Value) -> SqlResult<&'static str> {
    match value {
        Value::Null => Ok("NULL"),
        Value::Bool(true) => Ok("TRUE"),
        Value::Bool(false) => Ok("FALSE"),
        other => Err(SqlError::InvalidOp(format!("IS {other:?}"))),
    }
}
