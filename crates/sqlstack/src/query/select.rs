//! SELECT family of the builder.

use crate::database::Database;
use crate::error::{SqlError, SqlResult};
use crate::query::stack::ClauseKey;
use crate::query::{non_empty, Query};
use crate::value::Value;

/// Base aggregates, emitted as-is.
const BASE_AGGREGATES: [&str; 5] = ["count", "min", "max", "avg", "sum"];

/// Aggregates emitted with an `_agg` suffix.
const SUFFIX_AGGREGATES: [&str; 6] = [
    "array",
    "string",
    "json",
    "json_object",
    "jsonb",
    "jsonb_object",
];

/// Options for [`Query::aggregate`].
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Emit `DISTINCT` before the field.
    pub distinct: bool,
    /// Append `ORDER BY …` inside the aggregate call.
    pub order: Option<String>,
    /// Treat the field as a placeholder expression with these params instead
    /// of an identifier.
    pub params: Option<Vec<Value>>,
}

impl<D: Database> Query<D> {
    /// Add SELECT fields; `*` is kept literal, anything else is quoted as a
    /// comma-separated identifier list.
    pub fn select(mut self, fields: &str) -> SqlResult<Self> {
        let fields = non_empty(fields, "select fields")?;
        let item = if fields == "*" {
            "*".to_string()
        } else {
            self.db().escape_names(fields)
        };
        self.stack_mut().texts_mut(ClauseKey::Select).push(item);
        Ok(self)
    }

    /// Add a raw SELECT expression with `?` placeholders, bypassing
    /// identifier quoting.
    pub fn select_raw(mut self, sql: &str, params: &[Value]) -> SqlResult<Self> {
        let sql = non_empty(sql, "select expression")?;
        let prepared = self.db().prepare(sql, params);
        self.stack_mut().texts_mut(ClauseKey::Select).push(prepared);
        Ok(self)
    }

    /// Add a parenthesized sub-query SELECT item.
    pub fn select_query(mut self, sub: &Query<D>, alias: Option<&str>) -> SqlResult<Self> {
        let sql = sub.to_sql()?;
        let item = match alias {
            Some(alias) => format!("({sql}) AS {}", self.db().escape_name(alias)),
            None => format!("({sql})"),
        };
        self.stack_mut().texts_mut(ClauseKey::Select).push(item);
        Ok(self)
    }

    // ==================== JSON constructors ====================

    /// Select a JSON object built from `(key, field)` pairs.
    ///
    /// Requires pgsql or mysql.
    pub fn select_json_object(
        mut self,
        pairs: &[(&str, &str)],
        alias: Option<&str>,
    ) -> SqlResult<Self> {
        if pairs.is_empty() {
            return Err(SqlError::empty("json mapping"));
        }
        let func = self.json_function(false)?;
        let args = pairs
            .iter()
            .map(|(key, field)| {
                format!(
                    "{}, {}",
                    self.platform().quote_text(key),
                    self.db().escape_name(field)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        let item = self.aliased(format!("{func}({args})"), alias);
        self.stack_mut().texts_mut(ClauseKey::Select).push(item);
        Ok(self)
    }

    /// Select a JSON array built from fields.
    ///
    /// Requires pgsql or mysql.
    pub fn select_json_array(mut self, fields: &[&str], alias: Option<&str>) -> SqlResult<Self> {
        if fields.is_empty() {
            return Err(SqlError::empty("json fields"));
        }
        let func = self.json_function(true)?;
        let args = fields
            .iter()
            .map(|f| self.db().escape_name(f))
            .collect::<Vec<_>>()
            .join(", ");
        let item = self.aliased(format!("{func}({args})"), alias);
        self.stack_mut().texts_mut(ClauseKey::Select).push(item);
        Ok(self)
    }

    fn json_function(&self, array: bool) -> SqlResult<&'static str> {
        self.platform().json_function(array).ok_or_else(|| {
            SqlError::unsupported(self.platform().name(), "JSON constructor functions")
        })
    }

    // ==================== Aggregates ====================

    /// Add an aggregate SELECT item.
    ///
    /// Allowed functions are `count`, `min`, `max`, `avg`, `sum` plus the
    /// `_agg` family (`array`, `string`, `json`, `json_object`, `jsonb`,
    /// `jsonb_object`). Anything else is an error.
    pub fn aggregate(
        mut self,
        func: &str,
        field: &str,
        alias: Option<&str>,
        options: &AggregateOptions,
    ) -> SqlResult<Self> {
        let func = func.to_ascii_lowercase();
        let name = if BASE_AGGREGATES.contains(&func.as_str()) {
            func
        } else if SUFFIX_AGGREGATES.contains(&func.as_str()) {
            format!("{func}_agg")
        } else {
            return Err(SqlError::UnknownAggregate(func));
        };

        let field = non_empty(field, "aggregate field")?;
        let mut inner = match &options.params {
            Some(params) => self.db().prepare(field, params),
            None => self.db().escape_name(field),
        };
        if options.distinct {
            inner = format!("DISTINCT {inner}");
        }
        if let Some(order) = &options.order {
            inner = format!("{inner} ORDER BY {}", self.db().escape_names(order));
        }

        let item = self.aliased(format!("{name}({inner})"), alias);
        self.stack_mut().texts_mut(ClauseKey::Select).push(item);
        Ok(self)
    }

    /// `count(field)` SELECT item.
    pub fn select_count(self, field: &str, alias: Option<&str>) -> SqlResult<Self> {
        self.aggregate("count", field, alias, &AggregateOptions::default())
    }

    /// `min(field)` SELECT item.
    pub fn select_min(self, field: &str, alias: Option<&str>) -> SqlResult<Self> {
        self.aggregate("min", field, alias, &AggregateOptions::default())
    }

    /// `max(field)` SELECT item.
    pub fn select_max(self, field: &str, alias: Option<&str>) -> SqlResult<Self> {
        self.aggregate("max", field, alias, &AggregateOptions::default())
    }

    /// `avg(field)` SELECT item.
    pub fn select_avg(self, field: &str, alias: Option<&str>) -> SqlResult<Self> {
        self.aggregate("avg", field, alias, &AggregateOptions::default())
    }

    /// `sum(field)` SELECT item.
    pub fn select_sum(self, field: &str, alias: Option<&str>) -> SqlResult<Self> {
        self.aggregate("sum", field, alias, &AggregateOptions::default())
    }

    fn aliased(&self, item: String, alias: Option<&str>) -> String {
        match alias {
            Some(alias) => format!("{item} AS {}", self.db().escape_name(alias)),
            None => item,
        }
    }
}
