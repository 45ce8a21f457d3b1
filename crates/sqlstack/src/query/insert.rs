//! INSERT family of the builder, including the conflict clause.

use crate::database::Database;
use crate::entry::EntryData;
use crate::error::{SqlError, SqlResult};
use crate::query::stack::{
    ClauseData, ClauseKey, ConflictAction, ConflictData, ConflictUpdate, InsertData,
};
use crate::query::{non_empty, Query};
use crate::value::Value;

impl<D: Database> Query<D> {
    /// Insert a single row from field/value pairs.
    pub fn insert<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> SqlResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut fields = Vec::new();
        let mut values = Vec::new();
        for (key, value) in pairs {
            fields.push(self.db().escape_name(&key.into()));
            values.push(self.db().escape(&value.into()));
        }
        if fields.is_empty() {
            return Err(SqlError::empty("insert data"));
        }
        let row = values.join(", ");
        self.set_insert(InsertData {
            fields,
            rows: vec![row],
            sequence: true,
        })
    }

    /// Insert a batch of mapped rows; the first row defines the field list
    /// and every row must match its width.
    pub fn insert_rows(self, rows: impl IntoIterator<Item = EntryData>) -> SqlResult<Self> {
        let rows: Vec<EntryData> = rows.into_iter().collect();
        let first = rows.first().ok_or_else(|| SqlError::empty("insert rows"))?;
        let field_names: Vec<String> = first.fields().iter().map(|f| f.to_string()).collect();
        if field_names.is_empty() {
            return Err(SqlError::empty("insert data"));
        }

        let fields: Vec<String> = field_names
            .iter()
            .map(|f| self.db().escape_name(f))
            .collect();
        let mut escaped_rows = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != field_names.len() {
                return Err(SqlError::InsertArity {
                    row: i,
                    expected: field_names.len(),
                    got: row.len(),
                });
            }
            let values = field_names
                .iter()
                .map(|f| self.db().escape(row.get(f).unwrap_or(&Value::Null)))
                .collect::<Vec<_>>()
                .join(", ");
            escaped_rows.push(values);
        }

        self.set_insert(InsertData {
            fields,
            rows: escaped_rows,
            sequence: true,
        })
    }

    /// Insert a batch from an explicit field list and value rows.
    pub fn insert_batch(self, fields: &[&str], rows: &[Vec<Value>]) -> SqlResult<Self> {
        if fields.is_empty() {
            return Err(SqlError::empty("insert fields"));
        }
        if rows.is_empty() {
            return Err(SqlError::empty("insert rows"));
        }
        let escaped_fields: Vec<String> =
            fields.iter().map(|f| self.db().escape_name(f)).collect();
        let mut escaped_rows = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(SqlError::InsertArity {
                    row: i,
                    expected: fields.len(),
                    got: row.len(),
                });
            }
            escaped_rows.push(
                row.iter()
                    .map(|v| self.db().escape(v))
                    .collect::<Vec<_>>()
                    .join(", "),
            );
        }
        self.set_insert(InsertData {
            fields: escaped_fields,
            rows: escaped_rows,
            sequence: true,
        })
    }

    /// Flag whether the insert target carries a generated sequence id.
    pub fn sequence(mut self, on: bool) -> Self {
        if let Some(data) = self.stack_mut().insert_data_mut() {
            data.sequence = on;
        }
        self
    }

    fn set_insert(mut self, data: InsertData) -> SqlResult<Self> {
        self.stack_mut().set(ClauseKey::Insert, ClauseData::Insert(data));
        Ok(self)
    }

    // ==================== Conflict clause ====================

    /// `ON CONFLICT (fields) DO NOTHING` (pgsql) or the MySQL equivalent.
    ///
    /// Dialect support is checked at render time.
    pub fn conflict_nothing(mut self, fields: &str) -> SqlResult<Self> {
        let fields = non_empty(fields, "conflict fields")?;
        let fields = self.db().escape_names(fields);
        self.stack_mut().set(
            ClauseKey::Conflict,
            ClauseData::Conflict(ConflictData {
                fields,
                action: ConflictAction::Nothing,
                update: None,
                where_sql: None,
            }),
        );
        Ok(self)
    }

    /// `ON CONFLICT (fields) DO UPDATE SET …` from explicit assignments.
    ///
    /// On pgsql, text values starting with `EXCLUDED.` pass through with the
    /// suffix identifier-escaped.
    pub fn conflict_update<K, V>(
        mut self,
        fields: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> SqlResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = non_empty(fields, "conflict fields")?;
        let mut assignments = Vec::new();
        for (key, value) in pairs {
            let field = self.db().escape_name(&key.into());
            let value = value.into();
            let rendered = match excluded_suffix(&value) {
                Some(suffix) if self.platform().is("pgsql") => {
                    format!("EXCLUDED.{}", self.db().escape_name(suffix))
                }
                _ => self.db().escape(&value),
            };
            assignments.push((field, rendered));
        }
        if assignments.is_empty() {
            return Err(SqlError::empty("conflict update data"));
        }
        let fields = self.db().escape_names(fields);
        self.stack_mut().set(
            ClauseKey::Conflict,
            ClauseData::Conflict(ConflictData {
                fields,
                action: ConflictAction::Update,
                update: Some(ConflictUpdate::Pairs(assignments)),
                where_sql: None,
            }),
        );
        Ok(self)
    }

    /// `ON CONFLICT … DO UPDATE` re-assigning every insert field from the
    /// proposed row (`EXCLUDED.f` on pgsql, `VALUES(f)` on mysql).
    pub fn conflict_update_all(mut self, fields: &str) -> SqlResult<Self> {
        let fields = non_empty(fields, "conflict fields")?;
        let fields = self.db().escape_names(fields);
        self.stack_mut().set(
            ClauseKey::Conflict,
            ClauseData::Conflict(ConflictData {
                fields,
                action: ConflictAction::Update,
                update: Some(ConflictUpdate::All),
                where_sql: None,
            }),
        );
        Ok(self)
    }

    /// Attach a WHERE to the pending `DO UPDATE` conflict action.
    pub fn conflict_where(mut self, expr: &str, params: &[Value]) -> SqlResult<Self> {
        let expr = non_empty(expr, "conflict condition")?;
        let quoted = crate::prepare::quote_leading_field(self.platform(), expr);
        let prepared = self.db().prepare(&quoted, params);
        let data = self
            .stack_mut()
            .conflict_data_mut()
            .ok_or(SqlError::NoPrecedingClause("conflict"))?;
        data.where_sql = Some(prepared);
        Ok(self)
    }
}

fn excluded_suffix(value: &Value) -> Option<&str> {
    let Value::Text(s) = value else { return None };
    let prefix = s.get(..9)?;
    if !prefix.eq_ignore_ascii_case("excluded.") {
        return None;
    }
    let suffix = &s[9..];
    (!suffix.is_empty()).then_some(suffix)
}
