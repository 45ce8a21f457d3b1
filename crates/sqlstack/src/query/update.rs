//! UPDATE family of the builder.

use crate::database::Database;
use crate::error::{SqlError, SqlResult};
use crate::query::stack::ClauseKey;
use crate::query::Query;
use crate::value::Value;

impl<D: Database> Query<D> {
    /// Set UPDATE assignments from field/value pairs, values escaped.
    ///
    /// Rendering fails without a WHERE clause; pass `where_("1=1")` to
    /// target all rows explicitly.
    pub fn update<K, V>(self, pairs: impl IntoIterator<Item = (K, V)>) -> SqlResult<Self>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut assignments = Vec::new();
        let mut me = self;
        for (key, value) in pairs {
            let field = me.db().escape_name(&key.into());
            let value = me.db().escape(&value.into());
            assignments.push(format!("{field} = {value}"));
        }
        if assignments.is_empty() {
            return Err(SqlError::empty("update data"));
        }
        me.stack_mut()
            .set(ClauseKey::Update, crate::query::ClauseData::Texts(assignments));
        Ok(me)
    }

    /// Set UPDATE assignments with verbatim right-hand expressions
    /// (`count = count + 1`).
    pub fn update_raw<'p>(
        self,
        pairs: impl IntoIterator<Item = (&'p str, &'p str)>,
    ) -> SqlResult<Self> {
        let mut assignments = Vec::new();
        let mut me = self;
        for (key, expr) in pairs {
            let field = me.db().escape_name(key);
            assignments.push(format!("{field} = {expr}"));
        }
        if assignments.is_empty() {
            return Err(SqlError::empty("update data"));
        }
        me.stack_mut()
            .set(ClauseKey::Update, crate::query::ClauseData::Texts(assignments));
        Ok(me)
    }
}
