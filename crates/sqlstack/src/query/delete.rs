//! DELETE marker of the builder.

use crate::database::Database;
use crate::query::stack::{ClauseData, ClauseKey};
use crate::query::Query;

impl<D: Database> Query<D> {
    /// Mark the statement as a DELETE.
    ///
    /// Rendering fails without a WHERE clause; pass `where_("1=1")` to
    /// target all rows explicitly.
    pub fn delete(mut self) -> Self {
        self.stack_mut().set(ClauseKey::Delete, ClauseData::Delete);
        self
    }
}
