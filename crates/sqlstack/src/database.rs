//! Database collaborator contract.
//!
//! [`Database`] is the seam between the builder and a concrete driver. The
//! escaping half (escape, prepare, identifier quoting) is synchronous and has
//! default implementations delegating to the driver's [`Platform`]; the
//! execution half (`query`, `execute`, transactions) is async and supplied by
//! the driver. A reference implementation over `tokio-postgres` lives behind
//! the `postgres` feature.
//!
//! # Example
//! ```ignore
//! let result = db.query("SELECT 1 AS one", &QueryOptions::default()).await?;
//! assert_eq!(result.count(), 1);
//! ```

use crate::entry::EntryData;
use crate::error::{SqlError, SqlResult};
use crate::platform::Platform;
use crate::prepare;
use crate::result::QueryResult;
use crate::value::Value;
use std::future::Future;
use std::sync::Arc;

/// Row fetch style requested by the caller.
///
/// Rows always surface as [`EntryData`] bags; the style is advisory for
/// drivers that distinguish positional and named access.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fetch {
    #[default]
    Array,
    Object,
}

/// A recorded plan for recovering `RETURNING` rows on dialects without the
/// native clause.
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackPlan {
    /// Re-select the inserted row(s) by generated id.
    Insert {
        table: String,
        fields: String,
        fetch: Fetch,
    },
    /// Re-select the updated rows with the statement's WHERE snapshot.
    Update {
        table: String,
        where_sql: Option<String>,
        fields: String,
        fetch: Fetch,
    },
}

/// Options accompanying a [`Database::query`] call.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Row fetch style.
    pub fetch: Fetch,
    /// Whether the statement targets a table with a generated sequence id.
    pub sequence: bool,
    /// `RETURNING` emulation plan for dialects without the native clause.
    pub fallback: Option<FallbackPlan>,
}

impl QueryOptions {
    /// Options with a fetch style.
    pub fn fetching(fetch: Fetch) -> Self {
        Self {
            fetch,
            ..Self::default()
        }
    }
}

/// The driver contract consumed by the builder and the entry manager.
///
/// Drivers that cannot express `RETURNING` natively should honor
/// [`QueryOptions::fallback`] by re-selecting the affected rows and attaching
/// them via [`QueryResult::with_fallback_rows`].
pub trait Database: Send + Sync + 'static {
    /// The dialect platform of this connection.
    fn platform(&self) -> &Platform;

    // ==================== Escaping (sync) ====================

    /// Render a value as a dialect-correct literal.
    fn escape(&self, value: &Value) -> String {
        self.platform().escape_value(value)
    }

    /// Quote an identifier, handling dotted paths and `*`.
    fn escape_name(&self, name: &str) -> String {
        self.platform().prepare_name(name)
    }

    /// Quote a comma/whitespace separated identifier list.
    fn escape_names(&self, names: &str) -> String {
        self.platform().prepare_names(names)
    }

    /// Escape a LIKE search string, optionally quoting the result.
    fn escape_like(&self, search: &str, full: bool) -> String {
        self.platform().escape_like(search, full)
    }

    /// Substitute `?` / `?r` / `@name` / `@[a, b]` placeholders.
    fn prepare(&self, sql: &str, params: &[Value]) -> String {
        prepare::prepare(self.platform(), sql, params)
    }

    /// Substitute only identifier placeholders.
    fn prepare_name(&self, sql: &str) -> String {
        prepare::prepare_name_refs(self.platform(), sql)
    }

    // ==================== Execution (async) ====================

    /// Run a statement and fetch its rows.
    fn query(
        &self,
        sql: &str,
        options: &QueryOptions,
    ) -> impl Future<Output = SqlResult<QueryResult>> + Send;

    /// Run a statement and return the affected-row count.
    fn execute(&self, sql: &str) -> impl Future<Output = SqlResult<u64>> + Send;

    /// Wrap a statement in a count aggregate and return the total.
    fn count_query(&self, sql: &str) -> impl Future<Output = SqlResult<i64>> + Send {
        async move {
            let wrapped = format!("SELECT COUNT(*) AS c FROM ({sql}) AS c_t");
            let result = self.query(&wrapped, &QueryOptions::default()).await?;
            Ok(count_from(&result))
        }
    }

    // ==================== Transactions ====================

    /// Open a transaction on this connection.
    fn begin(&self) -> impl Future<Output = SqlResult<()>> + Send {
        async move {
            self.execute("BEGIN").await?;
            Ok(())
        }
    }

    /// Commit the open transaction.
    fn commit(&self) -> impl Future<Output = SqlResult<()>> + Send {
        async move {
            self.execute("COMMIT").await?;
            Ok(())
        }
    }

    /// Roll back the open transaction.
    fn rollback(&self) -> impl Future<Output = SqlResult<()>> + Send {
        async move {
            self.execute("ROLLBACK").await?;
            Ok(())
        }
    }
}

fn count_from(result: &QueryResult) -> i64 {
    result
        .first()
        .and_then(|row: &EntryData| row.get("c"))
        .and_then(Value::as_int)
        .unwrap_or(0)
}

/// Explicit default-database registry.
///
/// Managers constructed without a connection look their default up here;
/// nothing in the crate consults process-wide state.
pub struct Registry<D: Database> {
    default: Option<Arc<D>>,
}

impl<D: Database> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Database> Registry<D> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { default: None }
    }

    /// Register the default database.
    pub fn set_default(&mut self, db: Arc<D>) {
        self.default = Some(db);
    }

    /// Whether a default database is registered.
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    /// Fetch the default database.
    pub fn get_default(&self) -> SqlResult<Arc<D>> {
        self.default.clone().ok_or(SqlError::NoDefaultDatabase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::MockDb;

    #[test]
    fn registry_default_lookup() {
        let mut registry: Registry<MockDb> = Registry::new();
        assert!(!registry.has_default());
        assert!(matches!(
            registry.get_default(),
            Err(SqlError::NoDefaultDatabase)
        ));

        registry.set_default(MockDb::new("pgsql"));
        assert!(registry.has_default());
        assert!(registry.get_default().is_ok());
    }

    #[test]
    fn escaping_delegates_to_platform() {
        let db = MockDb::new("mysql");
        assert_eq!(db.escape_name("t.id"), "`t`.`id`");
        assert_eq!(db.escape_names("a, b"), "`a`, `b`");
        assert_eq!(db.escape(&Value::Text("x".into())), "'x'");
        assert_eq!(db.prepare("a = ?", &[Value::Int(1)]), "a = 1");
    }

    #[tokio::test]
    async fn count_query_wraps_and_extracts() {
        let db = MockDb::new("pgsql");
        let row: EntryData = [("c", Value::Int(3))].into_iter().collect();
        db.push_rows(vec![row]);

        let count = db.count_query("SELECT * FROM t").await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            db.log()[0],
            "SELECT COUNT(*) AS c FROM (SELECT * FROM t) AS c_t"
        );
    }
}
