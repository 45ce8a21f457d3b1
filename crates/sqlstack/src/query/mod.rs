//! Query stack engine.
//!
//! [`Query`] is a chainable builder over a keyed clause [`Stack`]. Every
//! mutating call validates its input, escapes it through the bound
//! [`Database`]'s platform, and pushes it into the stack; [`Query::to_sql`]
//! runs the rendering pipeline; [`Query::run`] / [`Query::exec`] hand the
//! rendered SQL to the database.
//!
//! # Example
//!
//! ```ignore
//! use sqlstack::Query;
//!
//! let users = Query::new(db.clone())
//!     .select("*")?
//!     .from("users")?
//!     .where_eq("status", "active")?
//!     .desc("created_at")?
//!     .limit(20)
//!     .get_all()
//!     .await?;
//! ```

mod delete;
mod insert;
mod render;
mod select;
pub(crate) mod stack;
mod update;
mod where_clause;

pub use select::AggregateOptions;
pub use stack::{ClauseData, ClauseKey};

use crate::database::{Database, Fetch, QueryOptions};
use crate::entry::{Action, EntryData};
use crate::error::{SqlError, SqlResult};
use crate::paginate::Paginator;
use crate::platform::Platform;
use crate::result::QueryResult;
use crate::value::Value;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use stack::{JoinClause, Stack, UnionClause, WithClause};
use std::sync::Arc;

/// Join flavor, optionally OUTER-suffixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    LeftOuter,
    Right,
    RightOuter,
    Full,
    FullOuter,
}

impl JoinType {
    fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
            JoinType::Full => "FULL JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
        }
    }
}

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    fn as_str(&self) -> &'static str {
        match self {
            Sort::Asc => "ASC",
            Sort::Desc => "DESC",
        }
    }
}

/// Accepted sort inputs: [`Sort`], `1`/`-1`, `"ASC"`/`"DESC"`.
pub trait IntoSort {
    fn into_sort(self) -> SqlResult<Sort>;
}

impl IntoSort for Sort {
    fn into_sort(self) -> SqlResult<Sort> {
        Ok(self)
    }
}

impl IntoSort for i32 {
    fn into_sort(self) -> SqlResult<Sort> {
        match self {
            1 => Ok(Sort::Asc),
            -1 => Ok(Sort::Desc),
            other => Err(SqlError::InvalidOp(other.to_string())),
        }
    }
}

impl IntoSort for &str {
    fn into_sort(self) -> SqlResult<Sort> {
        match self.to_ascii_uppercase().as_str() {
            "ASC" | "1" | "+1" => Ok(Sort::Asc),
            "DESC" | "-1" => Ok(Sort::Desc),
            other => Err(SqlError::InvalidOp(other.to_string())),
        }
    }
}

/// NULL placement for `order_by_opts` (pgsql/oci only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nulls {
    First,
    Last,
}

/// Options for `order_by_opts`.
#[derive(Debug, Clone, Default)]
pub struct OrderOptions {
    pub collate: Option<String>,
    pub nulls: Option<Nulls>,
}

/// Chainable SQL builder over a clause stack.
pub struct Query<D: Database> {
    db: Arc<D>,
    stack: Stack,
}

impl<D: Database> Clone for Query<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            stack: self.stack.clone(),
        }
    }
}

impl<D: Database> std::fmt::Debug for Query<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query").field("stack", &self.stack).finish()
    }
}

impl<D: Database> Query<D> {
    /// Create an empty builder bound to a database.
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            stack: Stack::new(),
        }
    }

    /// The bound database.
    pub fn db(&self) -> &Arc<D> {
        &self.db
    }

    /// The dialect platform of the bound database.
    pub fn platform(&self) -> &Platform {
        self.db.platform()
    }

    pub(crate) fn stack(&self) -> &Stack {
        &self.stack
    }

    pub(crate) fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }

    // ==================== Targets ====================

    /// Set the statement table.
    pub fn table(mut self, name: &str) -> SqlResult<Self> {
        let name = non_empty(name, "table name")?;
        let prepared = self.db.escape_name(name);
        self.stack.set(ClauseKey::Table, ClauseData::Text(prepared));
        Ok(self)
    }

    /// Set the FROM target.
    pub fn from(mut self, name: &str) -> SqlResult<Self> {
        let name = non_empty(name, "from target")?;
        let prepared = self.db.escape_name(name);
        self.stack.set(ClauseKey::From, ClauseData::Text(prepared));
        Ok(self)
    }

    /// Set a sub-query FROM target with an alias.
    pub fn from_query(mut self, sub: &Query<D>, alias: &str) -> SqlResult<Self> {
        let alias = non_empty(alias, "from alias")?;
        let sql = sub.to_sql()?;
        let prepared = format!("({sql}) AS {}", self.db.escape_name(alias));
        self.stack.set(ClauseKey::From, ClauseData::Text(prepared));
        Ok(self)
    }

    /// Set the INSERT INTO target.
    pub fn into_table(mut self, name: &str) -> SqlResult<Self> {
        let name = non_empty(name, "into target")?;
        let prepared = self.db.escape_name(name);
        self.stack.set(ClauseKey::Into, ClauseData::Text(prepared));
        Ok(self)
    }

    // ==================== Joins ====================

    /// Add an INNER JOIN.
    pub fn join(self, to: &str) -> SqlResult<Self> {
        self.join_with(to, JoinType::Inner)
    }

    /// Add a LEFT JOIN.
    pub fn left_join(self, to: &str) -> SqlResult<Self> {
        self.join_with(to, JoinType::Left)
    }

    /// Add a RIGHT JOIN.
    pub fn right_join(self, to: &str) -> SqlResult<Self> {
        self.join_with(to, JoinType::Right)
    }

    /// Add a FULL JOIN.
    pub fn full_join(self, to: &str) -> SqlResult<Self> {
        self.join_with(to, JoinType::Full)
    }

    /// Add a join of the given type.
    pub fn join_with(mut self, to: &str, ty: JoinType) -> SqlResult<Self> {
        let to = non_empty(to, "join target")?;
        let content = format!("{} {}", ty.as_str(), self.db.escape_name(to));
        self.stack.joins_mut().push(JoinClause {
            content,
            context: None,
        });
        Ok(self)
    }

    /// Attach an ON context to the last join.
    pub fn on(mut self, expr: &str, params: &[Value]) -> SqlResult<Self> {
        let expr = non_empty(expr, "join condition")?;
        let prepared = self.db.prepare(expr, params);
        let last = self
            .stack
            .joins_mut()
            .last_mut()
            .ok_or(SqlError::NoPrecedingClause("join"))?;
        last.context = Some(format!("ON ({prepared})"));
        Ok(self)
    }

    /// Attach a USING context to the last join.
    pub fn using(mut self, fields: &str) -> SqlResult<Self> {
        let fields = non_empty(fields, "join fields")?;
        let prepared = self.db.escape_names(fields);
        let last = self
            .stack
            .joins_mut()
            .last_mut()
            .ok_or(SqlError::NoPrecedingClause("join"))?;
        last.context = Some(format!("USING ({prepared})"));
        Ok(self)
    }

    // ==================== Grouping & ordering ====================

    /// Set GROUP BY fields.
    pub fn group_by(mut self, fields: &str) -> SqlResult<Self> {
        let fields = non_empty(fields, "group fields")?;
        let prepared = self.db.escape_names(fields);
        self.stack.texts_mut(ClauseKey::Group).push(prepared);
        Ok(self)
    }

    /// Set GROUP BY with rollup lowering.
    pub fn group_by_rollup(mut self, fields: &str) -> SqlResult<Self> {
        let fields = non_empty(fields, "group fields")?;
        let prepared = self.db.escape_names(fields);
        let item = if self.platform().is("mysql") {
            format!("{prepared} WITH ROLLUP")
        } else {
            format!("ROLLUP ({prepared})")
        };
        self.stack.texts_mut(ClauseKey::Group).push(item);
        Ok(self)
    }

    /// Set the HAVING condition.
    pub fn having(mut self, expr: &str, params: &[Value]) -> SqlResult<Self> {
        let expr = non_empty(expr, "having condition")?;
        let prepared = self.db.prepare(expr, params);
        self.stack.set(ClauseKey::Having, ClauseData::Text(prepared));
        Ok(self)
    }

    /// Add an ORDER BY item.
    pub fn order_by(self, field: &str, dir: impl IntoSort) -> SqlResult<Self> {
        self.order_by_opts(field, dir, &OrderOptions::default())
    }

    /// Add an ORDER BY item with collation and NULLS placement.
    pub fn order_by_opts(
        mut self,
        field: &str,
        dir: impl IntoSort,
        opts: &OrderOptions,
    ) -> SqlResult<Self> {
        let field = non_empty(field, "order field")?;
        let sort = dir.into_sort()?;
        let mut item = format!("{} {}", self.db.escape_name(field), sort.as_str());
        if let Some(collate) = &opts.collate {
            item = format!(
                "{} COLLATE {} {}",
                self.db.escape_name(field),
                self.db.escape_name(collate),
                sort.as_str()
            );
        }
        if let Some(nulls) = opts.nulls {
            if self.platform().is_any(&["pgsql", "oci"]) {
                item.push_str(match nulls {
                    Nulls::First => " NULLS FIRST",
                    Nulls::Last => " NULLS LAST",
                });
            }
        }
        self.stack.texts_mut(ClauseKey::Order).push(item);
        Ok(self)
    }

    /// Add a raw ORDER BY fragment.
    pub fn order_by_sql(mut self, sql: crate::ident::Sql) -> Self {
        self.stack.texts_mut(ClauseKey::Order).push(sql.into_string());
        self
    }

    /// Order by the dialect's random function.
    pub fn order_by_random(mut self) -> Self {
        let item = self.platform().random_function().to_string();
        self.stack.texts_mut(ClauseKey::Order).push(item);
        self
    }

    /// Ascending order shortcut.
    pub fn asc(self, field: &str) -> SqlResult<Self> {
        self.order_by(field, Sort::Asc)
    }

    /// Descending order shortcut.
    pub fn desc(self, field: &str) -> SqlResult<Self> {
        self.order_by(field, Sort::Desc)
    }

    /// `where_eq("id", value)` shortcut.
    pub fn id(self, value: impl Into<Value>) -> SqlResult<Self> {
        self.where_eq("id", value)
    }

    // ==================== Limits ====================

    /// Set the LIMIT.
    pub fn limit(mut self, n: u64) -> Self {
        self.stack.set(ClauseKey::Limit, ClauseData::Uint(n));
        self
    }

    /// Set the OFFSET. Requires a LIMIT to be present.
    pub fn offset(self, n: u64) -> SqlResult<Self> {
        if !self.stack.has(ClauseKey::Limit) {
            return Err(SqlError::OffsetWithoutLimit);
        }
        Ok(self.set_offset(n))
    }

    fn set_offset(mut self, n: u64) -> Self {
        self.stack.set(ClauseKey::Offset, ClauseData::Uint(n));
        self
    }

    /// Set LIMIT and OFFSET for a 1-based page.
    pub fn paginate(self, page: u64, per_page: u64) -> Self {
        let pager = Paginator::new(page, per_page);
        self.limit(pager.limit()).set_offset(pager.offset())
    }

    // ==================== Compounds ====================

    /// Add a UNION with another query.
    pub fn union(mut self, sub: &Query<D>) -> SqlResult<Self> {
        let sql = sub.to_sql()?;
        self.stack.unions_mut().push(UnionClause { sql, all: false });
        Ok(self)
    }

    /// Add a UNION ALL with another query.
    pub fn union_all(mut self, sub: &Query<D>) -> SqlResult<Self> {
        let sql = sub.to_sql()?;
        self.stack.unions_mut().push(UnionClause { sql, all: true });
        Ok(self)
    }

    /// Add a WITH clause.
    pub fn with_query(self, name: &str, sub: &Query<D>, fields: Option<&str>) -> SqlResult<Self> {
        self.push_with(name, sub, fields, false, None)
    }

    /// Add a WITH RECURSIVE clause.
    pub fn with_recursive(
        self,
        name: &str,
        sub: &Query<D>,
        fields: Option<&str>,
    ) -> SqlResult<Self> {
        self.push_with(name, sub, fields, true, None)
    }

    /// Add a WITH clause with an explicit MATERIALIZED hint.
    pub fn with_materialized(
        self,
        name: &str,
        sub: &Query<D>,
        materialized: bool,
    ) -> SqlResult<Self> {
        self.push_with(name, sub, None, false, Some(materialized))
    }

    fn push_with(
        mut self,
        name: &str,
        sub: &Query<D>,
        fields: Option<&str>,
        recursive: bool,
        materialized: Option<bool>,
    ) -> SqlResult<Self> {
        let name = non_empty(name, "with name")?;
        let sql = sub.to_sql()?;
        let fields = fields.map(|f| self.db.escape_names(f));
        let name = self.db.escape_name(name);
        self.stack.withs_mut().push(WithClause {
            name,
            sql,
            fields,
            recursive,
            materialized,
        });
        Ok(self)
    }

    /// Bolt an unparsed SQL fragment onto the stack.
    pub fn append(mut self, sql: &str) -> SqlResult<Self> {
        let sql = non_empty(sql, "append fragment")?;
        self.stack
            .texts_mut(ClauseKey::Append)
            .push(sql.to_string());
        Ok(self)
    }

    // ==================== RETURNING ====================

    /// Request returned fields from INSERT/UPDATE/DELETE.
    ///
    /// On dialects without native `RETURNING` a fallback plan is materialized
    /// at execution time; see [`QueryResult::fallback_rows`].
    pub fn returning(self, fields: &str) -> SqlResult<Self> {
        self.returning_inner(fields, None)
    }

    /// `returning` with an explicit fetch style.
    pub fn returning_with(self, fields: &str, fetch: Fetch) -> SqlResult<Self> {
        self.returning_inner(fields, Some(fetch))
    }

    fn returning_inner(mut self, fields: &str, fetch: Option<Fetch>) -> SqlResult<Self> {
        let fields = non_empty(fields, "returning fields")?;
        let prepared = if fields == "*" {
            "*".to_string()
        } else {
            self.db.escape_names(fields)
        };
        self.stack.set(
            ClauseKey::Return,
            ClauseData::Return(stack::ReturnData {
                fields: prepared,
                fetch,
            }),
        );
        Ok(self)
    }

    // ==================== Introspection ====================

    /// Check a clause key is present.
    pub fn has(&self, key: ClauseKey) -> bool {
        self.stack.has(key)
    }

    /// Copy out a clause payload.
    pub fn pick(&self, key: ClauseKey) -> Option<ClauseData> {
        self.stack.get(key).cloned()
    }

    /// Remove and return a clause payload.
    pub fn pull(&mut self, key: ClauseKey) -> Option<ClauseData> {
        self.stack.remove(key)
    }

    /// Remove a clause payload.
    pub fn drop_clause(mut self, key: ClauseKey) -> Self {
        self.stack.remove(key);
        self
    }

    /// Clear the whole stack.
    pub fn reset(mut self) -> Self {
        self.stack.clear();
        self
    }

    /// A new empty builder over the same database.
    pub fn fresh(&self) -> Self {
        Query::new(Arc::clone(&self.db))
    }

    /// Merge another builder's stack into this one.
    pub fn merge(mut self, other: &Query<D>) -> Self {
        self.stack.merge(other.stack());
        self
    }

    /// The statement kind this stack would execute.
    pub fn action(&self) -> Option<Action> {
        match self.stack.statement_key()? {
            ClauseKey::Select => Some(Action::Select),
            ClauseKey::Insert => Some(Action::Insert),
            ClauseKey::Update => Some(Action::Update),
            ClauseKey::Delete => Some(Action::Delete),
            _ => None,
        }
    }

    /// Render each present clause as a `(key, fragment)` pair.
    pub fn to_array(&self, sort: bool) -> Vec<(&'static str, String)> {
        let mut keys: Vec<ClauseKey> = self.stack.keys().collect();
        if sort {
            keys.sort_by_key(|k| k.as_str());
        }
        keys.into_iter()
            .filter_map(|key| {
                render::render_fragment(&self.stack, self.platform(), key)
                    .map(|fragment| (key.as_str(), fragment))
            })
            .collect()
    }

    /// Hex digest of the rendered SQL; equal for rendering-equivalent
    /// builders.
    pub fn to_hash(&self) -> SqlResult<String> {
        let sql = self.to_sql()?;
        let digest = Sha256::digest(sql.as_bytes());
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Render the statement.
    pub fn to_sql(&self) -> SqlResult<String> {
        render::render(&self.stack, self.platform(), 0)
    }

    /// Render the statement with clause-per-line indentation.
    pub fn to_sql_indented(&self, level: usize) -> SqlResult<String> {
        render::render(&self.stack, self.platform(), level.max(1))
    }

    // ==================== Execution ====================

    fn options(&self) -> QueryOptions {
        QueryOptions {
            fetch: self
                .stack
                .return_data()
                .and_then(|r| r.fetch)
                .unwrap_or_default(),
            sequence: self
                .stack
                .insert_data()
                .map(|d| d.sequence)
                .unwrap_or(false),
            fallback: render::fallback_plan(&self.stack, self.platform()),
        }
    }

    /// Render and run the statement, fetching rows.
    pub async fn run(&self) -> SqlResult<QueryResult> {
        self.run_with(self.options()).await
    }

    /// `run` with an explicit fetch style.
    pub async fn run_fetch(&self, fetch: Fetch) -> SqlResult<QueryResult> {
        let mut options = self.options();
        options.fetch = fetch;
        self.run_with(options).await
    }

    async fn run_with(&self, options: QueryOptions) -> SqlResult<QueryResult> {
        let sql = self.to_sql()?;

        // RETURNING emulation for DELETE: recover the doomed rows first.
        let recovered = match render::fallback_delete_select(&self.stack, self.platform()) {
            Some(select_sql) => {
                tracing::debug!(sql = %select_sql, "returning fallback select");
                Some(
                    self.db
                        .query(&select_sql, &QueryOptions::default())
                        .await?
                        .into_rows(),
                )
            }
            None => None,
        };

        tracing::debug!(sql = %sql, "query");
        let result = self.db.query(&sql, &options).await?;
        Ok(match recovered {
            Some(rows) => result.with_fallback_rows(rows),
            None => result,
        })
    }

    /// Render and execute the statement, returning the affected-row count.
    pub async fn exec(&self) -> SqlResult<u64> {
        let sql = self.to_sql()?;
        tracing::debug!(sql = %sql, "execute");
        self.db.execute(&sql).await
    }

    /// Execute, then reset the stack retaining the statement targets.
    pub async fn commit(&mut self) -> SqlResult<QueryResult> {
        let result = self.run().await?;
        let retained: Vec<(ClauseKey, ClauseData)> = [ClauseKey::Table, ClauseKey::From, ClauseKey::Into]
            .into_iter()
            .filter_map(|k| self.stack.get(k).cloned().map(|d| (k, d)))
            .collect();
        self.stack.clear();
        for (key, data) in retained {
            self.stack.set(key, data);
        }
        Ok(result)
    }

    /// Fetch the first row.
    pub async fn get(&self) -> SqlResult<Option<EntryData>> {
        Ok(self.run().await?.first().cloned())
    }

    /// Fetch all rows.
    pub async fn get_all(&self) -> SqlResult<Vec<EntryData>> {
        Ok(self.run().await?.into_rows())
    }

    /// Fetch the first row decoded into a typed struct.
    pub async fn get_as<T: DeserializeOwned>(&self) -> SqlResult<Option<T>> {
        self.run().await?.first_as().transpose()
    }

    /// Fetch all rows decoded into typed structs.
    pub async fn get_all_as<T: DeserializeOwned>(&self) -> SqlResult<Vec<T>> {
        self.run().await?.rows_as()
    }

    /// Alias of [`Query::get`].
    pub async fn get_row(&self) -> SqlResult<Option<EntryData>> {
        self.get().await
    }

    /// Alias of [`Query::get_all`].
    pub async fn get_rows(&self) -> SqlResult<Vec<EntryData>> {
        self.get_all().await
    }

    /// Fetch the first row's `id`.
    pub async fn get_id(&self) -> SqlResult<Option<i64>> {
        Ok(self.run().await?.id())
    }

    /// Fetch every row's `id`.
    pub async fn get_ids(&self) -> SqlResult<Vec<i64>> {
        Ok(self.run().await?.ids())
    }

    /// Count the rows the current statement matches.
    pub async fn count(&self) -> SqlResult<i64> {
        let sql = self.to_sql()?;
        tracing::debug!(sql = %sql, "count");
        self.db.count_query(&sql).await
    }

    /// Count, record totals on the paginator, and fetch the requested page.
    pub async fn paginate_fetch(&self, pager: &mut Paginator) -> SqlResult<Vec<EntryData>> {
        let total = self.count().await?;
        pager.set_total(total.max(0) as u64);
        let page = self.clone().limit(pager.limit()).set_offset(pager.offset());
        page.get_all().await
    }
}

pub(crate) fn non_empty<'s>(input: &'s str, what: &str) -> SqlResult<&'s str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SqlError::empty(what));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests;
