//! # sqlstack
//!
//! A stack-based SQL query builder with a transactional entry engine.
//!
//! ## Features
//!
//! - **Chainable builder**: clauses accumulate in a keyed stack and render in
//!   a fixed, dialect-correct order
//! - **Five dialects**: pgsql, mysql, mssql, sqlite, oci. Quoting, JSON
//!   constructors, `ILIKE` lowering, and `RETURNING` emulation branch per
//!   [`Platform`]
//! - **Safe defaults**: UPDATE and DELETE refuse to render without a WHERE
//!   clause (`where_("1=1")` is the explicit opt-out)
//! - **Entry engine**: [`EntryManager`] commits many entries in one
//!   transaction and writes returned rows back into their data bags

pub mod condition;
pub mod database;
pub mod entry;
pub mod error;
pub mod ident;
pub mod manager;
pub mod paginate;
pub mod platform;
pub mod query;
pub mod result;
pub mod value;

mod prepare;

pub use condition::{Logic, Op, QueryParam, QueryParams};
pub use database::{Database, FallbackPlan, Fetch, QueryOptions, Registry};
pub use entry::{Action, Entry, EntryData, EntryState};
pub use error::{SqlError, SqlResult};
pub use ident::{Name, Sql};
pub use manager::EntryManager;
pub use paginate::Paginator;
pub use platform::{Dialect, Platform};
pub use query::{
    AggregateOptions, ClauseData, ClauseKey, IntoSort, JoinType, Nulls, OrderOptions, Query, Sort,
};
pub use result::QueryResult;
pub use value::Value;

#[cfg(feature = "postgres")]
pub mod pg;

#[cfg(feature = "postgres")]
pub use pg::PgDatabase;

#[cfg(test)]
pub(crate) mod test_util;
