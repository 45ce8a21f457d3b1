//! Reference `Database` implementation over tokio-postgres.
//!
//! Wraps an established [`tokio_postgres::Client`]; connection setup and the
//! connection task stay with the caller. PostgreSQL has native `RETURNING`,
//! so the fallback plan in [`QueryOptions`] is never consulted here.
//!
//! # Example
//!
//! ```ignore
//! let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;
//! tokio::spawn(connection);
//!
//! let db = Arc::new(PgDatabase::new(client));
//! let row = Query::new(db.clone())
//!     .select("*")?
//!     .from("users")?
//!     .id(1)?
//!     .get()
//!     .await?;
//! ```

use crate::database::{Database, QueryOptions};
use crate::entry::EntryData;
use crate::error::SqlResult;
use crate::platform::{Dialect, Platform};
use crate::result::QueryResult;
use crate::value::Value;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio_postgres::types::Type;
use tokio_postgres::Row;
use uuid::Uuid;

/// PostgreSQL driver over an established client.
pub struct PgDatabase {
    client: tokio_postgres::Client,
    platform: Platform,
}

impl PgDatabase {
    /// Wrap an established client.
    pub fn new(client: tokio_postgres::Client) -> Self {
        Self {
            client,
            platform: Platform::from_dialect(Dialect::Pgsql),
        }
    }

    /// Borrow the wrapped client.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.client
    }
}

impl Database for PgDatabase {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    async fn query(&self, sql: &str, _options: &QueryOptions) -> SqlResult<QueryResult> {
        let rows = self.client.query(sql, &[]).await?;
        let affected = rows.len() as u64;
        let rows = rows
            .iter()
            .map(row_to_entry)
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(QueryResult::new(rows, affected))
    }

    async fn execute(&self, sql: &str) -> SqlResult<u64> {
        Ok(self.client.execute(sql, &[]).await?)
    }

    async fn begin(&self) -> SqlResult<()> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn commit(&self) -> SqlResult<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&self) -> SqlResult<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }
}

/// Decode a driver row into an ordered field map of [`Value`]s.
///
/// Types outside the supported scalar set fall back to their text form.
fn row_to_entry(row: &Row) -> SqlResult<EntryData> {
    let mut data = EntryData::new();
    for (i, col) in row.columns().iter().enumerate() {
        let ty = col.type_();
        let value = if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(i)?.map(Value::Bool)
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(i)?.map(|v| Value::Int(v as i64))
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(i)?.map(|v| Value::Int(v as i64))
        } else if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(i)?.map(Value::Int)
        } else if *ty == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(i)?.map(|v| Value::Float(v as f64))
        } else if *ty == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(i)?.map(Value::Float)
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            row.try_get::<_, Option<serde_json::Value>>(i)?.map(Value::Json)
        } else if *ty == Type::TIMESTAMPTZ {
            row.try_get::<_, Option<DateTime<Utc>>>(i)?.map(Value::Timestamp)
        } else if *ty == Type::TIMESTAMP {
            row.try_get::<_, Option<NaiveDateTime>>(i)?
                .map(|v| Value::Timestamp(v.and_utc()))
        } else if *ty == Type::UUID {
            row.try_get::<_, Option<Uuid>>(i)?.map(Value::Uuid)
        } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
        {
            row.try_get::<_, Option<String>>(i)?.map(Value::Text)
        } else {
            row.try_get::<_, Option<String>>(i)
                .ok()
                .flatten()
                .map(Value::Text)
        };
        data.set(col.name(), value.unwrap_or(Value::Null));
    }
    Ok(data)
}
