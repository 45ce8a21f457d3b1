//! Error types for sqlstack

use thiserror::Error;

/// Result type alias for sqlstack operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types raised by the builder, the renderer, and the entry manager
#[derive(Debug, Error)]
pub enum SqlError {
    /// Empty fields, selects, data, or wrapper content
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Batch-insert row width does not match the field list
    #[error("insert row {row} has {got} values, expected {expected}")]
    InsertArity {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Aggregate function outside the allowed set
    #[error("unknown aggregate function: {0}")]
    UnknownAggregate(String),

    /// Operator not in the accepted set after normalization
    #[error("invalid operator: {0}")]
    InvalidOp(String),

    /// Operation the target dialect cannot express
    #[error("unsupported for dialect '{dialect}': {what}")]
    UnsupportedDialect { dialect: String, what: String },

    /// UPDATE or DELETE rendered without a WHERE clause
    #[error("{0} requires a WHERE clause, pass '1=1' to target all rows")]
    MissingWhere(&'static str),

    /// `or_`/`and_`/`on`/`using` called with nothing to modify
    #[error("no preceding {0} clause")]
    NoPrecedingClause(&'static str),

    /// Render with no statement keys in the stack
    #[error("no query, the stack has no statement to render")]
    NoQueryReady,

    /// Join rendered without an ON or USING context
    #[error("join '{0}' has no ON or USING context")]
    JoinContextMissing(String),

    /// `offset` used before `limit`
    #[error("OFFSET requires a LIMIT clause")]
    OffsetWithoutLimit,

    /// `EntryManager::commit` on an empty manager
    #[error("no entries attached")]
    NoEntriesAttached,

    /// Manager constructed from a registry with no default database
    #[error("no default database registered")]
    NoDefaultDatabase,

    /// Error delegated from the database collaborator
    #[error("database error: {0}")]
    Database(String),

    /// Commit loop failure; the transaction has been rolled back
    #[error("entry commit failed, transaction rolled back: {0}")]
    Commit(#[source] Box<SqlError>),
}

impl SqlError {
    /// Create an empty-input error
    pub fn empty(what: impl Into<String>) -> Self {
        Self::EmptyInput(what.into())
    }

    /// Create an unsupported-dialect error
    pub fn unsupported(dialect: impl Into<String>, what: impl Into<String>) -> Self {
        Self::UnsupportedDialect {
            dialect: dialect.into(),
            what: what.into(),
        }
    }

    /// Create a delegated database error
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(message.into())
    }

    /// Check if this is a delegated database error
    pub fn is_database(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Commit(_))
    }

    /// Check if this is a missing-WHERE safety error
    pub fn is_missing_where(&self) -> bool {
        matches!(self, Self::MissingWhere(_))
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for SqlError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Database(err.to_string())
    }
}
