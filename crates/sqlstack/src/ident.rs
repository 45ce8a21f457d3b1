//! Raw SQL and identifier wrappers.
//!
//! This module provides the two tagged string types the builder accepts in
//! value positions:
//!
//! - [`Sql`] marks a pre-composed SQL fragment that must not be escaped.
//! - [`Name`] marks an identifier that is dialect-quoted but not otherwise
//!   processed.
//!
//! Both reject empty or whitespace-only content.
//!
//! # Example
//! ```ignore
//! use sqlstack::{Name, Sql};
//!
//! let now = Sql::new("NOW()")?;
//! let col = Name::new("created_at")?;
//! # Ok::<(), sqlstack::SqlError>(())
//! ```

use crate::error::{SqlError, SqlResult};

/// A raw SQL fragment, exempt from value escaping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sql(String);

impl Sql {
    /// Wrap a raw SQL fragment. Fails on empty or whitespace-only input.
    pub fn new(content: impl Into<String>) -> SqlResult<Self> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SqlError::empty("Sql content"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the fragment.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An identifier to be dialect-quoted only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(String);

impl Name {
    /// Wrap an identifier. Fails on empty or whitespace-only input.
    pub fn new(content: impl Into<String>) -> SqlResult<Self> {
        let content = content.into();
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(SqlError::empty("Name content"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
