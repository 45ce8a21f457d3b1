//! Dialect platform layer.
//!
//! [`Platform`] owns everything that differs between the supported SQL
//! flavors: identifier quoting and escaping, literal rendering for
//! [`Value`]s, JSON constructor selection, `ILIKE` lowering, the random
//! function, and feature branching (`RETURNING`, conflict clauses).
//!
//! # Example
//! ```ignore
//! use sqlstack::Platform;
//!
//! let pg = Platform::new("pgsql")?;
//! assert_eq!(pg.prepare_name("t.id"), r#""t"."id""#);
//!
//! let my = Platform::new("mysql")?;
//! assert_eq!(my.prepare_name("id"), "`id`");
//! # Ok::<(), sqlstack::SqlError>(())
//! ```

use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Dialect {
    Pgsql,
    Mysql,
    Mssql,
    Sqlite,
    Oci,
}

impl Dialect {
    /// The lowercase dialect name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Pgsql => "pgsql",
            Dialect::Mysql => "mysql",
            Dialect::Mssql => "mssql",
            Dialect::Sqlite => "sqlite",
            Dialect::Oci => "oci",
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-dialect quoting, escaping, and function selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    dialect: Dialect,
}

impl Platform {
    /// Create a platform from a lowercase alphabetic dialect name.
    pub fn new(name: &str) -> SqlResult<Self> {
        if name.is_empty() {
            return Err(SqlError::empty("dialect name"));
        }
        if !name.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(SqlError::unsupported(name, "dialect names are lowercase alphabetic"));
        }
        let dialect = match name {
            "pgsql" => Dialect::Pgsql,
            "mysql" => Dialect::Mysql,
            "mssql" => Dialect::Mssql,
            "sqlite" => Dialect::Sqlite,
            "oci" => Dialect::Oci,
            other => return Err(SqlError::unsupported(other, "unknown dialect")),
        };
        Ok(Self { dialect })
    }

    /// Create a platform for a known dialect.
    pub fn from_dialect(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect this platform targets.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// The lowercase dialect name.
    pub fn name(&self) -> &'static str {
        self.dialect.as_str()
    }

    /// Check the dialect name against a candidate.
    pub fn is(&self, name: &str) -> bool {
        self.name() == name
    }

    /// Check the dialect name against any of the candidates.
    pub fn is_any(&self, names: &[&str]) -> bool {
        names.iter().any(|n| self.is(n))
    }

    // ==================== Identifier quoting ====================

    fn delimiters(&self) -> (char, char) {
        match self.dialect {
            Dialect::Mysql => ('`', '`'),
            Dialect::Mssql => ('[', ']'),
            _ => ('"', '"'),
        }
    }

    /// Wrap an identifier in the dialect delimiters, stripping one layer of
    /// existing wrappers first.
    pub fn quote_name(&self, name: &str) -> String {
        let (open, close) = self.delimiters();
        let stripped = strip_wrappers(name);
        format!("{open}{stripped}{close}")
    }

    /// Double the closing delimiter character inside an identifier.
    pub fn escape_name(&self, name: &str) -> String {
        let (_, close) = self.delimiters();
        let mut out = String::with_capacity(name.len());
        for ch in name.chars() {
            out.push(ch);
            if ch == close {
                out.push(ch);
            }
        }
        out
    }

    /// Full identifier pipeline: `*` passes through, dotted paths are quoted
    /// per part, existing wrappers are stripped and inner delimiters doubled.
    pub fn prepare_name(&self, name: &str) -> String {
        if name == "*" {
            return name.to_string();
        }
        name.split('.')
            .map(|part| {
                if part == "*" {
                    part.to_string()
                } else {
                    self.quote_name(&self.escape_name(strip_wrappers(part)))
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a comma/whitespace separated identifier list, rejoined with `, `.
    pub fn prepare_names(&self, names: &str) -> String {
        names
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| self.prepare_name(t))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ==================== Literal escaping ====================

    /// Render a [`Value`] as a dialect-correct SQL literal.
    ///
    /// Lists flatten into a comma-joined sequence of literals.
    pub fn escape_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self.dialect {
                Dialect::Pgsql | Dialect::Mysql => b.to_string(),
                _ => (if *b { "1" } else { "0" }).to_string(),
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => self.quote_text(s),
            Value::Timestamp(t) => {
                self.quote_text(&t.format("%Y-%m-%d %H:%M:%S%.6f+00").to_string())
            }
            Value::Uuid(u) => self.quote_text(&u.to_string()),
            Value::Json(j) => self.quote_text(&j.to_string()),
            Value::List(items) => items
                .iter()
                .map(|v| self.escape_value(v))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Raw(s) => s.clone(),
            Value::Name(n) => self.prepare_name(n),
        }
    }

    /// Quote a text literal, doubling embedded quotes.
    ///
    /// MySQL additionally doubles backslashes, which it treats as escapes.
    pub fn quote_text(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' if self.dialect == Dialect::Mysql => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }

    /// Escape `%`, `_`, and `\` in a LIKE search string.
    ///
    /// With `full` the result is additionally quoted as a text literal.
    pub fn escape_like(&self, s: &str, full: bool) -> String {
        let mut out = String::with_capacity(s.len());
        for ch in s.chars() {
            if matches!(ch, '%' | '_' | '\\') {
                out.push('\\');
            }
            out.push(ch);
        }
        if full { self.quote_text(&out) } else { out }
    }

    // ==================== Function selection ====================

    /// The JSON constructor for this dialect, or `None` when unsupported.
    pub fn json_function(&self, array: bool) -> Option<&'static str> {
        match self.dialect {
            Dialect::Pgsql => Some(if array { "json_build_array" } else { "json_build_object" }),
            Dialect::Mysql => Some(if array { "json_array" } else { "json_object" }),
            _ => None,
        }
    }

    /// The random-number function for this dialect.
    pub fn random_function(&self) -> &'static str {
        match self.dialect {
            Dialect::Pgsql => "random()",
            _ => "rand()",
        }
    }

    /// Format a case-insensitive LIKE over pre-rendered fragments.
    pub fn format_ilike(&self, field: &str, search: &str) -> String {
        match self.dialect {
            Dialect::Pgsql => format!("{field} ILIKE {search}"),
            _ => format!("lower({field}) LIKE lower({search})"),
        }
    }

    /// Format a case-insensitive NOT LIKE over pre-rendered fragments.
    pub fn format_not_ilike(&self, field: &str, search: &str) -> String {
        match self.dialect {
            Dialect::Pgsql => format!("{field} NOT ILIKE {search}"),
            _ => format!("lower({field}) NOT LIKE lower({search})"),
        }
    }

    // ==================== Feature branching ====================

    /// Whether the dialect has a native `RETURNING` clause.
    pub fn supports_returning(&self) -> bool {
        matches!(self.dialect, Dialect::Pgsql | Dialect::Oci)
    }

    /// Whether the dialect can express an insert conflict clause.
    pub fn supports_conflict(&self) -> bool {
        matches!(self.dialect, Dialect::Pgsql | Dialect::Mysql)
    }
}

/// Strip one layer of `"…"`, `` `…` ``, or `[…]` wrappers.
fn strip_wrappers(name: &str) -> &str {
    let bytes = name.as_bytes();
    if bytes.len() >= 2 {
        let pair = (bytes[0], bytes[bytes.len() - 1]);
        if matches!(pair, (b'"', b'"') | (b'`', b'`') | (b'[', b']')) {
            return &name[1..name.len() - 1];
        }
    }
    name
}
