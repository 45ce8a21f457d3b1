//! Query result handle.
//!
//! [`QueryResult`] is the shape every [`crate::Database`] implementation
//! returns: the fetched rows as [`EntryData`] bags, the affected-row count,
//! and, when a `RETURNING` fallback plan was in play, the recovered rows.

use crate::entry::EntryData;
use crate::error::SqlResult;
use serde::de::DeserializeOwned;

/// Rows and counters produced by one executed statement.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    rows: Vec<EntryData>,
    affected: u64,
    fallback_rows: Option<Vec<EntryData>>,
}

impl QueryResult {
    /// Create a result from fetched rows and an affected-row count.
    pub fn new(rows: Vec<EntryData>, affected: u64) -> Self {
        Self {
            rows,
            affected,
            fallback_rows: None,
        }
    }

    /// Create an empty result carrying only an affected-row count.
    pub fn affected_only(affected: u64) -> Self {
        Self::new(Vec::new(), affected)
    }

    /// Attach rows recovered through a `RETURNING` fallback plan.
    pub fn with_fallback_rows(mut self, rows: Vec<EntryData>) -> Self {
        self.fallback_rows = Some(rows);
        self
    }

    /// Number of fetched rows.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows were fetched.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Affected-row count reported by the driver.
    pub fn affected(&self) -> u64 {
        self.affected
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<&EntryData> {
        self.rows.first()
    }

    /// All fetched rows.
    pub fn rows(&self) -> &[EntryData] {
        &self.rows
    }

    /// One row by index.
    pub fn row(&self, index: usize) -> Option<&EntryData> {
        self.rows.get(index)
    }

    /// Rows recovered by the `RETURNING` fallback, when recorded.
    pub fn fallback_rows(&self) -> Option<&[EntryData]> {
        self.fallback_rows.as_deref()
    }

    /// The `id` field of the first row.
    pub fn id(&self) -> Option<i64> {
        self.first().and_then(|row| row.get("id")).and_then(|v| v.as_int())
    }

    /// The `id` field of every row, skipping rows without one.
    pub fn ids(&self) -> Vec<i64> {
        self.rows
            .iter()
            .filter_map(|row| row.get("id").and_then(|v| v.as_int()))
            .collect()
    }

    /// Decode the first row into a typed struct.
    pub fn first_as<T: DeserializeOwned>(&self) -> Option<SqlResult<T>> {
        self.first().map(EntryData::decode)
    }

    /// Decode every row into a typed struct.
    pub fn rows_as<T: DeserializeOwned>(&self) -> SqlResult<Vec<T>> {
        self.rows.iter().map(EntryData::decode).collect()
    }

    /// Consume into the fetched rows.
    pub fn into_rows(self) -> Vec<EntryData> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn row(id: i64) -> EntryData {
        [("id", Value::Int(id)), ("name", Value::Text(format!("u{id}")))]
            .into_iter()
            .collect()
    }

    #[test]
    fn counts_and_first() {
        let res = QueryResult::new(vec![row(1), row(2)], 2);
        assert_eq!(res.count(), 2);
        assert_eq!(res.affected(), 2);
        assert_eq!(res.first().unwrap().get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn id_extraction() {
        let res = QueryResult::new(vec![row(5), row(9)], 2);
        assert_eq!(res.id(), Some(5));
        assert_eq!(res.ids(), vec![5, 9]);
    }

    #[test]
    fn empty_result() {
        let res = QueryResult::affected_only(3);
        assert!(res.is_empty());
        assert_eq!(res.id(), None);
        assert_eq!(res.affected(), 3);
    }

    #[test]
    fn fallback_rows_carried() {
        let res = QueryResult::affected_only(1).with_fallback_rows(vec![row(4)]);
        assert_eq!(res.fallback_rows().unwrap().len(), 1);
    }
}
