//! Row-backed entries.
//!
//! [`EntryData`] is an insertion-ordered field map, used both as the row
//! shape returned by queries and as the data bag of an [`Entry`]. An `Entry`
//! couples one data bag with one prepared [`Query`] and a scratch
//! [`EntryState`]; the [`crate::EntryManager`] executes attached entries in a
//! single transaction and writes the first returned row back into `data`.

use crate::database::Database;
use crate::error::{SqlError, SqlResult};
use crate::query::Query;
use crate::result::QueryResult;
use crate::value::Value;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// An insertion-ordered mapping from field name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryData {
    items: Vec<(String, Value)>,
}

impl EntryData {
    /// Create an empty data bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing in place when it already exists.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let field = field.into();
        let value = value.into();
        match self.items.iter_mut().find(|(k, _)| *k == field) {
            Some(slot) => slot.1 = value,
            None => self.items.push((field, value)),
        }
        self
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.items.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    /// Check a field is present.
    pub fn has(&self, field: &str) -> bool {
        self.items.iter().any(|(k, _)| k == field)
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.items.iter().position(|(k, _)| k == field)?;
        Some(self.items.remove(idx).1)
    }

    /// Set every field from the given pairs.
    pub fn update<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        for (k, v) in pairs {
            self.set(k, v);
        }
        self
    }

    /// Pick the given fields into a new bag, in request order.
    ///
    /// Missing fields are skipped. Use [`EntryData::values`] to pick the
    /// same fields as a plain value list instead of a mapping.
    pub fn select(&self, fields: &[&str]) -> EntryData {
        let mut out = EntryData::new();
        for field in fields {
            if let Some(v) = self.get(field) {
                out.set(*field, v.clone());
            }
        }
        out
    }

    /// Pick the given field values as a plain list, in request order.
    ///
    /// The list counterpart of [`EntryData::select`]; missing fields are
    /// skipped.
    pub fn values(&self, fields: &[&str]) -> Vec<Value> {
        fields.iter().filter_map(|f| self.get(f).cloned()).collect()
    }

    /// Check the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.items.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in insertion order.
    pub fn fields(&self) -> Vec<&str> {
        self.items.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// Convert into a JSON object, preserving nothing but the values.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in &self.items {
            map.insert(k.clone(), v.to_json());
        }
        serde_json::Value::Object(map)
    }

    /// Decode the bag into a typed struct through its JSON form.
    pub fn decode<T: DeserializeOwned>(&self) -> SqlResult<T> {
        serde_json::from_value(self.to_json())
            .map_err(|e| SqlError::database(format!("row decode: {e}")))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for EntryData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = EntryData::new();
        data.update(iter);
        data
    }
}

/// Statement kind detected from an entry's query at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Select,
    Insert,
    Update,
    Delete,
}

impl Action {
    /// The lowercase action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Select => "select",
            Action::Insert => "insert",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scratch state written by the commit loop, with free-form user slots.
#[derive(Debug, Clone, Default)]
pub struct EntryState {
    /// Whether the entry's query returned at least one row.
    pub okay: Option<bool>,
    /// Statement kind the commit loop detected.
    pub action: Option<Action>,
    slots: EntryData,
}

impl EntryState {
    /// Set a user slot.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.slots.set(name, value);
    }

    /// Get a user slot.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.slots.get(name)
    }
}

/// A row-backed object carrying a prepared query.
#[derive(Debug)]
pub struct Entry<D: Database> {
    data: EntryData,
    query: Query<D>,
    result: Option<QueryResult>,
    state: EntryState,
}

impl<D: Database> Entry<D> {
    /// Create an empty entry bound to a database.
    pub fn new(db: Arc<D>) -> Self {
        Self {
            data: EntryData::new(),
            query: Query::new(db),
            result: None,
            state: EntryState::default(),
        }
    }

    /// Create an entry pre-filled with data.
    pub fn from_data<K, V>(db: Arc<D>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let mut entry = Self::new(db);
        entry.data.update(pairs);
        entry
    }

    /// Replace the prepared query.
    pub fn set_query(&mut self, query: Query<D>) -> &mut Self {
        self.query = query;
        self
    }

    /// Borrow the prepared query.
    pub fn query(&self) -> &Query<D> {
        &self.query
    }

    /// Take the prepared query, leaving a fresh one in place.
    pub(crate) fn take_query(&mut self) -> Query<D> {
        let fresh = self.query.fresh();
        std::mem::replace(&mut self.query, fresh)
    }

    /// Borrow the data bag.
    pub fn data(&self) -> &EntryData {
        &self.data
    }

    /// Mutably borrow the data bag.
    pub fn data_mut(&mut self) -> &mut EntryData {
        &mut self.data
    }

    /// Get a data field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Set a data field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.data.set(field, value);
        self
    }

    /// Borrow the state bag.
    pub fn state(&self) -> &EntryState {
        &self.state
    }

    /// Mutably borrow the state bag.
    pub fn state_mut(&mut self) -> &mut EntryState {
        &mut self.state
    }

    /// Whether the last commit saw at least one row for this entry.
    pub fn okay(&self) -> bool {
        self.state.okay.unwrap_or(false)
    }

    /// The result handle stored by the last commit.
    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub(crate) fn store_result(&mut self, result: QueryResult) {
        self.result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_preserves_insertion_order() {
        let mut data = EntryData::new();
        data.set("name", "Kerem").set("age", 30).set("name", "K.");
        assert_eq!(data.fields(), vec!["name", "age"]);
        assert_eq!(data.get("name"), Some(&Value::Text("K.".into())));
    }

    #[test]
    fn data_remove_then_has() {
        let mut data: EntryData = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(data.remove("a"), Some(Value::Int(1)));
        assert!(!data.has("a"));
        assert!(data.has("b"));
    }

    #[test]
    fn data_select_and_values() {
        let data: EntryData = [("a", 1), ("b", 2), ("c", 3)].into_iter().collect();
        let picked = data.select(&["c", "a", "missing"]);
        assert_eq!(picked.fields(), vec!["c", "a"]);
        assert_eq!(data.values(&["b"]), vec![Value::Int(2)]);
    }

    #[test]
    fn data_decodes_typed() {
        #[derive(serde::Deserialize)]
        struct RowShape {
            id: i64,
            name: String,
        }
        let data: EntryData = [("id", Value::Int(7)), ("name", Value::Text("x".into()))]
            .into_iter()
            .collect();
        let row: RowShape = data.decode().unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.name, "x");
    }

    #[test]
    fn state_slots() {
        let mut state = EntryState::default();
        state.set("touched", true);
        assert_eq!(state.get("touched"), Some(&Value::Bool(true)));
        assert!(state.okay.is_none());
    }
}
