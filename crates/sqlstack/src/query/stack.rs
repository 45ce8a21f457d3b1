//! Clause stack storage.
//!
//! The stack is a mapping from [`ClauseKey`] to accumulated payload. Keys are
//! either *appending* (`select`, `where`, `join`, `group`, `order`, `union`,
//! `with`, `append`) or *replacing* (everything else); [`Stack::merge`]
//! honors that split.

use crate::condition::Logic;
use crate::database::Fetch;
use std::collections::BTreeMap;

/// Keys of the clause stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClauseKey {
    Table,
    From,
    Into,
    Select,
    Insert,
    Update,
    Delete,
    Where,
    Join,
    Group,
    Having,
    Order,
    Limit,
    Offset,
    Union,
    With,
    Return,
    Conflict,
    Append,
}

impl ClauseKey {
    /// The lowercase key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseKey::Table => "table",
            ClauseKey::From => "from",
            ClauseKey::Into => "into",
            ClauseKey::Select => "select",
            ClauseKey::Insert => "insert",
            ClauseKey::Update => "update",
            ClauseKey::Delete => "delete",
            ClauseKey::Where => "where",
            ClauseKey::Join => "join",
            ClauseKey::Group => "group",
            ClauseKey::Having => "having",
            ClauseKey::Order => "order",
            ClauseKey::Limit => "limit",
            ClauseKey::Offset => "offset",
            ClauseKey::Union => "union",
            ClauseKey::With => "with",
            ClauseKey::Return => "return",
            ClauseKey::Conflict => "conflict",
            ClauseKey::Append => "append",
        }
    }

    /// Parse a lowercase key name.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "table" => ClauseKey::Table,
            "from" => ClauseKey::From,
            "into" => ClauseKey::Into,
            "select" => ClauseKey::Select,
            "insert" => ClauseKey::Insert,
            "update" => ClauseKey::Update,
            "delete" => ClauseKey::Delete,
            "where" => ClauseKey::Where,
            "join" => ClauseKey::Join,
            "group" => ClauseKey::Group,
            "having" => ClauseKey::Having,
            "order" => ClauseKey::Order,
            "limit" => ClauseKey::Limit,
            "offset" => ClauseKey::Offset,
            "union" => ClauseKey::Union,
            "with" => ClauseKey::With,
            "return" => ClauseKey::Return,
            "conflict" => ClauseKey::Conflict,
            "append" => ClauseKey::Append,
            _ => return None,
        })
    }

    /// Whether payloads under this key accumulate instead of replace.
    pub fn is_appending(&self) -> bool {
        matches!(
            self,
            ClauseKey::Select
                | ClauseKey::Where
                | ClauseKey::Join
                | ClauseKey::Group
                | ClauseKey::Order
                | ClauseKey::Union
                | ClauseKey::With
                | ClauseKey::Append
        )
    }
}

impl std::fmt::Display for ClauseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One WHERE element: rendered parts joined by the element's logic.
///
/// A single-part element comes from the expression forms; a multi-part
/// element comes from a mapping or [`crate::QueryParams`] call. The element
/// always renders parenthesized, and its logic also joins it to the next
/// element.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub parts: Vec<String>,
    pub logic: Logic,
}

impl WhereClause {
    pub fn new(part: String) -> Self {
        Self {
            parts: vec![part],
            logic: Logic::And,
        }
    }

    pub fn group(parts: Vec<String>) -> Self {
        Self {
            parts,
            logic: Logic::And,
        }
    }
}

/// One JOIN element and its ON/USING context.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub content: String,
    pub context: Option<String>,
}

/// One UNION element.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionClause {
    pub sql: String,
    pub all: bool,
}

/// One WITH element.
#[derive(Debug, Clone, PartialEq)]
pub struct WithClause {
    pub name: String,
    pub sql: String,
    pub fields: Option<String>,
    pub recursive: bool,
    pub materialized: Option<bool>,
}

/// Accumulated INSERT payload: escaped fields and escaped value rows.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertData {
    pub fields: Vec<String>,
    pub rows: Vec<String>,
    pub sequence: bool,
}

/// Accumulated RETURNING payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnData {
    pub fields: String,
    pub fetch: Option<Fetch>,
}

/// Conflict action selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    Nothing,
    Update,
}

/// Conflict SET payload: explicit assignments or the whole insert field list.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictUpdate {
    /// Re-assign every insert field from the proposed row.
    All,
    /// Explicit `(escaped field, rendered value)` assignments.
    Pairs(Vec<(String, String)>),
}

/// Accumulated conflict payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ConflictData {
    pub fields: String,
    pub action: ConflictAction,
    pub update: Option<ConflictUpdate>,
    pub where_sql: Option<String>,
}

/// Payload stored under one clause key.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseData {
    /// `table`, `from`, `into`, `having`
    Text(String),
    /// `select`, `update`, `group`, `order`, `append`
    Texts(Vec<String>),
    /// `limit`, `offset`
    Uint(u64),
    /// `insert`
    Insert(InsertData),
    /// `delete` sentinel
    Delete,
    /// `where`
    Wheres(Vec<WhereClause>),
    /// `join`
    Joins(Vec<JoinClause>),
    /// `union`
    Unions(Vec<UnionClause>),
    /// `with`
    Withs(Vec<WithClause>),
    /// `return`
    Return(ReturnData),
    /// `conflict`
    Conflict(ConflictData),
}

/// The clause accumulator of one builder instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    map: BTreeMap<ClauseKey, ClauseData>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: ClauseKey) -> bool {
        self.map.contains_key(&key)
    }

    pub fn get(&self, key: ClauseKey) -> Option<&ClauseData> {
        self.map.get(&key)
    }

    pub fn set(&mut self, key: ClauseKey, data: ClauseData) {
        self.map.insert(key, data);
    }

    pub fn remove(&mut self, key: ClauseKey) -> Option<ClauseData> {
        self.map.remove(&key)
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ClauseKey> + '_ {
        self.map.keys().copied()
    }

    /// The statement this stack renders, by the fixed precedence
    /// insert > update > delete > select.
    pub fn statement_key(&self) -> Option<ClauseKey> {
        [
            ClauseKey::Insert,
            ClauseKey::Update,
            ClauseKey::Delete,
            ClauseKey::Select,
        ]
        .into_iter()
        .find(|k| self.has(*k))
    }

    /// The resolvable statement target, preferring `table` over `from` over
    /// `into`.
    pub fn target(&self) -> Option<&str> {
        for key in [ClauseKey::Table, ClauseKey::From, ClauseKey::Into] {
            if let Some(ClauseData::Text(t)) = self.get(key) {
                return Some(t);
            }
        }
        None
    }

    // ==================== Typed accessors ====================

    pub fn text(&self, key: ClauseKey) -> Option<&str> {
        match self.get(key) {
            Some(ClauseData::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn texts(&self, key: ClauseKey) -> Option<&[String]> {
        match self.get(key) {
            Some(ClauseData::Texts(items)) => Some(items),
            _ => None,
        }
    }

    pub fn uint(&self, key: ClauseKey) -> Option<u64> {
        match self.get(key) {
            Some(ClauseData::Uint(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn texts_mut(&mut self, key: ClauseKey) -> &mut Vec<String> {
        match self.map.entry(key).or_insert_with(|| ClauseData::Texts(Vec::new())) {
            ClauseData::Texts(items) => items,
            other => {
                *other = ClauseData::Texts(Vec::new());
                match other {
                    ClauseData::Texts(items) => items,
                    _ => unreachable!(),
                }
            }
        }
    }

    pub fn wheres(&self) -> Option<&[WhereClause]> {
        match self.get(ClauseKey::Where) {
            Some(ClauseData::Wheres(items)) => Some(items),
            _ => None,
        }
    }

    pub fn wheres_mut(&mut self) -> &mut Vec<WhereClause> {
        match self
            .map
            .entry(ClauseKey::Where)
            .or_insert_with(|| ClauseData::Wheres(Vec::new()))
        {
            ClauseData::Wheres(items) => items,
            _ => unreachable!(),
        }
    }

    pub fn joins(&self) -> Option<&[JoinClause]> {
        match self.get(ClauseKey::Join) {
            Some(ClauseData::Joins(items)) => Some(items),
            _ => None,
        }
    }

    pub fn joins_mut(&mut self) -> &mut Vec<JoinClause> {
        match self
            .map
            .entry(ClauseKey::Join)
            .or_insert_with(|| ClauseData::Joins(Vec::new()))
        {
            ClauseData::Joins(items) => items,
            _ => unreachable!(),
        }
    }

    pub fn unions_mut(&mut self) -> &mut Vec<UnionClause> {
        match self
            .map
            .entry(ClauseKey::Union)
            .or_insert_with(|| ClauseData::Unions(Vec::new()))
        {
            ClauseData::Unions(items) => items,
            _ => unreachable!(),
        }
    }

    pub fn withs_mut(&mut self) -> &mut Vec<WithClause> {
        match self
            .map
            .entry(ClauseKey::With)
            .or_insert_with(|| ClauseData::Withs(Vec::new()))
        {
            ClauseData::Withs(items) => items,
            _ => unreachable!(),
        }
    }

    pub fn insert_data(&self) -> Option<&InsertData> {
        match self.get(ClauseKey::Insert) {
            Some(ClauseData::Insert(data)) => Some(data),
            _ => None,
        }
    }

    pub fn insert_data_mut(&mut self) -> Option<&mut InsertData> {
        match self.map.get_mut(&ClauseKey::Insert) {
            Some(ClauseData::Insert(data)) => Some(data),
            _ => None,
        }
    }

    pub fn return_data(&self) -> Option<&ReturnData> {
        match self.get(ClauseKey::Return) {
            Some(ClauseData::Return(data)) => Some(data),
            _ => None,
        }
    }

    pub fn conflict_data(&self) -> Option<&ConflictData> {
        match self.get(ClauseKey::Conflict) {
            Some(ClauseData::Conflict(data)) => Some(data),
            _ => None,
        }
    }

    pub fn conflict_data_mut(&mut self) -> Option<&mut ConflictData> {
        match self.map.get_mut(&ClauseKey::Conflict) {
            Some(ClauseData::Conflict(data)) => Some(data),
            _ => None,
        }
    }

    /// Merge another stack into this one: appending keys extend, replacing
    /// keys overwrite.
    pub fn merge(&mut self, other: &Stack) {
        for (key, data) in &other.map {
            if !key.is_appending() || !self.has(*key) {
                self.map.insert(*key, data.clone());
                continue;
            }
            match (self.map.get_mut(key), data) {
                (Some(ClauseData::Texts(mine)), ClauseData::Texts(theirs)) => {
                    mine.extend(theirs.iter().cloned());
                }
                (Some(ClauseData::Wheres(mine)), ClauseData::Wheres(theirs)) => {
                    mine.extend(theirs.iter().cloned());
                }
                (Some(ClauseData::Joins(mine)), ClauseData::Joins(theirs)) => {
                    mine.extend(theirs.iter().cloned());
                }
                (Some(ClauseData::Unions(mine)), ClauseData::Unions(theirs)) => {
                    mine.extend(theirs.iter().cloned());
                }
                (Some(ClauseData::Withs(mine)), ClauseData::Withs(theirs)) => {
                    mine.extend(theirs.iter().cloned());
                }
                _ => {
                    self.map.insert(*key, data.clone());
                }
            }
        }
    }
}
