//! Entry manager.
//!
//! [`EntryManager`] collects [`Entry`]s and commits their prepared queries
//! inside one transaction, in attach order. Each executed entry gets its
//! state flags set (`okay`, `action`), its data updated from the first
//! returned row, and the result handle stored. Any failure rolls the whole
//! transaction back and surfaces as [`SqlError::Commit`] wrapping the cause.
//!
//! # Example
//!
//! ```ignore
//! let mut manager = EntryManager::new(db.clone());
//!
//! let mut user = manager.new_entry();
//! user.set_query(
//!     Query::new(db.clone())
//!         .table("users")?
//!         .insert([("name", "Kerem")])?
//!         .returning("id")?,
//! );
//! manager.attach(user);
//!
//! let committed = manager.commit().await?;
//! assert!(committed[0].okay());
//! ```

use crate::database::{Database, Fetch, Registry};
use crate::entry::{Action, Entry};
use crate::error::{SqlError, SqlResult};
use crate::result::QueryResult;
use std::sync::Arc;

/// Attach-ordered entry set with a transactional commit loop.
pub struct EntryManager<D: Database> {
    db: Arc<D>,
    entries: Vec<Entry<D>>,
}

impl<D: Database> EntryManager<D> {
    /// Create a manager over an explicit database.
    pub fn new(db: Arc<D>) -> Self {
        Self {
            db,
            entries: Vec::new(),
        }
    }

    /// Create a manager over the registry's default database.
    pub fn from_registry(registry: &Registry<D>) -> SqlResult<Self> {
        Ok(Self::new(registry.get_default()?))
    }

    /// The manager's database.
    pub fn db(&self) -> &Arc<D> {
        &self.db
    }

    /// Create an empty entry bound to the manager's database.
    pub fn new_entry(&self) -> Entry<D> {
        Entry::new(Arc::clone(&self.db))
    }

    /// Attach an entry; returns its position in attach order.
    pub fn attach(&mut self, entry: Entry<D>) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Detach the entry at the given attach position.
    pub fn detach(&mut self, index: usize) -> Option<Entry<D>> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    /// Number of attached entries.
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are attached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attached entries in attach order.
    pub fn entries(&self) -> &[Entry<D>] {
        &self.entries
    }

    /// Execute every attached entry inside one transaction.
    ///
    /// Entries run in attach order. Results are staged and written back to
    /// the entries only once the transaction commits, so a rollback leaves
    /// every entry's data as it was before the call. On success the entries
    /// are returned and the manager is emptied; on any failure the
    /// transaction is rolled back and the error re-raised as
    /// [`SqlError::Commit`].
    pub async fn commit(&mut self) -> SqlResult<Vec<Entry<D>>> {
        if self.entries.is_empty() {
            return Err(SqlError::NoEntriesAttached);
        }

        let db = Arc::clone(&self.db);
        db.begin().await.map_err(wrap)?;

        let mut staged: Vec<(Option<Action>, QueryResult)> =
            Vec::with_capacity(self.entries.len());
        for entry in &mut self.entries {
            let query = entry.take_query();
            let action = query.action();

            match query.run_fetch(Fetch::Array).await {
                Ok(result) => staged.push((action, result)),
                Err(err) => {
                    rollback_quiet(db.as_ref()).await;
                    return Err(wrap(err));
                }
            }
        }

        if let Err(err) = db.commit().await {
            rollback_quiet(db.as_ref()).await;
            return Err(wrap(err));
        }

        for (entry, (action, result)) in self.entries.iter_mut().zip(staged) {
            entry.state_mut().okay = Some(result.count() > 0);
            entry.state_mut().action = action;
            if let Some(first) = result.first() {
                let pairs: Vec<(String, crate::Value)> = first
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect();
                entry.data_mut().update(pairs);
            }
            entry.store_result(result);
        }

        Ok(std::mem::take(&mut self.entries))
    }
}

async fn rollback_quiet<D: Database>(db: &D) {
    if let Err(err) = db.rollback().await {
        tracing::warn!(error = %err, "rollback failed");
    }
}

fn wrap(err: SqlError) -> SqlError {
    SqlError::Commit(Box::new(err))
}
