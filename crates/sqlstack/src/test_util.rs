//! Mock database for tests: canned results, failure injection, and a
//! statement log.

use crate::database::{Database, QueryOptions};
use crate::entry::EntryData;
use crate::error::{SqlError, SqlResult};
use crate::platform::Platform;
use crate::result::QueryResult;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub(crate) struct MockDb {
    platform: Platform,
    responses: Mutex<VecDeque<SqlResult<QueryResult>>>,
    log: Mutex<Vec<String>>,
}

impl MockDb {
    pub(crate) fn new(dialect: &str) -> Arc<Self> {
        Arc::new(Self {
            platform: Platform::new(dialect).unwrap(),
            responses: Mutex::new(VecDeque::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Queue rows for the next `query` call.
    pub(crate) fn push_rows(&self, rows: Vec<EntryData>) {
        let affected = rows.len() as u64;
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(QueryResult::new(rows, affected)));
    }

    /// Queue a failure for the next `query` call.
    pub(crate) fn push_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(SqlError::database(message)));
    }

    /// Every statement seen, in order.
    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl Database for MockDb {
    fn platform(&self) -> &Platform {
        &self.platform
    }

    async fn query(&self, sql: &str, _options: &QueryOptions) -> SqlResult<QueryResult> {
        self.log.lock().unwrap().push(sql.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::default()))
    }

    async fn execute(&self, sql: &str) -> SqlResult<u64> {
        self.log.lock().unwrap().push(sql.to_string());
        Ok(1)
    }
}
