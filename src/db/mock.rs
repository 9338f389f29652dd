//! Mock query engines for testing.
//!
//! Provide canned results so the request orchestrator can be tested without
//! seeding a real database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{QueryEngine, QueryResult};

/// A mock engine that returns predefined results keyed by SQL text.
///
/// Unknown statements yield an empty affected-row result. Every executed
/// statement is recorded so tests can assert on what ran.
#[derive(Default)]
pub struct MockEngine {
    results: HashMap<String, QueryResult>,
    executed: Mutex<Vec<String>>,
}

impl MockEngine {
    /// Creates a new mock engine with no canned results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the result returned for `sql` (matched after trimming).
    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results.insert(sql.trim().to_string(), result);
        self
    }

    /// Returns the statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueryEngine for MockEngine {
    async fn execute(&self, sql: &str) -> QueryResult {
        let key = sql.trim().to_string();
        if let Ok(mut log) = self.executed.lock() {
            log.push(key.clone());
        }

        self.results
            .get(&key)
            .cloned()
            .unwrap_or(QueryResult::Affected { rows_affected: 0 })
    }
}

/// An engine on which every statement fails with the same message.
pub struct FailingEngine {
    message: String,
}

impl FailingEngine {
    /// Creates a failing engine reporting `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl QueryEngine for FailingEngine {
    async fn execute(&self, _sql: &str) -> QueryResult {
        QueryResult::failed(format!("SQL Error: {}", self.message))
    }
}
