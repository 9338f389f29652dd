//! Database layer for the practice server.
//!
//! Provides a trait-based interface for executing statements against a
//! freshly seeded database, so the request orchestrator can be exercised
//! against mock engines in tests.

mod dataset;
mod mock;
mod sqlite;
mod types;

pub use dataset::DatasetScript;
pub use mock::{FailingEngine, MockEngine};
pub use sqlite::SqliteSandbox;
pub use types::{cmp_int_float, Incomparable, QueryResult, ResultSet, Row, Value};

use async_trait::async_trait;

/// Trait defining the interface for query engines.
///
/// Implementations never return errors: every failure is converted into a
/// [`QueryResult::Failed`] carrying a display-ready message.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Executes one SQL statement and returns its normalized result.
    async fn execute(&self, sql: &str) -> QueryResult;
}

/// Returns the first keyword of a statement, upper-cased, skipping leading
/// whitespace and comments.
pub fn leading_keyword(sql: &str) -> String {
    skip_leading_comments(sql)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase()
}

/// Strips leading whitespace and `--` / `/* */` comments.
pub(crate) fn skip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map_or("", |(_, tail)| tail).trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map_or("", |(_, tail)| tail).trim_start();
        } else {
            return rest;
        }
    }
}

/// True when the statement is a read query whose rows should be fetched.
pub fn is_read_statement(sql: &str) -> bool {
    matches!(leading_keyword(sql).as_str(), "SELECT" | "WITH")
}
