//! SQLite sandbox implementation.
//!
//! Provides the `SqliteSandbox` struct that implements the `QueryEngine`
//! trait. Every execution opens a private in-memory database, replays the
//! dataset script into it and drops it afterwards, so no state is shared
//! between requests.

use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as _, ConnectOptions, Executor, Row as _, Statement, TypeInfo, ValueRef};
use tracing::debug;

use crate::db::{is_read_statement, DatasetScript, QueryEngine, QueryResult, ResultSet, Row, Value};
use crate::error::{PracticeError, Result};

/// Default query timeout in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of rows a read query may return.
pub const DEFAULT_MAX_ROWS: usize = 10_000;

/// Executes statements against throwaway copies of the practice dataset.
#[derive(Debug, Clone)]
pub struct SqliteSandbox {
    dataset: DatasetScript,
    query_timeout: Duration,
    max_rows: usize,
}

impl SqliteSandbox {
    /// Creates a sandbox seeded from the given dataset.
    pub fn new(dataset: DatasetScript) -> Self {
        Self {
            dataset,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            max_rows: DEFAULT_MAX_ROWS,
        }
    }

    /// Sets the per-query timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Sets the maximum number of rows a read query may return.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Returns the dataset this sandbox seeds from.
    pub fn dataset(&self) -> &DatasetScript {
        &self.dataset
    }

    /// Opens a new private in-memory database and seeds it.
    ///
    /// Each call parses a fresh `sqlite::memory:` URL, which sqlx maps to a
    /// uniquely named in-memory database, so two connections never meet.
    pub async fn open(&self) -> Result<SqliteConnection> {
        let mut conn = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| PracticeError::query(format_query_error(e)))?
            .connect()
            .await
            .map_err(|e| PracticeError::query(format_query_error(e)))?;

        self.dataset.apply(&mut conn).await;
        Ok(conn)
    }

    /// Runs one statement on a freshly seeded database.
    async fn run(&self, sql: &str) -> Result<QueryResult> {
        let mut conn = self.open().await?;

        if is_read_statement(sql) {
            self.fetch_rows(&mut conn, sql).await.map(QueryResult::Rows)
        } else {
            let done = conn
                .execute(sql)
                .await
                .map_err(|e| PracticeError::query(format_query_error(e)))?;
            Ok(QueryResult::Affected {
                rows_affected: done.rows_affected(),
            })
        }
    }

    /// Fetches every row of a read query together with its column names.
    async fn fetch_rows(&self, conn: &mut SqliteConnection, sql: &str) -> Result<ResultSet> {
        // Column names come from the prepared statement so that empty
        // results still report their shape.
        let columns: Vec<String> = {
            let statement = (&mut *conn)
                .prepare(sql)
                .await
                .map_err(|e| PracticeError::query(format_query_error(e)))?;
            unique_column_names(statement.columns().iter().map(|c| c.name().to_string()))
        };

        let mut rows = Vec::new();
        let mut stream = sqlx::query(sql).fetch(&mut *conn);
        while let Some(row) = stream
            .try_next()
            .await
            .map_err(|e| PracticeError::query(format_query_error(e)))?
        {
            if rows.len() >= self.max_rows {
                return Err(PracticeError::query(format!(
                    "Query returned more than {} rows",
                    self.max_rows
                )));
            }
            rows.push(convert_row(&row, &columns));
        }

        Ok(ResultSet::new(columns, rows))
    }
}

#[async_trait]
impl QueryEngine for SqliteSandbox {
    async fn execute(&self, sql: &str) -> QueryResult {
        let start = Instant::now();
        debug!("Executing query: {sql}");

        let result = match tokio::time::timeout(self.query_timeout, self.run(sql)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => QueryResult::failed(format!("SQL Error: {}", query_error_message(e))),
            Err(_) => QueryResult::failed(format!(
                "SQL Error: Query timed out after {} seconds",
                self.query_timeout.as_secs()
            )),
        };

        debug!(
            "Query finished in {:?} (success: {}, rows: {:?})",
            start.elapsed(),
            result.is_success(),
            result.row_count()
        );
        result
    }
}

/// Extracts the bare message from a query error.
fn query_error_message(error: PracticeError) -> String {
    match error {
        PracticeError::Query(msg) => msg,
        other => other.to_string(),
    }
}

/// Formats a sqlx error, preferring the database's own message.
fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}

/// Disambiguates repeated column names with a `:N` suffix.
///
/// `SELECT a.id, b.id` yields `["id", "id:1"]`, keeping one row key per
/// column.
fn unique_column_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();

    for name in names {
        let mut candidate = name.clone();
        let mut suffix = 1;
        while unique.contains(&candidate) {
            candidate = format!("{name}:{suffix}");
            suffix += 1;
        }
        unique.push(candidate);
    }

    unique
}

/// Converts a SqliteRow to our Row type, keyed by the given column names.
fn convert_row(row: &SqliteRow, columns: &[String]) -> Row {
    columns
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), convert_value(row, i)))
        .collect()
}

/// Converts a single cell to our Value type using its runtime storage class.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match type_name.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => row
            .try_get::<Option<i64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" | "FLOAT" | "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .ok()
            .flatten()
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .ok()
            .flatten()
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        // Everything else (TEXT, DATE, DATETIME, ...) is read as a string
        _ => row
            .try_get::<Option<String>, _>(index)
            .ok()
            .flatten()
            .map(Value::Text)
            .unwrap_or(Value::Null),
    }
}
