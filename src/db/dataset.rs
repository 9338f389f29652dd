//! Dataset script handling.
//!
//! The practice dataset is a plain SQL script (schema plus seed rows). It is
//! split into statements once and replayed into every fresh database.

use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnection;
use tracing::{debug, warn};

use super::skip_leading_comments;
use crate::error::{PracticeError, Result};

/// The dataset bundled with the binary.
const BUNDLED_DATASET: &str = include_str!("../../data/dataset.sql");

/// Length of the statement preview written to the log on failure.
const PREVIEW_CHARS: usize = 100;

/// An ordered, immutable list of SQL statements that seed a practice database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetScript {
    statements: Arc<[String]>,
}

impl DatasetScript {
    /// Parses a SQL script into its statements.
    ///
    /// Empty fragments and fragments made only of `--` comments are dropped.
    pub fn parse(sql: &str) -> Self {
        let statements: Vec<String> = split_statements(sql)
            .into_iter()
            .filter(|stmt| !is_comment_only(stmt))
            .collect();

        Self {
            statements: statements.into(),
        }
    }

    /// Returns the dataset compiled into the binary.
    pub fn bundled() -> Self {
        Self::parse(BUNDLED_DATASET)
    }

    /// Reads and parses a dataset script from disk.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PracticeError::dataset(format!(
                "Failed to read dataset script {}: {e}",
                path.display()
            ))
        })?;
        Ok(Self::parse(&content))
    }

    /// The statements in source order.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Number of statements in the script.
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Returns true if the script contains no statements.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Replays every statement into `conn` in order.
    ///
    /// A failing statement is logged and skipped; the remaining statements
    /// still run. Returns the number of statements that failed.
    pub async fn apply(&self, conn: &mut SqliteConnection) -> usize {
        let mut failures = 0;

        for statement in self.statements.iter() {
            if let Err(e) = sqlx::query(statement).execute(&mut *conn).await {
                failures += 1;
                warn!(
                    "Error executing dataset statement: {e}. Statement: {}...",
                    preview(statement)
                );
            }
        }

        debug!(
            "Loaded dataset: {} statements, {} failed",
            self.statements.len(),
            failures
        );
        failures
    }
}

impl Default for DatasetScript {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Splits a script on `;`, ignoring terminators inside quotes and comments.
///
/// Fragments are trimmed and empty fragments are dropped.
fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                current.push(c);
                // A doubled quote is an escaped quote; the loop handles it by
                // closing and immediately reopening the literal.
                for inner in chars.by_ref() {
                    current.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                current.push(c);
                for inner in chars.by_ref() {
                    current.push(inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                current.push(c);
                if let Some(star) = chars.next() {
                    current.push(star);
                }
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    current.push(inner);
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            ';' => {
                push_trimmed(&mut statements, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_trimmed(&mut statements, &current);

    statements
}

fn push_trimmed(statements: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// True when the fragment holds nothing but comments.
fn is_comment_only(fragment: &str) -> bool {
    skip_leading_comments(fragment).is_empty()
}

fn preview(statement: &str) -> String {
    statement.chars().take(PREVIEW_CHARS).collect()
}
