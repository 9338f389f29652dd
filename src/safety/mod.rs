//! Query safety classification and the read-only guard.
//!
//! Parses SQL and classifies statements as safe, mutating, or destructive.
//! The [`QueryGuard`] uses that classification to admit only single read
//! queries from practice users.

mod parser;

pub use parser::SqlClassifier;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::tokenizer::{Token, Tokenizer};
use thiserror::Error;
use tracing::debug;

use crate::db::leading_keyword;

/// Message returned to users whose statement is not allowed to run.
pub const REJECTION_MESSAGE: &str =
    "For security reasons, only SELECT queries are allowed in this demo";

/// Keywords refused by the keyword filter, matched as case-insensitive substrings.
pub const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];

/// Unquoted words that refuse text the parser could not read.
const UNPARSED_REFUSED_WORDS: &[&str] = &[
    "ANALYZE", "ATTACH", "DETACH", "PRAGMA", "REINDEX", "REPLACE", "VACUUM",
];

/// Safety level classification for SQL queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyLevel {
    /// Read-only queries (SELECT, EXPLAIN).
    Safe,
    /// Data modification queries (INSERT, UPDATE).
    Mutating,
    /// Data loss or schema changes (DELETE, DROP, TRUNCATE, ALTER, CREATE, PRAGMA).
    Destructive,
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "Safe"),
            Self::Mutating => write!(f, "Mutating"),
            Self::Destructive => write!(f, "Destructive"),
        }
    }
}

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Explain,
    Pragma,
    Attach,
    /// Multiple statements detected; contains the most dangerous type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Pragma => write!(f, "PRAGMA"),
            Self::Attach => write!(f, "ATTACH"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The determined safety level.
    pub level: SafetyLevel,
    /// The type of statement(s) detected.
    pub statement_type: StatementType,
    /// Optional warning message.
    pub warning: Option<String>,
}

impl ClassificationResult {
    /// Creates a new classification result.
    pub fn new(level: SafetyLevel, statement_type: StatementType) -> Self {
        Self {
            level,
            statement_type,
            warning: None,
        }
    }

    /// Creates a classification result with a warning message.
    pub fn with_warning(
        level: SafetyLevel,
        statement_type: StatementType,
        warning: impl Into<String>,
    ) -> Self {
        Self {
            level,
            statement_type,
            warning: Some(warning.into()),
        }
    }

    /// Returns true for exactly one read-only SELECT statement.
    pub fn is_single_read(&self) -> bool {
        self.level == SafetyLevel::Safe && self.statement_type == StatementType::Select
    }
}

/// How the guard decides whether a statement may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardMode {
    /// Parse the statement and admit a single read query. Text that cannot
    /// be parsed is screened token by token instead.
    #[default]
    Parser,
    /// Refuse any text containing a destructive keyword.
    Keywords,
}

impl GuardMode {
    /// Returns the mode as a string for display and config.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parser => "parser",
            Self::Keywords => "keywords",
        }
    }
}

impl FromStr for GuardMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parser" => Ok(Self::Parser),
            "keywords" | "keyword" => Ok(Self::Keywords),
            _ => Err(format!(
                "Invalid guard mode: {s}. Expected: parser or keywords"
            )),
        }
    }
}

impl fmt::Display for GuardMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A statement refused by the guard.
///
/// Displays the user-facing message; `reason` carries the detail for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("For security reasons, only SELECT queries are allowed in this demo")]
pub struct Rejection {
    pub reason: String,
}

impl Rejection {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Admits read-only statements and refuses everything else.
#[derive(Debug, Default)]
pub struct QueryGuard {
    mode: GuardMode,
    classifier: SqlClassifier,
}

impl QueryGuard {
    /// Creates a guard using the given mode.
    pub fn new(mode: GuardMode) -> Self {
        Self {
            mode,
            classifier: SqlClassifier::new(),
        }
    }

    /// Returns the configured mode.
    pub fn mode(&self) -> GuardMode {
        self.mode
    }

    /// Checks whether `sql` may be executed.
    pub fn check(&self, sql: &str) -> std::result::Result<(), Rejection> {
        match self.mode {
            GuardMode::Keywords => check_keywords(sql),
            GuardMode::Parser => match self.classifier.try_classify(sql) {
                Ok(classification) if classification.is_single_read() => Ok(()),
                Ok(classification) => Err(Rejection::new(rejection_reason(&classification))),
                Err(e) => {
                    // Unparseable text may still be valid SQLite; let the
                    // engine report the real error when it can only be a read.
                    debug!("Guard could not parse query, screening tokens: {e}");
                    check_unparsed(sql)
                }
            },
        }
    }
}

/// Returns the first destructive keyword contained in `sql`, if any.
pub fn find_destructive_keyword(sql: &str) -> Option<&'static str> {
    let upper = sql.to_uppercase();
    DESTRUCTIVE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| upper.contains(keyword))
}

fn check_keywords(sql: &str) -> std::result::Result<(), Rejection> {
    match find_destructive_keyword(sql) {
        Some(keyword) => Err(Rejection::new(format!("contains keyword {keyword}"))),
        None => Ok(()),
    }
}

fn rejection_reason(classification: &ClassificationResult) -> String {
    let reason = format!(
        "{} statement classified as {}",
        classification.statement_type, classification.level
    );
    match &classification.warning {
        Some(warning) => format!("{reason}: {warning}"),
        None => reason,
    }
}

/// Screens text the parser rejected. It must be a single statement that
/// starts as a read and carries no write keyword.
fn check_unparsed(sql: &str) -> std::result::Result<(), Rejection> {
    let tokens = match Tokenizer::new(&SQLiteDialect {}, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => return Err(Rejection::new(format!("could not tokenize query: {e}"))),
    };

    if has_trailing_statement(&tokens) {
        return Err(Rejection::new("unparsed text holds more than one statement"));
    }

    let keyword = leading_keyword(sql);
    if !matches!(keyword.as_str(), "SELECT" | "WITH") {
        return Err(Rejection::new(format!(
            "unparsed statement starts with '{keyword}'"
        )));
    }

    if let Some(word) = find_refused_word(&tokens) {
        return Err(Rejection::new(format!("unparsed statement contains {word}")));
    }

    check_keywords(sql)
}

/// True when anything other than whitespace, comments or `;` follows a `;`.
fn has_trailing_statement(tokens: &[Token]) -> bool {
    tokens
        .iter()
        .skip_while(|token| **token != Token::SemiColon)
        .any(|token| !matches!(token, Token::SemiColon | Token::Whitespace(_) | Token::EOF))
}

fn find_refused_word(tokens: &[Token]) -> Option<&'static str> {
    tokens.iter().find_map(|token| match token {
        Token::Word(word) if word.quote_style.is_none() => {
            let upper = word.value.to_uppercase();
            UNPARSED_REFUSED_WORDS
                .iter()
                .copied()
                .find(|refused| *refused == upper)
        }
        _ => None,
    })
}
