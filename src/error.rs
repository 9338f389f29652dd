//! Error types for the SQL practice server.
//!
//! Defines the main error enum used for startup and configuration failures.
//! Request-path failures are reported as structured results instead.

use thiserror::Error;

/// Main error type for SQL practice operations.
#[derive(Error, Debug)]
pub enum PracticeError {
    /// Configuration errors (invalid config file, bad question bank, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset errors (unreadable dataset script, etc.)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Query execution errors (syntax errors, missing tables, timeouts, etc.)
    #[error("Query error: {0}")]
    Query(String),

    /// HTTP server errors (bind failures, invalid listen address, etc.)
    #[error("Server error: {0}")]
    Server(String),
}

impl PracticeError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a dataset error with the given message.
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    /// Creates a query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Creates a server error with the given message.
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Dataset(_) => "Dataset Error",
            Self::Query(_) => "Query Error",
            Self::Server(_) => "Server Error",
        }
    }
}

/// Result type alias using PracticeError.
pub type Result<T> = std::result::Result<T, PracticeError>;
