//! Integration tests for the SQL practice server.
//!
//! Every test seeds its own in-memory SQLite database; no external services
//! are needed.

pub mod http_test;
pub mod practice_test;
pub mod sandbox_test;
