//! SQL Practice - run SQL against a small dataset and check it against
//! reference answers.
//!
//! This library exposes the core modules for use in integration tests.

pub mod cli;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod practice;
pub mod questions;
pub mod safety;
pub mod server;
