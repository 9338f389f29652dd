//! Command-line argument parsing.
//!
//! Flags take precedence over the environment, which takes precedence over
//! the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::error::Result;
use crate::safety::GuardMode;

/// A browser-based SQL practice server.
#[derive(Parser, Debug)]
#[command(name = "sql-practice")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Interface to listen on
    #[arg(short = 'H', long, env = "SQL_PRACTICE_HOST", value_name = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short = 'p', long, env = "SQL_PRACTICE_PORT", value_name = "PORT")]
    pub port: Option<u16>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// SQL script used to seed the practice database
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<PathBuf>,

    /// TOML file with practice questions
    #[arg(long, value_name = "PATH")]
    pub questions: Option<PathBuf>,

    /// Statement guard: parser or keywords
    #[arg(long, value_name = "MODE")]
    pub guard: Option<GuardMode>,

    /// Per-query time limit in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Loads the config file, then applies the environment and these flags.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load_from_file(&self.config_path())?;
        config.apply_env()?;
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overrides config values with the flags that were given.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dataset) = &self.dataset {
            config.practice.dataset = Some(dataset.clone());
        }
        if let Some(questions) = &self.questions {
            config.practice.questions = Some(questions.clone());
        }
        if let Some(guard) = self.guard {
            config.practice.guard = guard;
        }
        if let Some(timeout) = self.timeout {
            config.practice.query_timeout_secs = timeout;
        }
    }
}
