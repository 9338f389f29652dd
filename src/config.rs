//! Configuration management for the practice server.
//!
//! Handles loading configuration from a TOML file and the environment. CLI
//! overrides are applied on top by [`crate::cli::Cli::resolve_config`].

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PracticeError, Result};
use crate::safety::GuardMode;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Listen address.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dataset, questions and query handling.
    #[serde(default)]
    pub practice: PracticeConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5003
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// Resolves the listen address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| {
                PracticeError::config(format!(
                    "Invalid listen address {}:{}: {e}",
                    self.host, self.port
                ))
            })?
            .next()
            .ok_or_else(|| {
                PracticeError::config(format!(
                    "Listen address {}:{} did not resolve",
                    self.host, self.port
                ))
            })
    }
}

/// Practice settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PracticeConfig {
    /// SQL script to seed every database with. The bundled dataset when unset.
    #[serde(default)]
    pub dataset: Option<PathBuf>,

    /// TOML question file. The built-in questions when unset.
    #[serde(default)]
    pub questions: Option<PathBuf>,

    /// How user statements are screened.
    #[serde(default)]
    pub guard: GuardMode,

    /// Per-query time limit.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_query_timeout_secs() -> u64 {
    10
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            questions: None,
            guard: GuardMode::default(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sql-practice")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| PracticeError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            PracticeError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies the `PORT` environment variable used by hosting platforms.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_port_var(std::env::var("PORT").ok().as_deref())
    }

    fn apply_port_var(&mut self, value: Option<&str>) -> Result<()> {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.server.port = value
                .parse()
                .map_err(|_| PracticeError::config(format!("Invalid PORT value '{value}'")))?;
        }
        Ok(())
    }

    /// Checks values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.practice.query_timeout_secs == 0 {
            return Err(PracticeError::config(
                "query_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}
