//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly; every field has a default so a partial
//! file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("worker_count must be at least 1")]
    NoWorkers,

    #[error("oracle.timeout_seconds cannot be 0")]
    InvalidTimeout,

    #[error("oracle.model cannot be empty")]
    EmptyModelName,

    #[error("oracle.endpoint cannot be empty")]
    EmptyEndpoint,
}

/// Diagnostic verbosity when neither `-v` nor `RUST_LOG` is given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Which service backs the decision oracle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    #[default]
    Ollama,
    /// Recognised in configuration, rejected when the oracle is built
    #[serde(rename = "openai")]
    OpenAi,
}

impl fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleProvider::Ollama => write!(f, "ollama"),
            OracleProvider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Raw oracle configuration from TOML (`[oracle]` section)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    pub provider: OracleProvider,
    /// Base URL of the model server
    pub endpoint: String,
    /// Model name passed to the provider
    pub model: String,
    /// Per-request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for FileOracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::Ollama,
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.1".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl FileOracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Number of workers spawned per run
    pub worker_count: usize,
    pub log_level: LogLevel,
    /// Also write diagnostics to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Write the JSONL transcript of the run to this file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_log: Option<PathBuf>,
    pub oracle: FileOracleConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            log_level: LogLevel::default(),
            log_file: None,
            conversation_log: None,
            oracle: FileOracleConfig::default(),
        }
    }
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.worker_count == 0 {
            return Err(ConfigValidationError::NoWorkers);
        }
        if self.oracle.timeout_seconds == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }
        if self.oracle.model.trim().is_empty() {
            return Err(ConfigValidationError::EmptyModelName);
        }
        if self.oracle.endpoint.trim().is_empty() {
            return Err(ConfigValidationError::EmptyEndpoint);
        }
        Ok(())
    }
}
