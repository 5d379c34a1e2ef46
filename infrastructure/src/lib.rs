//! Infrastructure layer for feature-council
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod oracle;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileOracleConfig, LogLevel, OracleProvider,
};
pub use logging::JsonlConversationLogger;
pub use oracle::{JsonSchemaActionConverter, OllamaDecisionOracle, create_decision_oracle};
