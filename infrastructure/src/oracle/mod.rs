//! Decision oracle adapters
//!
//! [`create_decision_oracle`] picks the adapter for the configured provider.

mod ollama;
mod schema;

pub use ollama::OllamaDecisionOracle;
pub use schema::JsonSchemaActionConverter;

use crate::config::{FileOracleConfig, OracleProvider};
use council_application::ports::decision_oracle::{DecisionOracle, OracleError};
use std::sync::Arc;
use tracing::info;

/// Build the decision oracle for `config`.
///
/// Only Ollama is implemented; `openai` is recognised but rejected.
pub fn create_decision_oracle(
    config: &FileOracleConfig,
) -> Result<Arc<dyn DecisionOracle>, OracleError> {
    match config.provider {
        OracleProvider::Ollama => {
            info!(
                "Using Ollama at {} with model {}",
                config.endpoint, config.model
            );
            Ok(Arc::new(OllamaDecisionOracle::new(config)?))
        }
        OracleProvider::OpenAi => Err(OracleError::Unsupported(config.provider.to_string())),
    }
}
