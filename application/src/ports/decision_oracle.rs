//! Decision oracle port
//!
//! Defines the interface to the external policy (a language model) that
//! picks the coordinator's next routing action and writes the workers'
//! answers.
//!
//! ```text
//! coordinator: decide(routing policy, global log, Some(actions)) → FreeText | ActionCalls
//! worker:      decide(worker role, private log + question, None) → FreeText
//! ```

use async_trait::async_trait;
use council_domain::{ActionCall, ActionDefinition, Message};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that can occur while consulting the decision oracle
#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Cancelled")]
    Cancelled,

    #[error("Unsupported oracle provider: {0}")]
    Unsupported(String),
}

/// What the oracle answered
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    /// Plain text; for the coordinator this is the final answer.
    FreeText(String),
    /// Structured action calls, in the order the oracle listed them.
    /// May be empty when the provider returned an empty selection.
    ActionCalls(Vec<ActionCall>),
}

/// Gateway to the decision oracle
///
/// Implementations live in the infrastructure layer. Every call receives a
/// cancellation token and must abort an in-flight request with
/// [`OracleError::Cancelled`] when it fires.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Ask for a decision.
    ///
    /// * `system_instruction` - fixed role/policy text placed first
    /// * `history` - conversation so far, oldest first
    /// * `actions` - routing actions the oracle may call; `None` means only
    ///   free text is expected
    async fn decide(
        &self,
        system_instruction: &str,
        history: &[Message],
        actions: Option<&[ActionDefinition]>,
        cancellation: &CancellationToken,
    ) -> Result<OracleReply, OracleError>;
}
