//! Human escalation port for the `ask_user` routing action.
//!
//! When the coordinator lacks details to route a task it may escalate a
//! question to the human operator. The call is synchronous from the
//! coordinator's point of view: the decision loop waits for the answer.
//!
//! # Built-in Implementations
//!
//! - [`UnimplementedEscalation`] - Fails immediately with
//!   [`HumanEscalationError::Unimplemented`]
//!
//! No interactive adapter ships yet, so escalating aborts the run loudly
//! instead of silently continuing.

use async_trait::async_trait;
use thiserror::Error;

/// Error type for human escalation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HumanEscalationError {
    /// No adapter can reach a human yet.
    #[error("Escalation to a human is not implemented")]
    Unimplemented,
    /// The operator cancelled the prompt (e.g., via Ctrl+C).
    #[error("Operation cancelled")]
    Cancelled,
    /// Input/output error (e.g., terminal read failure).
    #[error("I/O error: {0}")]
    Io(String),
}

/// Port for asking the human operator a question.
#[async_trait]
pub trait HumanEscalationPort: Send + Sync {
    /// Ask `question` and wait for free-text `answer`.
    async fn ask(&self, question: &str) -> Result<String, HumanEscalationError>;
}

/// Stub escalation: refuses every question.
pub struct UnimplementedEscalation;

#[async_trait]
impl HumanEscalationPort for UnimplementedEscalation {
    async fn ask(&self, _question: &str) -> Result<String, HumanEscalationError> {
        Err(HumanEscalationError::Unimplemented)
    }
}
