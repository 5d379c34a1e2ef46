//! Errors raised while coordinating a council run.

use crate::ports::decision_oracle::OracleError;
use crate::ports::human_escalation::HumanEscalationError;
use council_domain::{ActorId, DomainError};
use thiserror::Error;

/// Errors that abort the current task's coordination loop
///
/// The conversation store and the topic router never produce these for
/// normal operation: empty logs and topics without subscribers are valid
/// states. They originate when the coordinator interprets a decision and
/// when the router resolves an actor identity.
#[derive(Error, Debug)]
pub enum CouncilError {
    /// The oracle was offered the routing actions and chose none, chose an
    /// action outside the catalogue, or answered a worker with actions.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// A known action was chosen with missing or unusable arguments.
    #[error("Malformed routing action: {0}")]
    MalformedAction(DomainError),

    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("Not implemented: {0}")]
    UnimplementedPath(String),

    #[error("Decision oracle failed: {0}")]
    TransportFailure(#[from] OracleError),

    #[error("Human escalation failed: {0}")]
    EscalationFailed(String),

    #[error("No workers configured")]
    NoWorkers,

    #[error("Actor {0} panicked while handling a message")]
    ActorPanicked(ActorId),

    #[error("Run went idle without a final answer")]
    NoFinalAnswer,

    #[error("Operation cancelled")]
    Cancelled,
}

impl CouncilError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            CouncilError::Cancelled | CouncilError::TransportFailure(OracleError::Cancelled)
        )
    }
}

impl From<DomainError> for CouncilError {
    fn from(error: DomainError) -> Self {
        if error.is_unknown_action() {
            CouncilError::ProtocolViolation(error.to_string())
        } else {
            CouncilError::MalformedAction(error)
        }
    }
}

impl From<HumanEscalationError> for CouncilError {
    fn from(error: HumanEscalationError) -> Self {
        match error {
            HumanEscalationError::Unimplemented => {
                CouncilError::UnimplementedPath("escalation to the human user".to_string())
            }
            HumanEscalationError::Cancelled => CouncilError::Cancelled,
            HumanEscalationError::Io(msg) => CouncilError::EscalationFailed(msg),
        }
    }
}
