//! Application layer for feature-council
//!
//! This crate contains the port definitions, the shared conversation store,
//! the in-process topic router, the coordinator and worker actors, and the
//! use case that wires them together. It depends only on the domain layer.

pub mod actors;
pub mod error;
pub mod ports;
pub mod router;
pub mod store;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use actors::{
    coordinator::{CoordinationOutcome, CoordinatorActor, CoordinatorPhase},
    worker::WorkerActor,
};
pub use error::CouncilError;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    decision_oracle::{DecisionOracle, OracleError, OracleReply},
    human_escalation::{HumanEscalationError, HumanEscalationPort, UnimplementedEscalation},
    progress::{CoordinationProgress, NoProgress},
};
pub use router::{Actor, ActorContext, ActorType, RouterStats, TopicRouter};
pub use store::ConversationStore;
pub use use_cases::run_council::{RunCouncilInput, RunCouncilOutput, RunCouncilUseCase};
