//! Domain layer for feature-council
//!
//! This crate contains the pure data of the council: conversation messages,
//! actor identities and envelopes, routing decisions and round bookkeeping.
//! It has no async runtime, no I/O and no knowledge of any model provider.
//!
//! # Core Concepts
//!
//! ## Coordinator and Workers
//!
//! One coordinator receives a task and decides, turn by turn, whether to
//! question a single worker, broadcast to every worker, or escalate to a
//! human. Workers answer whatever they are asked using their own private
//! history.
//!
//! ## Rounds
//!
//! A broadcast opens a [`Round`]. The round is complete once every expected
//! worker has replied exactly once, regardless of arrival order.

pub mod actor;
pub mod conversation;
pub mod core;
pub mod prompt;
pub mod routing;

// Re-export commonly used types
pub use actor::{
    envelope::{Envelope, EnvelopeKind, Exchange},
    id::{
        ActorId, COORDINATOR_TYPE, DEFAULT_KEY, RESPONSE_TOPIC, TASK_TOPIC, USER_SOURCE,
        WORKER_TOPIC, worker_type_name,
    },
};
pub use conversation::entities::{Message, Role};
pub use core::{error::DomainError, string::preview};
pub use prompt::PromptTemplate;
pub use routing::{
    action::{ActionCall, ActionCatalogue, ActionDefinition, ActionParameter, RouteName},
    decision::RoutingDecision,
    round::{Round, RoundId, RoundProgress},
};
