//! Actor domain.
//!
//! - [`id::ActorId`] - addressable identity of an actor instance
//! - [`envelope::Envelope`] - the single inbound message type every actor switches on

pub mod envelope;
pub mod id;
