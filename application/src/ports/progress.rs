//! Progress notification port
//!
//! Defines the interface for reporting progress during a council run.

use council_domain::{ActorId, RoutingDecision};

/// Callback for progress updates during coordination
///
/// Implementations live in the presentation layer. Every method has a
/// no-op default so adapters only override what they display.
pub trait CoordinationProgress: Send + Sync {
    /// Called before the coordinator consults the oracle
    fn on_decision_start(&self, _cycle: usize) {}

    /// Called for each routing decision about to be applied
    fn on_decision(&self, _decision: &RoutingDecision) {}

    /// Called when a broadcast round opens
    fn on_round_start(&self, _expected: usize) {}

    /// Called when a round reply is accepted
    fn on_round_reply(&self, _worker: &ActorId, _received: usize, _expected: usize) {}

    /// Called when the last expected round reply arrives
    fn on_round_complete(&self) {}

    /// Called when a direct worker reply arrives
    fn on_direct_reply(&self, _worker: &ActorId) {}

    /// Called once with the final answer
    fn on_final(&self, _answer: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl CoordinationProgress for NoProgress {}
