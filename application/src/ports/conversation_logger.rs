//! Port for the structured council transcript.
//!
//! `tracing` carries human-readable diagnostics; this port records each
//! protocol step (task received, decisions, round traffic, final answer)
//! as a machine-readable event so a run can be replayed afterwards.

use serde_json::Value;

/// One protocol step worth recording.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "routing_decision", "round_complete").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for recording transcript events.
///
/// `log` is synchronous and infallible: a broken transcript sink must never
/// abort a coordination loop.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// Discards every event.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
