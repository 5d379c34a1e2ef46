//! Inbound envelopes exchanged between actors.
//!
//! Every actor receives the same [`Envelope`] type and switches explicitly on
//! [`EnvelopeKind`]; there is no type-based handler resolution.
//!
//! ```text
//! user ──Task──▶ coordinator ──Question(Direct)──▶ Worker_k ──Response(Direct)──▶ coordinator
//!                     │
//!                     └──Question(Round r)──▶ worker.question ──▶ every worker
//!                                                    ──Response(Round r)──▶ worker.response ──▶ coordinator
//! ```

use crate::actor::id::ActorId;
use crate::conversation::entities::Message;
use crate::routing::round::RoundId;
use serde::{Deserialize, Serialize};

/// How a question was asked, carried back on the reply so the coordinator
/// can tell a direct answer from a round contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "round", rename_all = "snake_case")]
pub enum Exchange {
    /// Single-target question; the reply goes straight back to the asker.
    Direct,
    /// Broadcast question belonging to the given round.
    Round(RoundId),
}

/// What an envelope carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvelopeKind {
    /// The operator's task. Handled by the coordinator only.
    Task { message: Message },

    /// A question for a worker. `context` seeds the worker's private log the
    /// first time that worker is asked anything.
    Question {
        message: Message,
        context: Vec<Message>,
        exchange: Exchange,
    },

    /// A worker's answer to a question.
    Response { message: Message, exchange: Exchange },
}

impl EnvelopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Task { .. } => "task",
            EnvelopeKind::Question { .. } => "question",
            EnvelopeKind::Response { .. } => "response",
        }
    }
}

/// A message in flight between actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub sender: ActorId,
    pub kind: EnvelopeKind,
}

impl Envelope {
    pub fn task(message: Message) -> Self {
        Self {
            sender: ActorId::user(),
            kind: EnvelopeKind::Task { message },
        }
    }

    pub fn question(
        sender: ActorId,
        message: Message,
        context: Vec<Message>,
        exchange: Exchange,
    ) -> Self {
        Self {
            sender,
            kind: EnvelopeKind::Question {
                message,
                context,
                exchange,
            },
        }
    }

    pub fn response(sender: ActorId, message: Message, exchange: Exchange) -> Self {
        Self {
            sender,
            kind: EnvelopeKind::Response { message, exchange },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_envelope_comes_from_user() {
        let envelope = Envelope::task(Message::user("Add export to CSV", "user"));
        assert_eq!(envelope.sender, ActorId::user());
        assert_eq!(envelope.kind.as_str(), "task");
    }

    #[test]
    fn test_exchange_serialization() {
        let direct = serde_json::to_value(Exchange::Direct).unwrap();
        assert_eq!(direct["type"], "direct");

        let round = serde_json::to_value(Exchange::Round(RoundId::new(3))).unwrap();
        assert_eq!(round["type"], "round");
        assert_eq!(round["round"], 3);
    }
}
