//! Broadcast round bookkeeping.
//!
//! A round is open from the moment the coordinator broadcasts a question
//! until one reply from every expected worker has been collected. Replies
//! are keyed by their source, so arrival order never matters and a second
//! reply from the same worker never counts twice.

use crate::actor::id::ActorId;
use crate::conversation::entities::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sequence number of a broadcast round within one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(u64);

impl RoundId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for RoundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How far a round has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundProgress {
    pub received: usize,
    pub expected: usize,
}

impl RoundProgress {
    pub fn is_complete(&self) -> bool {
        self.received >= self.expected
    }
}

/// An open broadcast round and the workers expected to answer it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    id: RoundId,
    expected: BTreeSet<String>,
}

impl Round {
    pub fn new(id: RoundId, expected: impl IntoIterator<Item = ActorId>) -> Self {
        Self {
            id,
            expected: expected.into_iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn expected_count(&self) -> usize {
        self.expected.len()
    }

    /// Whether a reply from `source` belongs to this round's respondents
    pub fn expects(&self, source: &str) -> bool {
        self.expected.contains(source)
    }

    /// Count distinct expected respondents present in `replies`.
    pub fn progress(&self, replies: &[Message]) -> RoundProgress {
        let answered: BTreeSet<&str> = replies
            .iter()
            .map(|m| m.source())
            .filter(|source| self.expects(source))
            .collect();
        RoundProgress {
            received: answered.len(),
            expected: self.expected.len(),
        }
    }

    pub fn is_complete(&self, replies: &[Message]) -> bool {
        self.progress(replies).is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workers(n: usize) -> Vec<ActorId> {
        (0..n)
            .map(|i| ActorId::of_type(crate::actor::id::worker_type_name(i)))
            .collect()
    }

    fn reply(from: usize) -> Message {
        Message::assistant("ok", crate::actor::id::worker_type_name(from))
    }

    #[test]
    fn test_complete_only_after_every_worker_replied() {
        for n in 1..=6 {
            let round = Round::new(RoundId::new(1), workers(n));
            // Reverse arrival order: completion must not depend on position.
            let mut replies = Vec::new();
            for i in (0..n).rev() {
                assert!(!round.is_complete(&replies), "complete too early for n={n}");
                replies.push(reply(i));
            }
            assert!(round.is_complete(&replies));
            assert_eq!(round.progress(&replies).received, n);
        }
    }

    #[test]
    fn test_duplicate_reply_counts_once() {
        let round = Round::new(RoundId::new(1), workers(2));
        let replies = vec![reply(0), reply(0)];
        assert_eq!(
            round.progress(&replies),
            RoundProgress {
                received: 1,
                expected: 2
            }
        );
        assert!(!round.is_complete(&replies));
    }

    #[test]
    fn test_unexpected_source_ignored() {
        let round = Round::new(RoundId::new(1), workers(1));
        let replies = vec![Message::assistant("hi", "stranger")];
        assert!(!round.is_complete(&replies));
    }

    #[test]
    fn test_round_id_next() {
        let first = RoundId::new(1);
        assert_eq!(first.next(), RoundId::new(2));
        assert_eq!(first.to_string(), "#1");
    }
}
