//! Actor identities and well-known topic names.

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Key used for the single instance of every registered actor type.
pub const DEFAULT_KEY: &str = "default";

/// Actor type of the coordinator.
pub const COORDINATOR_TYPE: &str = "coordinator";

/// Source recorded on messages typed by the human operator.
pub const USER_SOURCE: &str = "user";

/// Topic the initial task is published on. The coordinator subscribes to it.
pub const TASK_TOPIC: &str = "task";

/// Topic broadcast questions are published on. Every worker subscribes to it.
pub const WORKER_TOPIC: &str = "worker.question";

/// Topic round replies are published on. The coordinator subscribes to it.
pub const RESPONSE_TOPIC: &str = "worker.response";

/// Actor type name of the `index`-th worker (`Worker_0`, `Worker_1`, ...).
pub fn worker_type_name(index: usize) -> String {
    format!("Worker_{}", index)
}

/// Identity of one actor instance: its registered type plus an instance key.
///
/// Rendered as `type/key`; the default key is omitted, so the single
/// worker instance of type `Worker_0` displays as `Worker_0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId {
    actor_type: String,
    key: String,
}

impl ActorId {
    pub fn new(actor_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            actor_type: actor_type.into(),
            key: key.into(),
        }
    }

    /// The default instance of `actor_type`.
    pub fn of_type(actor_type: impl Into<String>) -> Self {
        Self::new(actor_type, DEFAULT_KEY)
    }

    pub fn coordinator() -> Self {
        Self::of_type(COORDINATOR_TYPE)
    }

    /// Pseudo-identity of the human operator. Never registered with a router.
    pub fn user() -> Self {
        Self::of_type(USER_SOURCE)
    }

    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key == DEFAULT_KEY {
            write!(f, "{}", self.actor_type)
        } else {
            write!(f, "{}/{}", self.actor_type, self.key)
        }
    }
}

impl FromStr for ActorId {
    type Err = DomainError;

    /// Parses `type` or `type/key`. Surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (actor_type, key) = match trimmed.split_once('/') {
            Some((actor_type, key)) => (actor_type, key),
            None => (trimmed, DEFAULT_KEY),
        };
        if actor_type.is_empty() || key.is_empty() || key.contains('/') {
            return Err(DomainError::InvalidActorId(s.to_string()));
        }
        Ok(Self::new(actor_type, key))
    }
}
