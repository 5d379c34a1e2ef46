//! Conversation domain entities

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in a conversation (Entity)
///
/// Messages are immutable once created: the fields are private and there
/// are no setters. `source` is the key of the actor (or `user`) that
/// produced the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: String,
    source: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            source: source.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, "system")
    }

    pub fn user(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(Role::User, content, source)
    }

    pub fn assistant(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, source)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}
