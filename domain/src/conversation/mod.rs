//! Conversation domain.
//!
//! - [`entities::Message`] - a single immutable message in a conversation log
//! - [`entities::Role`] - who authored the message from the model's point of view

pub mod entities;
