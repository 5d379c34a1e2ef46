//! Domain error types

use thiserror::Error;

/// Domain-level errors
///
/// Raised while interpreting data that came from outside the domain
/// (action calls chosen by the decision oracle, actor identities typed
/// by an operator). They never describe transport or runtime failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Unknown routing action: {0}")]
    UnknownAction(String),

    #[error("Action '{action}' is missing required argument '{argument}'")]
    MissingArgument { action: String, argument: String },

    #[error("Action '{action}' has an invalid value for argument '{argument}'")]
    InvalidArgument { action: String, argument: String },

    #[error("Invalid actor id: {0}")]
    InvalidActorId(String),
}

impl DomainError {
    /// Whether the error comes from an action name outside the catalogue
    pub fn is_unknown_action(&self) -> bool {
        matches!(self, DomainError::UnknownAction(_))
    }
}
