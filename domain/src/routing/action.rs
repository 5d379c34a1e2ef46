//! Routing action catalogue and action calls.
//!
//! The coordinator offers the decision oracle a fixed set of actions. The
//! oracle answers with zero or more [`ActionCall`]s naming one of them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::core::error::DomainError;

/// Names of the routing actions understood by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteName {
    /// Ask one named worker
    AskWorker,
    /// Broadcast to every worker and collect a full round of replies
    AskAllWorkers,
    /// Escalate to the human operator
    #[serde(rename = "ask_user")]
    AskExternal,
}

impl RouteName {
    pub const ALL: [RouteName; 3] = [
        RouteName::AskWorker,
        RouteName::AskAllWorkers,
        RouteName::AskExternal,
    ];

    /// Wire name presented to the oracle
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::AskWorker => "ask_worker",
            RouteName::AskAllWorkers => "ask_all_workers",
            RouteName::AskExternal => "ask_user",
        }
    }

    /// Variant spelling, accepted as an alias of the wire name
    pub fn variant_name(&self) -> &'static str {
        match self {
            RouteName::AskWorker => "AskWorker",
            RouteName::AskAllWorkers => "AskAllWorkers",
            RouteName::AskExternal => "AskExternal",
        }
    }
}

impl std::fmt::Display for RouteName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteName::ALL
            .into_iter()
            .find(|route| route.as_str() == s || route.variant_name() == s)
            .ok_or_else(|| DomainError::UnknownAction(s.to_string()))
    }
}

/// Parameter specification for a routing action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
}

impl ActionParameter {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Definition of a routing action offered to the oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub route: RouteName,
    /// Human-readable description shown to the oracle
    pub description: String,
    pub parameters: Vec<ActionParameter>,
}

impl ActionDefinition {
    pub fn new(route: RouteName, description: impl Into<String>) -> Self {
        Self {
            route,
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ActionParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn name(&self) -> &'static str {
        self.route.as_str()
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ActionParameter> {
        self.parameters.iter().filter(|p| p.required)
    }
}

/// The set of routing actions offered to the oracle, in a stable order
#[derive(Debug, Clone)]
pub struct ActionCatalogue {
    actions: Vec<ActionDefinition>,
}

impl ActionCatalogue {
    /// The coordinator's routing actions
    pub fn routing() -> Self {
        Self {
            actions: vec![
                ActionDefinition::new(
                    RouteName::AskWorker,
                    "Sends a message to the specific worker.",
                )
                .with_parameter(ActionParameter::required(
                    "worker_name",
                    "A worker name that will receive this message",
                ))
                .with_parameter(ActionParameter::required(
                    "question",
                    "A string text, containing the question for the worker.",
                )),
                ActionDefinition::new(
                    RouteName::AskAllWorkers,
                    "Send a message to all workers. Every worker will receive a question, \
                     their responses will be collected before passing back to the manager agent.",
                )
                .with_parameter(ActionParameter::required(
                    "question",
                    "A string containing the question to all workers.",
                )),
                ActionDefinition::new(
                    RouteName::AskExternal,
                    "Send a question to the human user for clarifications. Use it when you \
                     don't have enough details to properly process the user's request.",
                )
                .with_parameter(ActionParameter::required(
                    "question",
                    "A string that the human user will see.",
                )),
            ],
        }
    }

    pub fn all(&self) -> &[ActionDefinition] {
        &self.actions
    }

    pub fn get(&self, route: RouteName) -> Option<&ActionDefinition> {
        self.actions.iter().find(|a| a.route == route)
    }

    /// Resolve a wire name or variant spelling to a catalogued action
    pub fn resolve(&self, name: &str) -> Option<&ActionDefinition> {
        name.parse::<RouteName>().ok().and_then(|route| self.get(route))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().map(|a| a.name())
    }
}

/// A call to a routing action, as chosen by the oracle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    /// Name of the action the oracle selected (not yet validated)
    pub name: String,
    /// Arguments passed to the action
    pub arguments: HashMap<String, serde_json::Value>,
    /// Provider-assigned call ID, when the provider returns one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
}

impl ActionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: HashMap::new(),
            call_id: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_call_id(mut self, id: impl Into<String>) -> Self {
        self.call_id = Some(id.into());
        self
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    /// Get a required, non-blank string argument.
    ///
    /// A missing key is [`DomainError::MissingArgument`]; a value that is not
    /// a string, or is blank, is [`DomainError::InvalidArgument`].
    pub fn require_string(&self, key: &str) -> Result<&str, DomainError> {
        let value = self
            .arguments
            .get(key)
            .ok_or_else(|| DomainError::MissingArgument {
                action: self.name.clone(),
                argument: key.to_string(),
            })?;
        match value.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(DomainError::InvalidArgument {
                action: self.name.clone(),
                argument: key.to_string(),
            }),
        }
    }
}
