//! Routing decisions.

use crate::actor::id::ActorId;
use crate::core::error::DomainError;
use crate::routing::action::{ActionCall, RouteName};
use serde::{Deserialize, Serialize};

/// One routing choice made by the decision oracle.
///
/// `Final` is never produced from an [`ActionCall`]: it is what the
/// coordinator records when the oracle answers in free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RoutingDecision {
    AskWorker { worker: ActorId, question: String },
    AskAllWorkers { question: String },
    AskExternal { question: String },
    Final { answer: String },
}

impl RoutingDecision {
    pub fn kind(&self) -> &'static str {
        match self {
            RoutingDecision::AskWorker { .. } => "ask_worker",
            RoutingDecision::AskAllWorkers { .. } => "ask_all_workers",
            RoutingDecision::AskExternal { .. } => "ask_user",
            RoutingDecision::Final { .. } => "final",
        }
    }
}

impl TryFrom<&ActionCall> for RoutingDecision {
    type Error = DomainError;

    /// Validate an action call. Required arguments are never defaulted.
    fn try_from(call: &ActionCall) -> Result<Self, Self::Error> {
        let route: RouteName = call.name.parse()?;
        let question = call.require_string("question")?.to_string();

        match route {
            RouteName::AskWorker => {
                let worker = call
                    .require_string("worker_name")?
                    .parse::<ActorId>()
                    .map_err(|_| DomainError::InvalidArgument {
                        action: call.name.clone(),
                        argument: "worker_name".to_string(),
                    })?;
                Ok(RoutingDecision::AskWorker { worker, question })
            }
            RouteName::AskAllWorkers => Ok(RoutingDecision::AskAllWorkers { question }),
            RouteName::AskExternal => Ok(RoutingDecision::AskExternal { question }),
        }
    }
}
