//! Council actors.
//!
//! - [`coordinator::CoordinatorActor`] - routing decision loop and round aggregation
//! - [`worker::WorkerActor`] - answers questions from its private history

pub mod coordinator;
pub mod worker;

use crate::error::CouncilError;
use crate::ports::decision_oracle::{DecisionOracle, OracleReply};
use council_domain::{ActionDefinition, Message};
use tokio_util::sync::CancellationToken;

/// Consult the oracle, racing the call against `cancellation`.
///
/// Callers must not hold any store guard here. Whether or not the adapter
/// honours the token itself, a cancelled run returns
/// [`CouncilError::Cancelled`] as soon as the token fires.
pub(crate) async fn consult<O: DecisionOracle + ?Sized>(
    oracle: &O,
    system_instruction: &str,
    history: &[Message],
    actions: Option<&[ActionDefinition]>,
    cancellation: &CancellationToken,
) -> Result<OracleReply, CouncilError> {
    if cancellation.is_cancelled() {
        return Err(CouncilError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancellation.cancelled() => Err(CouncilError::Cancelled),
        reply = oracle.decide(system_instruction, history, actions, cancellation) => {
            reply.map_err(CouncilError::from)
        }
    }
}
