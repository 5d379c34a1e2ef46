//! Test doubles shared by the application tests.

use crate::error::CouncilError;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::decision_oracle::{DecisionOracle, OracleError, OracleReply};
use crate::router::{Actor, ActorContext};
use crate::store::ConversationStore;
use async_trait::async_trait;
use council_domain::{ActionCall, ActionDefinition, ActorId, Envelope, Message};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One oracle invocation as seen by [`ScriptedOracle`]
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub system: String,
    pub history: Vec<Message>,
    pub offered_actions: bool,
    /// Round log length at the time of a coordinator call, when a store is observed
    pub round_log_len: Option<usize>,
}

enum Step {
    Reply(OracleReply),
    Hang,
}

/// Oracle double.
///
/// Calls that offer actions (the coordinator) consume the script in order;
/// calls without actions (workers) get the next queued worker answer, or
/// `"ok"` once the queue is empty.
pub(crate) struct ScriptedOracle {
    script: Mutex<VecDeque<Step>>,
    worker_answers: Mutex<VecDeque<String>>,
    worker_actions: bool,
    hang_workers: bool,
    failing_question: Option<(String, Duration)>,
    observed_store: Option<Arc<ConversationStore>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<OracleReply>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Step::Reply).collect()),
            worker_answers: Mutex::new(VecDeque::new()),
            worker_actions: false,
            hang_workers: false,
            failing_question: None,
            observed_store: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_worker_answers<const N: usize>(self, answers: [&str; N]) -> Self {
        *self.worker_answers.lock().unwrap() = answers.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Workers receive an action call instead of text.
    pub fn with_worker_actions(mut self) -> Self {
        self.worker_actions = true;
        self
    }

    /// Worker calls never finish until cancelled.
    pub fn with_hanging_workers(mut self) -> Self {
        self.hang_workers = true;
        self
    }

    /// A worker asked `question` times out after `delay`.
    pub fn with_failing_question(mut self, question: &str, delay: Duration) -> Self {
        self.failing_question = Some((question.to_string(), delay));
        self
    }

    /// After the scripted replies, coordinator calls never finish until cancelled.
    pub fn then_hang(self) -> Self {
        self.script.lock().unwrap().push_back(Step::Hang);
        self
    }

    pub fn observing(mut self, store: Arc<ConversationStore>) -> Self {
        self.observed_store = Some(store);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn coordinator_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.offered_actions)
            .collect()
    }
}

pub(crate) fn text(answer: &str) -> OracleReply {
    OracleReply::FreeText(answer.to_string())
}

pub(crate) fn ask_all(question: &str) -> OracleReply {
    OracleReply::ActionCalls(vec![
        ActionCall::new("ask_all_workers").with_arg("question", question),
    ])
}

pub(crate) fn ask_worker(worker: &str, question: &str) -> OracleReply {
    OracleReply::ActionCalls(vec![
        ActionCall::new("ask_worker")
            .with_arg("worker_name", worker)
            .with_arg("question", question),
    ])
}

#[async_trait]
impl DecisionOracle for ScriptedOracle {
    async fn decide(
        &self,
        system_instruction: &str,
        history: &[Message],
        actions: Option<&[ActionDefinition]>,
        cancellation: &CancellationToken,
    ) -> Result<OracleReply, OracleError> {
        let round_log_len = match (&self.observed_store, actions.is_some()) {
            (Some(store), true) => Some(store.snapshot_round().await.len()),
            _ => None,
        };
        self.calls.lock().unwrap().push(RecordedCall {
            system: system_instruction.to_string(),
            history: history.to_vec(),
            offered_actions: actions.is_some(),
            round_log_len,
        });

        if actions.is_some() {
            let step = self.script.lock().unwrap().pop_front();
            return match step {
                Some(Step::Reply(reply)) => Ok(reply),
                Some(Step::Hang) => {
                    cancellation.cancelled().await;
                    Err(OracleError::Cancelled)
                }
                None => Err(OracleError::RequestFailed("script exhausted".to_string())),
            };
        }

        if let Some((question, delay)) = &self.failing_question
            && history.last().is_some_and(|m| m.content() == question.as_str())
        {
            return tokio::select! {
                _ = cancellation.cancelled() => Err(OracleError::Cancelled),
                _ = tokio::time::sleep(*delay) => Err(OracleError::Timeout),
            };
        }
        if self.hang_workers {
            cancellation.cancelled().await;
            return Err(OracleError::Cancelled);
        }
        if self.worker_actions {
            return Ok(OracleReply::ActionCalls(vec![ActionCall::new("ask_worker")]));
        }
        let answer = self
            .worker_answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "ok".to_string());
        Ok(OracleReply::FreeText(answer))
    }
}

/// Actor that stores every envelope it receives.
pub(crate) struct CollectingActor {
    received: Arc<Mutex<Vec<Envelope>>>,
}

impl CollectingActor {
    pub fn factory() -> (
        impl Fn(&ActorId) -> Box<dyn Actor> + Send + Sync + 'static,
        Arc<Mutex<Vec<Envelope>>>,
    ) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&received);
        let factory = move |_id: &ActorId| -> Box<dyn Actor> {
            Box::new(CollectingActor {
                received: Arc::clone(&shared),
            })
        };
        (factory, received)
    }
}

#[async_trait]
impl Actor for CollectingActor {
    async fn handle(&mut self, envelope: Envelope, _ctx: &ActorContext) -> Result<(), CouncilError> {
        self.received.lock().unwrap().push(envelope);
        Ok(())
    }
}

/// Logger that keeps every event type in memory.
#[derive(Default)]
pub(crate) struct MemoryLogger {
    events: Mutex<Vec<(&'static str, serde_json::Value)>>,
}

impl MemoryLogger {
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

impl ConversationLogger for MemoryLogger {
    fn log(&self, event: ConversationEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.event_type, event.payload));
    }
}
