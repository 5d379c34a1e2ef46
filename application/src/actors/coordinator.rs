//! Coordinator actor.
//!
//! Owns the routing decision loop for one task. It is driven only by the
//! envelopes it receives:
//!
//! ```text
//! Idle ──task──▶ AwaitingOracleDecision ──text──▶ Terminated
//!                   │           ▲
//!              action calls     │ direct reply / complete round / human answer
//!                   ▼           │
//!              Dispatching ─────┤
//!                   │           │
//!              ask_all_workers  │
//!                   ▼           │
//!               RoundOpen ──────┘
//! ```
//!
//! Every action of a cycle is interpreted and validated, and every human
//! escalation in it answered, before any of them takes effect. A malformed
//! reply, a failed escalation or a cancellation never leaves a
//! half-dispatched cycle.

use crate::actors::consult;
use crate::error::CouncilError;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::decision_oracle::{DecisionOracle, OracleReply};
use crate::ports::human_escalation::{HumanEscalationPort, UnimplementedEscalation};
use crate::ports::progress::{CoordinationProgress, NoProgress};
use crate::router::{Actor, ActorContext};
use crate::store::ConversationStore;
use async_trait::async_trait;
use council_domain::{
    ActionCall, ActionCatalogue, ActorId, Envelope, EnvelopeKind, Exchange, Message,
    PromptTemplate, Round, RoundId, RoutingDecision, USER_SOURCE, WORKER_TOPIC, preview,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Oracle replies with no action call tolerated per cycle before giving up
const EMPTY_SELECTION_ATTEMPTS: usize = 2;

/// Where the coordinator is in its decision loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoordinatorPhase {
    #[default]
    Idle,
    AwaitingOracleDecision,
    Dispatching,
    RoundOpen,
    Terminated,
}


/// Result of a run, shared between the coordinator and whoever started it
#[derive(Debug, Default)]
pub struct CoordinationOutcome {
    final_answer: OnceLock<String>,
    decision_cycles: AtomicUsize,
    rounds_completed: AtomicUsize,
    phase: Mutex<CoordinatorPhase>,
}

impl CoordinationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn final_answer(&self) -> Option<String> {
        self.final_answer.get().cloned()
    }

    pub fn decision_cycles(&self) -> usize {
        self.decision_cycles.load(Ordering::SeqCst)
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds_completed.load(Ordering::SeqCst)
    }

    /// Phase the coordinator was last in
    pub fn phase(&self) -> CoordinatorPhase {
        match self.phase.lock() {
            Ok(phase) => *phase,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn record_phase(&self, phase: CoordinatorPhase) {
        match self.phase.lock() {
            Ok(mut slot) => *slot = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }
}

/// A validated action of one cycle, escalations already answered
enum Step {
    AskWorker { worker: ActorId, question: String },
    AskAllWorkers { question: String },
    Answered { question: String, answer: String },
    Final { answer: String },
}

enum Applied {
    Dispatched,
    Escalated,
    Finished,
}

pub struct CoordinatorActor<O: DecisionOracle + ?Sized> {
    oracle: Arc<O>,
    store: Arc<ConversationStore>,
    workers: Vec<ActorId>,
    catalogue: ActionCatalogue,
    policy: String,
    escalation: Arc<dyn HumanEscalationPort>,
    progress: Arc<dyn CoordinationProgress>,
    logger: Arc<dyn ConversationLogger>,
    outcome: Arc<CoordinationOutcome>,
    finished: CancellationToken,
    phase: CoordinatorPhase,
    task: Option<Message>,
    open_round: Option<Round>,
    next_round: RoundId,
    pending_direct: HashMap<ActorId, usize>,
}

impl<O: DecisionOracle + ?Sized> CoordinatorActor<O> {
    pub fn new(
        oracle: Arc<O>,
        store: Arc<ConversationStore>,
        workers: Vec<ActorId>,
        outcome: Arc<CoordinationOutcome>,
    ) -> Self {
        let names: Vec<String> = workers.iter().map(ActorId::to_string).collect();
        Self {
            oracle,
            store,
            policy: PromptTemplate::routing_policy(&names),
            workers,
            catalogue: ActionCatalogue::routing(),
            escalation: Arc::new(UnimplementedEscalation),
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoConversationLogger),
            outcome,
            finished: CancellationToken::new(),
            phase: CoordinatorPhase::Idle,
            task: None,
            open_round: None,
            next_round: RoundId::new(1),
            pending_direct: HashMap::new(),
        }
    }

    pub fn with_escalation(mut self, escalation: Arc<dyn HumanEscalationPort>) -> Self {
        self.escalation = escalation;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn CoordinationProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Token cancelled once the final answer is recorded. Workers holding
    /// it drop the questions still outstanding.
    pub fn with_finish_signal(mut self, finished: CancellationToken) -> Self {
        self.finished = finished;
        self
    }

    fn set_phase(&mut self, phase: CoordinatorPhase) {
        if self.phase != phase {
            debug!("Coordinator phase {:?} -> {:?}", self.phase, phase);
        }
        self.phase = phase;
        self.outcome.record_phase(phase);
    }

    async fn on_task(&mut self, message: Message, ctx: &ActorContext) -> Result<(), CouncilError> {
        if self.phase != CoordinatorPhase::Idle {
            warn!(
                "Coordinator already handling a task; ignoring '{}'",
                preview(message.content(), 60)
            );
            return Ok(());
        }
        info!("Task received: {}", preview(message.content(), 120));
        self.logger.log(ConversationEvent::new(
            "task_received",
            json!({ "source": message.source(), "text": message.content() }),
        ));
        self.store.append_global(message.clone()).await;
        self.task = Some(message);
        self.run_decision_loop(ctx).await
    }

    async fn on_direct_reply(
        &mut self,
        sender: ActorId,
        message: Message,
        ctx: &ActorContext,
    ) -> Result<(), CouncilError> {
        let Some(pending) = self.pending_direct.get_mut(&sender) else {
            warn!("Unsolicited direct reply from {}; discarded", sender);
            self.log_discarded(&sender, "unsolicited direct reply");
            return Ok(());
        };
        *pending -= 1;
        if *pending == 0 {
            self.pending_direct.remove(&sender);
        }

        debug!("Direct reply from {}: {}", sender, preview(message.content(), 80));
        self.progress.on_direct_reply(&sender);
        self.logger.log(ConversationEvent::new(
            "direct_reply",
            json!({ "worker": sender.to_string(), "text": message.content() }),
        ));
        self.store.append_global(message).await;
        self.run_decision_loop(ctx).await
    }

    async fn on_round_reply(
        &mut self,
        sender: ActorId,
        round_id: RoundId,
        message: Message,
        ctx: &ActorContext,
    ) -> Result<(), CouncilError> {
        let round = match &self.open_round {
            Some(round) if round.id() == round_id => round.clone(),
            _ => {
                warn!("Reply from {} for round {} is late; discarded", sender, round_id);
                self.log_discarded(&sender, "round not open");
                return Ok(());
            }
        };
        if !round.expects(message.source()) {
            warn!("Round {} does not expect {}; reply discarded", round_id, sender);
            self.log_discarded(&sender, "not a round member");
            return Ok(());
        }
        let already = self.store.snapshot_round().await;
        if already.iter().any(|m| m.source() == message.source()) {
            warn!("Duplicate reply from {} in round {}; discarded", sender, round_id);
            self.log_discarded(&sender, "duplicate round reply");
            return Ok(());
        }

        self.logger.log(ConversationEvent::new(
            "round_reply",
            json!({
                "round": round_id.value(),
                "worker": sender.to_string(),
                "text": message.content(),
            }),
        ));
        self.store.append_round(message).await;
        let replies = self.store.snapshot_round().await;
        let progress = round.progress(&replies);
        self.progress
            .on_round_reply(&sender, progress.received, progress.expected);
        debug!(
            "Round {}: {}/{} replies",
            round_id, progress.received, progress.expected
        );
        if !progress.is_complete() {
            return Ok(());
        }

        for reply in replies {
            self.store.append_global(reply).await;
        }
        self.open_round = None;
        self.outcome.rounds_completed.fetch_add(1, Ordering::SeqCst);
        info!("Round {} complete", round_id);
        self.progress.on_round_complete();
        self.logger.log(ConversationEvent::new(
            "round_complete",
            json!({ "round": round_id.value(), "replies": progress.received }),
        ));
        self.run_decision_loop(ctx).await
    }

    async fn run_decision_loop(&mut self, ctx: &ActorContext) -> Result<(), CouncilError> {
        loop {
            self.set_phase(CoordinatorPhase::AwaitingOracleDecision);
            let cycle = self.outcome.decision_cycles.fetch_add(1, Ordering::SeqCst) + 1;
            self.progress.on_decision_start(cycle);

            let history = self.store.snapshot_global().await;
            let calls = match self.decide(&history, ctx).await? {
                OracleReply::FreeText(answer) => return self.finish(answer, ctx).await,
                OracleReply::ActionCalls(calls) => calls,
            };
            let decisions = self.interpret(&calls, ctx).await?;
            for decision in &decisions {
                info!("Cycle {}: {}", cycle, decision.kind());
                self.progress.on_decision(decision);
                self.logger.log(ConversationEvent::new(
                    "routing_decision",
                    json!({
                        "cycle": cycle,
                        "decision": serde_json::to_value(decision).unwrap_or_default(),
                    }),
                ));
            }
            let steps = self.resolve_escalations(decisions, ctx).await?;
            if ctx.cancellation().is_cancelled() {
                return Err(CouncilError::Cancelled);
            }

            self.set_phase(CoordinatorPhase::Dispatching);
            let mut escalated = false;
            for step in steps {
                match self.apply(step, ctx).await? {
                    Applied::Dispatched => {}
                    Applied::Escalated => escalated = true,
                    Applied::Finished => return Ok(()),
                }
            }

            if !escalated {
                let waiting = if self.open_round.is_some() {
                    CoordinatorPhase::RoundOpen
                } else {
                    CoordinatorPhase::AwaitingOracleDecision
                };
                self.set_phase(waiting);
                return Ok(());
            }
        }
    }

    /// Consult the oracle with the routing actions, retrying once when it
    /// calls none of them.
    async fn decide(
        &self,
        history: &[Message],
        ctx: &ActorContext,
    ) -> Result<OracleReply, CouncilError> {
        for attempt in 1..=EMPTY_SELECTION_ATTEMPTS {
            let reply = consult(
                self.oracle.as_ref(),
                &self.policy,
                history,
                Some(self.catalogue.all()),
                ctx.cancellation(),
            )
            .await?;
            match reply {
                OracleReply::ActionCalls(calls) if calls.is_empty() => {
                    warn!("Oracle selected no routing action (attempt {})", attempt);
                }
                other => return Ok(other),
            }
        }
        Err(CouncilError::ProtocolViolation(format!(
            "oracle selected no routing action {} times in a row",
            EMPTY_SELECTION_ATTEMPTS
        )))
    }

    async fn interpret(
        &self,
        calls: &[ActionCall],
        ctx: &ActorContext,
    ) -> Result<Vec<RoutingDecision>, CouncilError> {
        let decisions = calls
            .iter()
            .map(RoutingDecision::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        for decision in &decisions {
            if let RoutingDecision::AskWorker { worker, .. } = decision {
                if !self.workers.contains(worker) || !ctx.is_registered(worker.actor_type()).await
                {
                    return Err(CouncilError::UnknownActor(worker.clone()));
                }
            }
        }
        Ok(decisions)
    }

    /// Ask the human every escalation of the cycle, racing cancellation.
    /// Nothing is recorded here; answers are applied with the rest of the cycle.
    async fn resolve_escalations(
        &self,
        decisions: Vec<RoutingDecision>,
        ctx: &ActorContext,
    ) -> Result<Vec<Step>, CouncilError> {
        let mut steps = Vec::with_capacity(decisions.len());
        for decision in decisions {
            let step = match decision {
                RoutingDecision::AskWorker { worker, question } => {
                    Step::AskWorker { worker, question }
                }
                RoutingDecision::AskAllWorkers { question } => Step::AskAllWorkers { question },
                RoutingDecision::AskExternal { question } => {
                    let answer = tokio::select! {
                        biased;
                        _ = ctx.cancellation().cancelled() => return Err(CouncilError::Cancelled),
                        answer = self.escalation.ask(&question) => answer?,
                    };
                    Step::Answered { question, answer }
                }
                RoutingDecision::Final { answer } => Step::Final { answer },
            };
            steps.push(step);
        }
        Ok(steps)
    }

    async fn apply(&mut self, step: Step, ctx: &ActorContext) -> Result<Applied, CouncilError> {
        let me = ctx.id().to_string();
        match step {
            Step::AskWorker { worker, question } => {
                let asked = Message::assistant(question, me);
                self.store.append_global(asked.clone()).await;
                let envelope =
                    Envelope::question(ctx.id().clone(), asked, self.context(), Exchange::Direct);
                ctx.send(&worker, envelope).await?;
                *self.pending_direct.entry(worker).or_default() += 1;
                Ok(Applied::Dispatched)
            }
            Step::AskAllWorkers { question } => {
                let round = Round::new(self.next_round, self.workers.iter().cloned());
                let round_id = round.id();
                let expected = round.expected_count();
                self.next_round = self.next_round.next();
                if let Some(previous) = self.open_round.replace(round) {
                    warn!("Round {} superseded by round {}", previous.id(), round_id);
                }

                self.store.start_round().await;
                let asked = Message::assistant(question, me);
                self.store.append_global(asked.clone()).await;
                self.progress.on_round_start(expected);
                self.logger.log(ConversationEvent::new(
                    "round_started",
                    json!({
                        "round": round_id.value(),
                        "expected": expected,
                        "question": asked.content(),
                    }),
                ));
                let envelope = Envelope::question(
                    ctx.id().clone(),
                    asked,
                    self.context(),
                    Exchange::Round(round_id),
                );
                let reached = ctx.publish(WORKER_TOPIC, envelope).await;
                debug!("Round {} question reached {} worker(s)", round_id, reached);
                Ok(Applied::Dispatched)
            }
            Step::Answered { question, answer } => {
                self.store
                    .append_global(Message::assistant(question, me))
                    .await;
                self.store
                    .append_global(Message::user(answer, USER_SOURCE))
                    .await;
                Ok(Applied::Escalated)
            }
            Step::Final { answer } => {
                self.finish(answer, ctx).await?;
                Ok(Applied::Finished)
            }
        }
    }

    async fn finish(&mut self, answer: String, ctx: &ActorContext) -> Result<(), CouncilError> {
        self.store
            .append_global(Message::assistant(answer.clone(), ctx.id().to_string()))
            .await;
        self.set_phase(CoordinatorPhase::Terminated);
        self.open_round = None;
        if !self.pending_direct.is_empty() {
            debug!(
                "Dropping {} outstanding direct question(s)",
                self.pending_direct.values().sum::<usize>()
            );
        }
        self.pending_direct.clear();
        self.finished.cancel();

        info!("Final answer: {}", preview(&answer, 120));
        self.progress.on_final(&answer);
        self.logger.log(ConversationEvent::new(
            "final_answer",
            json!({ "text": answer, "cycles": self.outcome.decision_cycles() }),
        ));
        if self.outcome.final_answer.set(answer).is_err() {
            warn!("Final answer already recorded; keeping the first one");
        }
        Ok(())
    }

    /// Context handed to workers with every question: the original task.
    fn context(&self) -> Vec<Message> {
        self.task.iter().cloned().collect()
    }

    fn log_discarded(&self, sender: &ActorId, reason: &str) {
        self.logger.log(ConversationEvent::new(
            "late_reply_discarded",
            json!({ "worker": sender.to_string(), "reason": reason }),
        ));
    }
}

#[async_trait]
impl<O: DecisionOracle + ?Sized + 'static> Actor for CoordinatorActor<O> {
    async fn handle(&mut self, envelope: Envelope, ctx: &ActorContext) -> Result<(), CouncilError> {
        let sender = envelope.sender;
        match envelope.kind {
            EnvelopeKind::Task { message } => self.on_task(message, ctx).await,
            EnvelopeKind::Response { .. } if self.phase == CoordinatorPhase::Terminated => {
                debug!("Reply from {} after the final answer; discarded", sender);
                self.log_discarded(&sender, "after final answer");
                Ok(())
            }
            EnvelopeKind::Response {
                message,
                exchange: Exchange::Direct,
            } => self.on_direct_reply(sender, message, ctx).await,
            EnvelopeKind::Response {
                message,
                exchange: Exchange::Round(round_id),
            } => self.on_round_reply(sender, round_id, message, ctx).await,
            EnvelopeKind::Question { .. } => {
                warn!("Coordinator ignoring question from {}", sender);
                Ok(())
            }
        }
    }
}
