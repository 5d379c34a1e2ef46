//! Run Council use case
//!
//! Builds the actor graph for one task and drives it to a final answer:
//! one coordinator, `worker_count` workers named `Worker_0..`, wired through
//! a fresh [`TopicRouter`] and [`ConversationStore`].

use crate::actors::coordinator::{CoordinationOutcome, CoordinatorActor};
use crate::actors::worker::WorkerActor;
use crate::error::CouncilError;
use crate::ports::conversation_logger::{ConversationLogger, NoConversationLogger};
use crate::ports::decision_oracle::DecisionOracle;
use crate::ports::human_escalation::{HumanEscalationPort, UnimplementedEscalation};
use crate::ports::progress::{CoordinationProgress, NoProgress};
use crate::router::{Actor, RouterStats, TopicRouter};
use crate::store::ConversationStore;
use council_domain::{
    ActorId, COORDINATOR_TYPE, Envelope, Message, RESPONSE_TOPIC, TASK_TOPIC, USER_SOURCE,
    WORKER_TOPIC, worker_type_name,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Input for the RunCouncil use case
#[derive(Debug, Clone)]
pub struct RunCouncilInput {
    /// Feature description from the operator
    pub task: String,
    /// Number of workers to spawn
    pub worker_count: usize,
}

impl RunCouncilInput {
    pub fn new(task: impl Into<String>, worker_count: usize) -> Self {
        Self {
            task: task.into(),
            worker_count,
        }
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunCouncilOutput {
    pub final_answer: String,
    /// Global conversation log at the end of the run
    pub transcript: Vec<Message>,
    pub decision_cycles: usize,
    pub rounds: usize,
    pub stats: RouterStats,
}

/// Use case for running one council over one task
pub struct RunCouncilUseCase<O: DecisionOracle + ?Sized + 'static> {
    oracle: Arc<O>,
    escalation: Arc<dyn HumanEscalationPort>,
    progress: Arc<dyn CoordinationProgress>,
    logger: Arc<dyn ConversationLogger>,
    store: Option<Arc<ConversationStore>>,
}

impl<O: DecisionOracle + ?Sized + 'static> RunCouncilUseCase<O> {
    pub fn new(oracle: Arc<O>) -> Self {
        Self {
            oracle,
            escalation: Arc::new(UnimplementedEscalation),
            progress: Arc::new(NoProgress),
            logger: Arc::new(NoConversationLogger),
            store: None,
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

    /// Use `store` instead of a fresh one per run.
    pub fn with_store(mut self, store: Arc<ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the council until it goes idle.
    ///
    /// Cancelling `cancellation` stops every actor at its next await point
    /// and yields [`CouncilError::Cancelled`]. Once the coordinator has its
    /// final answer, outstanding worker questions are dropped and later
    /// failures no longer affect the result.
    pub async fn execute(
        &self,
        input: RunCouncilInput,
        cancellation: CancellationToken,
    ) -> Result<RunCouncilOutput, CouncilError> {
        if input.worker_count == 0 {
            return Err(CouncilError::NoWorkers);
        }
        info!("Starting council with {} worker(s)", input.worker_count);

        let router = TopicRouter::new(cancellation.child_token());
        let finished = router.cancellation().child_token();
        let store = self.store.clone().unwrap_or_default();
        let outcome = Arc::new(CoordinationOutcome::new());

        let workers: Vec<ActorId> = (0..input.worker_count)
            .map(|i| ActorId::of_type(worker_type_name(i)))
            .collect();
        for worker in &workers {
            let oracle = Arc::clone(&self.oracle);
            let store = Arc::clone(&store);
            let finished = finished.clone();
            let handle = router
                .register(worker.actor_type(), move |_id: &ActorId| -> Box<dyn Actor> {
                    Box::new(
                        WorkerActor::new(Arc::clone(&oracle), Arc::clone(&store))
                            .with_finish_signal(finished.clone()),
                    )
                })
                .await;
            router.subscribe(WORKER_TOPIC, &handle).await;
        }

        let coordinator = {
            let oracle = Arc::clone(&self.oracle);
            let store = Arc::clone(&store);
            let outcome = Arc::clone(&outcome);
            let escalation = Arc::clone(&self.escalation);
            let progress = Arc::clone(&self.progress);
            let logger = Arc::clone(&self.logger);
            let workers = workers.clone();
            let finished = finished.clone();
            router
                .register(COORDINATOR_TYPE, move |_id: &ActorId| -> Box<dyn Actor> {
                    Box::new(
                        CoordinatorActor::new(
                            Arc::clone(&oracle),
                            Arc::clone(&store),
                            workers.clone(),
                            Arc::clone(&outcome),
                        )
                        .with_escalation(Arc::clone(&escalation))
                        .with_progress(Arc::clone(&progress))
                        .with_conversation_logger(Arc::clone(&logger))
                        .with_finish_signal(finished.clone()),
                    )
                })
                .await
        };
        router.subscribe(TASK_TOPIC, &coordinator).await;
        router.subscribe(RESPONSE_TOPIC, &coordinator).await;

        router
            .publish(TASK_TOPIC, Envelope::task(Message::user(input.task, USER_SOURCE)))
            .await;
        let result = router.stop_when_idle().await;
        debug!(
            "Council idle in phase {:?}: {:?}",
            outcome.phase(),
            router.stats()
        );

        let Some(final_answer) = outcome.final_answer() else {
            if cancellation.is_cancelled() {
                return Err(CouncilError::Cancelled);
            }
            result?;
            return Err(CouncilError::NoFinalAnswer);
        };
        if let Err(e) = result {
            warn!("Failure after the final answer ignored: {}", e);
        }
        Ok(RunCouncilOutput {
            final_answer,
            transcript: store.snapshot_global().await,
            decision_cycles: outcome.decision_cycles(),
            rounds: outcome.rounds_completed(),
            stats: router.stats(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::decision_oracle::OracleReply;
    use crate::testing::{MemoryLogger, ScriptedOracle, ask_all, ask_worker, text};
    use council_domain::{ActionCall, Role};
    use std::time::Duration;

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content()).collect()
    }

    #[tokio::test]
    async fn test_no_workers_is_rejected() {
        let oracle = Arc::new(ScriptedOracle::new(vec![text("unused")]));
        let use_case = RunCouncilUseCase::new(Arc::clone(&oracle));

        let result = use_case
            .execute(RunCouncilInput::new("task", 0), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(CouncilError::NoWorkers)));
        assert!(oracle.calls().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_round_then_final() {
        let store = Arc::new(ConversationStore::new());
        let oracle = Arc::new(
            ScriptedOracle::new(vec![ask_all("Q1"), text("done")])
                .with_worker_answers(["first", "second"])
                .observing(Arc::clone(&store)),
        );
        let use_case = RunCouncilUseCase::new(Arc::clone(&oracle)).with_store(Arc::clone(&store));

        let output = use_case
            .execute(RunCouncilInput::new("Add dark mode", 2), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.final_answer, "done");
        assert_eq!(output.decision_cycles, 2);
        assert_eq!(output.rounds, 1);
        // The second decision saw both round replies.
        let coordinator_calls = oracle.coordinator_calls();
        assert_eq!(coordinator_calls.len(), 2);
        assert_eq!(coordinator_calls[1].round_log_len, Some(2));
        assert_eq!(coordinator_calls[1].history.len(), 4);

        let transcript = &output.transcript;
        assert_eq!(transcript.len(), 5);
        assert_eq!(transcript[0].content(), "Add dark mode");
        assert_eq!(transcript[1].content(), "Q1");
        let mut replies = contents(&transcript[2..4]);
        replies.sort();
        assert_eq!(replies, vec!["first", "second"]);
        assert_eq!(transcript[4].content(), "done");
        assert_eq!(transcript[4].role(), Role::Assistant);

        // Task publish, round question, two round replies. Nothing point-to-point.
        assert_eq!(output.stats.published, 4);
        assert_eq!(output.stats.sent, 0);
    }

    #[tokio::test]
    async fn test_terminates_after_exactly_k_cycles() {
        let oracle = Arc::new(ScriptedOracle::new(vec![
            ask_worker("Worker_0", "q1"),
            ask_worker("Worker_1", "q2"),
            ask_all("q3"),
            text("final"),
        ]));
        let use_case = RunCouncilUseCase::new(Arc::clone(&oracle));

        let output = use_case
            .execute(RunCouncilInput::new("task", 2), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output.decision_cycles, 4);
        assert_eq!(oracle.coordinator_calls().len(), 4);
        assert_eq!(output.transcript.last().map(|m| m.content()), Some("final"));
        // Two direct questions and their two direct replies.
        assert_eq!(output.stats.sent, 4);
    }

    #[tokio::test]
    async fn test_worker_logs_are_private_and_seeded_with_task() {
        let store = Arc::new(ConversationStore::new());
        let oracle = Arc::new(
            ScriptedOracle::new(vec![
                ask_worker("Worker_0", "only for zero"),
                text("done"),
            ])
            .with_worker_answers(["zero says hi"]),
        );
        let use_case = RunCouncilUseCase::new(oracle).with_store(Arc::clone(&store));

        use_case
            .execute(RunCouncilInput::new("Add dark mode", 2), CancellationToken::new())
            .await
            .unwrap();

        let zero = store.snapshot_worker(&ActorId::of_type("Worker_0")).await;
        assert_eq!(
            contents(&zero),
            vec!["Add dark mode", "only for zero", "zero says hi"]
        );
        assert!(store
            .snapshot_worker(&ActorId::of_type("Worker_1"))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_conversation_events_are_logged() {
        let logger = Arc::new(MemoryLogger::default());
        let oracle = Arc::new(ScriptedOracle::new(vec![ask_all("Q1"), text("done")]));
        let use_case =
            RunCouncilUseCase::new(oracle).with_conversation_logger(logger.clone());

        use_case
            .execute(RunCouncilInput::new("task", 1), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            logger.event_types(),
            vec![
                "task_received",
                "routing_decision",
                "round_started",
                "round_reply",
                "round_complete",
                "final_answer",
            ]
        );
    }

    #[tokio::test]
    async fn test_oracle_failure_aborts_run() {
        // Script exhausted on the first coordinator call.
        let oracle = Arc::new(ScriptedOracle::new(vec![]));
        let use_case = RunCouncilUseCase::new(oracle);

        let result = use_case
            .execute(RunCouncilInput::new("task", 1), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(CouncilError::TransportFailure(_))));
    }

    #[tokio::test]
    async fn test_cancellation_stops_a_pending_decision() {
        let oracle = Arc::new(ScriptedOracle::new(vec![]).then_hang());
        let use_case = RunCouncilUseCase::new(oracle);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = use_case
            .execute(RunCouncilInput::new("task", 2), cancel)
            .await;

        assert!(matches!(result, Err(e) if e.is_cancelled()));
    }

    #[tokio::test]
    async fn test_cancellation_stops_hanging_workers() {
        let oracle = Arc::new(
            ScriptedOracle::new(vec![ask_all("Q1")]).with_hanging_workers(),
        );
        let use_case = RunCouncilUseCase::new(oracle);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = use_case
            .execute(RunCouncilInput::new("task", 3), cancel)
            .await;

        assert!(matches!(result, Err(CouncilError::Cancelled)));
    }

    #[tokio::test]
    async fn test_final_answer_survives_a_straggling_worker() {
        let oracle = Arc::new(
            ScriptedOracle::new(vec![
                OracleReply::ActionCalls(vec![
                    ActionCall::new("ask_worker")
                        .with_arg("worker_name", "Worker_0")
                        .with_arg("question", "fast"),
                    ActionCall::new("ask_worker")
                        .with_arg("worker_name", "Worker_1")
                        .with_arg("question", "slow"),
                ]),
                text("done"),
            ])
            .with_failing_question("slow", Duration::from_secs(30)),
        );
        let use_case = RunCouncilUseCase::new(oracle);

        let output = tokio::time::timeout(
            Duration::from_secs(10),
            use_case.execute(RunCouncilInput::new("task", 2), CancellationToken::new()),
        )
        .await
        .expect("run waited for the straggler")
        .unwrap();

        assert_eq!(output.final_answer, "done");
        assert_eq!(output.decision_cycles, 2);
        assert_eq!(
            contents(&output.transcript),
            vec!["task", "fast", "slow", "ok", "done"]
        );
    }
}
