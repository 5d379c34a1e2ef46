//! Worker actor.
//!
//! A worker has no state of its own beyond its identity: its history lives
//! in its private slice of the [`ConversationStore`]. For every question it
//!
//! 1. seeds the private log with the coordinator-supplied context, once;
//! 2. asks the oracle with the worker role, the private log and the question;
//! 3. records the question and its answer in the private log;
//! 4. replies point-to-point for a direct question, or on the
//!    `worker.response` topic for a round question.
//!
//! Once the coordinator signals that the run has its final answer, questions
//! still pending are dropped without a reply.

use crate::actors::consult;
use crate::error::CouncilError;
use crate::ports::decision_oracle::{DecisionOracle, OracleReply};
use crate::router::{Actor, ActorContext};
use crate::store::ConversationStore;
use async_trait::async_trait;
use council_domain::{
    ActorId, Envelope, EnvelopeKind, Exchange, Message, PromptTemplate, RESPONSE_TOPIC, preview,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct WorkerActor<O: DecisionOracle + ?Sized> {
    oracle: Arc<O>,
    store: Arc<ConversationStore>,
    finished: Option<CancellationToken>,
}

impl<O: DecisionOracle + ?Sized> WorkerActor<O> {
    pub fn new(oracle: Arc<O>, store: Arc<ConversationStore>) -> Self {
        Self {
            oracle,
            store,
            finished: None,
        }
    }

    /// `finished` must be a child of the run's cancellation token.
    pub fn with_finish_signal(mut self, finished: CancellationToken) -> Self {
        self.finished = Some(finished);
        self
    }

    /// The run already has its final answer and was not itself cancelled
    fn run_finished(&self, ctx: &ActorContext) -> bool {
        !ctx.cancellation().is_cancelled()
            && self.finished.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    async fn answer(
        &self,
        asker: ActorId,
        question: Message,
        context: Vec<Message>,
        exchange: Exchange,
        ctx: &ActorContext,
    ) -> Result<(), CouncilError> {
        let me = ctx.id();
        if self.store.seed_worker(me, &context).await {
            debug!("{} seeded private log with {} message(s)", me, context.len());
        }

        // From the worker's side the coordinator's question is the prompt.
        let asked = Message::user(question.content(), question.source());
        let mut prompt = self.store.snapshot_worker(me).await;
        prompt.push(asked.clone());

        let cancellation = self.finished.as_ref().unwrap_or(ctx.cancellation());
        let reply = match consult(
            self.oracle.as_ref(),
            PromptTemplate::worker_role(),
            &prompt,
            None,
            cancellation,
        )
        .await
        {
            Err(CouncilError::Cancelled) if self.run_finished(ctx) => {
                debug!("{} dropping '{}': run finished", me, preview(question.content(), 60));
                return Ok(());
            }
            other => other?,
        };
        let text = match reply {
            OracleReply::FreeText(text) => text,
            OracleReply::ActionCalls(calls) => {
                return Err(CouncilError::ProtocolViolation(format!(
                    "{} was offered no actions but the oracle called {} action(s)",
                    me,
                    calls.len()
                )));
            }
        };
        if ctx.cancellation().is_cancelled() {
            return Err(CouncilError::Cancelled);
        }
        if self.run_finished(ctx) {
            debug!("{} answered after the run finished; reply dropped", me);
            return Ok(());
        }
        info!("{} answered: {}", me, preview(&text, 120));

        let answer = Message::assistant(text, me.to_string());
        self.store.append_worker(me, asked).await;
        self.store.append_worker(me, answer.clone()).await;

        let response = Envelope::response(me.clone(), answer, exchange);
        match exchange {
            Exchange::Direct => ctx.send(&asker, response).await,
            Exchange::Round(_) => {
                ctx.publish(RESPONSE_TOPIC, response).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl<O: DecisionOracle + ?Sized + 'static> Actor for WorkerActor<O> {
    async fn handle(&mut self, envelope: Envelope, ctx: &ActorContext) -> Result<(), CouncilError> {
        match envelope.kind {
            EnvelopeKind::Question {
                message,
                context,
                exchange,
            } => {
                self.answer(envelope.sender, message, context, exchange, ctx)
                    .await
            }
            other => {
                warn!(
                    "{} ignoring {} envelope from {}",
                    ctx.id(),
                    other.as_str(),
                    envelope.sender
                );
                Ok(())
            }
        }
    }
}
