//! Topic router - in-process publish/subscribe between actors.
//!
//! Every actor instance owns an unbounded mailbox drained by its own tokio
//! task, so one instance handles one envelope at a time and sees envelopes
//! in the order they were enqueued for it. Publishing never runs a handler
//! in the publisher's context: it only enqueues.
//!
//! ```text
//! register("Worker_0", factory) ──▶ ActorType
//! subscribe("worker.question", &ActorType)
//! publish("worker.question", env) ──▶ mailbox(Worker_0) ──▶ task ──▶ Actor::handle
//!                                 └─▶ mailbox(Worker_1) ──▶ task ──▶ Actor::handle
//! send(&ActorId, env)             ──▶ mailbox(that instance only)
//! ```
//!
//! Instances are created lazily from their type's factory on first delivery.
//! A watch channel counts envelopes that are queued or being handled;
//! [`TopicRouter::stop_when_idle`] waits for it to reach zero.
//!
//! A handler error (or panic) is recorded, cancels the router's token so
//! other in-flight handlers unwind, and is returned by `stop_when_idle`.

use crate::error::CouncilError;
use async_trait::async_trait;
use council_domain::{ActorId, Envelope};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

/// Behaviour of one actor instance.
///
/// Implementations switch explicitly on [`council_domain::EnvelopeKind`].
#[async_trait]
pub trait Actor: Send {
    async fn handle(&mut self, envelope: Envelope, ctx: &ActorContext) -> Result<(), CouncilError>;
}

type ActorFactory = dyn Fn(&ActorId) -> Box<dyn Actor> + Send + Sync;

/// Handle for a registered actor type, required to subscribe it to topics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorType(String);

impl ActorType {
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Counters describing router traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    /// Calls to `publish`
    pub published: u64,
    /// Successful calls to `send`
    pub sent: u64,
    /// Envelopes enqueued into mailboxes (fan-out included)
    pub delivered: u64,
}

/// What an actor sees of the runtime while handling an envelope
#[derive(Clone)]
pub struct ActorContext {
    id: ActorId,
    router: Arc<TopicRouter>,
}

impl ActorContext {
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    /// Cancellation signal of the run; fires on operator cancel or on the
    /// first handler failure.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.router.cancellation
    }

    pub async fn publish(&self, topic: &str, envelope: Envelope) -> usize {
        self.router.publish(topic, envelope).await
    }

    pub async fn send(&self, to: &ActorId, envelope: Envelope) -> Result<(), CouncilError> {
        self.router.send(to, envelope).await
    }

    pub async fn is_registered(&self, actor_type: &str) -> bool {
        self.router.is_registered(actor_type).await
    }
}

#[derive(Default)]
struct Registry {
    factories: HashMap<String, Arc<ActorFactory>>,
    /// topic → subscribed actor types, in subscription order
    subscriptions: HashMap<String, Vec<ActorType>>,
    mailboxes: HashMap<ActorId, mpsc::UnboundedSender<Envelope>>,
    tasks: Vec<JoinHandle<()>>,
    stopped: bool,
}

/// In-process publish/subscribe bus and actor registry
pub struct TopicRouter {
    registry: Mutex<Registry>,
    in_flight: watch::Sender<usize>,
    failure: Mutex<Option<CouncilError>>,
    cancellation: CancellationToken,
    published: AtomicU64,
    sent: AtomicU64,
    delivered: AtomicU64,
}

impl TopicRouter {
    pub fn new(cancellation: CancellationToken) -> Arc<Self> {
        let (in_flight, _) = watch::channel(0usize);
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            in_flight,
            failure: Mutex::new(None),
            cancellation,
            published: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
        })
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Bind an actor kind to a type handle. Instances are built by `factory`
    /// on first delivery. Re-registering a name replaces its factory for
    /// instances not yet created.
    pub async fn register<F>(&self, actor_type: impl Into<String>, factory: F) -> ActorType
    where
        F: Fn(&ActorId) -> Box<dyn Actor> + Send + Sync + 'static,
    {
        let name = actor_type.into();
        let mut registry = self.registry.lock().await;
        if registry
            .factories
            .insert(name.clone(), Arc::new(factory))
            .is_some()
        {
            warn!("Actor type '{}' registered twice; factory replaced", name);
        }
        debug!("Registered actor type '{}'", name);
        ActorType(name)
    }

    /// Deliver every future publish on `topic` to each instance of `actor_type`.
    pub async fn subscribe(&self, topic: impl Into<String>, actor_type: &ActorType) {
        let topic = topic.into();
        let mut registry = self.registry.lock().await;
        let subscribers = registry.subscriptions.entry(topic.clone()).or_default();
        if !subscribers.contains(actor_type) {
            subscribers.push(actor_type.clone());
            debug!("Subscribed '{}' to topic '{}'", actor_type.name(), topic);
        }
    }

    pub async fn is_registered(&self, actor_type: &str) -> bool {
        self.registry.lock().await.factories.contains_key(actor_type)
    }

    /// Deliver `envelope` to every instance of every type subscribed to
    /// `topic` and return how many mailboxes received it. A topic without
    /// subscribers is a no-op.
    pub async fn publish(self: &Arc<Self>, topic: &str, envelope: Envelope) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let mut registry = self.registry.lock().await;

        let subscribed = registry
            .subscriptions
            .get(topic)
            .cloned()
            .unwrap_or_default();
        if subscribed.is_empty() {
            trace!("Publish to '{}' has no subscribers", topic);
            return 0;
        }

        let mut targets = Vec::new();
        for actor_type in &subscribed {
            let mut instances: Vec<ActorId> = registry
                .mailboxes
                .keys()
                .filter(|id| id.actor_type() == actor_type.name())
                .cloned()
                .collect();
            if instances.is_empty() {
                instances.push(ActorId::of_type(actor_type.name()));
            }
            targets.extend(instances);
        }

        let mut delivered = 0;
        for id in &targets {
            match self.mailbox_for(&mut registry, id) {
                Ok(mailbox) => {
                    if self.enqueue(&mailbox, envelope.clone()) {
                        delivered += 1;
                    }
                }
                Err(e) => warn!("Publish to '{}' skipped {}: {}", topic, id, e),
            }
        }
        debug!(
            "Published {} on '{}' to {} mailbox(es)",
            envelope.kind.as_str(),
            topic,
            delivered
        );
        delivered
    }

    /// Deliver `envelope` to one actor instance, bypassing topics.
    pub async fn send(self: &Arc<Self>, to: &ActorId, envelope: Envelope) -> Result<(), CouncilError> {
        let mut registry = self.registry.lock().await;
        let mailbox = self.mailbox_for(&mut registry, to)?;
        if !self.enqueue(&mailbox, envelope) {
            return Err(CouncilError::UnknownActor(to.clone()));
        }
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> RouterStats {
        RouterStats {
            published: self.published.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
        }
    }

    /// Wait until no envelope is queued or being handled. Mailboxes stay open.
    pub async fn wait_idle(&self) {
        let mut idle = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = idle.wait_for(|pending| *pending == 0).await;
    }

    /// Wait until no envelope is queued or being handled, then close every
    /// mailbox and join the actor tasks. Returns the first handler failure.
    pub async fn stop_when_idle(&self) -> Result<(), CouncilError> {
        self.wait_idle().await;

        let tasks = {
            let mut registry = self.registry.lock().await;
            registry.stopped = true;
            registry.mailboxes.clear();
            std::mem::take(&mut registry.tasks)
        };
        debug!("Router idle; joining {} actor task(s)", tasks.len());
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!("Actor task ended abnormally: {}", e);
            }
        }

        match self.failure.lock().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn mailbox_for(
        self: &Arc<Self>,
        registry: &mut Registry,
        id: &ActorId,
    ) -> Result<mpsc::UnboundedSender<Envelope>, CouncilError> {
        if let Some(mailbox) = registry.mailboxes.get(id) {
            return Ok(mailbox.clone());
        }
        if registry.stopped {
            return Err(CouncilError::UnknownActor(id.clone()));
        }
        let factory = registry
            .factories
            .get(id.actor_type())
            .cloned()
            .ok_or_else(|| CouncilError::UnknownActor(id.clone()))?;

        let actor = factory(id);
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let ctx = ActorContext {
            id: id.clone(),
            router: Arc::clone(self),
        };
        registry.tasks.push(tokio::spawn(run_mailbox(actor, inbox, ctx)));
        registry.mailboxes.insert(id.clone(), mailbox.clone());
        debug!("Spawned actor instance {}", id);
        Ok(mailbox)
    }

    fn enqueue(&self, mailbox: &mpsc::UnboundedSender<Envelope>, envelope: Envelope) -> bool {
        self.in_flight.send_modify(|pending| *pending += 1);
        if mailbox.send(envelope).is_err() {
            self.finish_delivery();
            warn!("Mailbox closed; envelope dropped");
            return false;
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn finish_delivery(&self) {
        self.in_flight
            .send_modify(|pending| *pending = pending.saturating_sub(1));
    }

    async fn record_failure(&self, actor: &ActorId, failure: CouncilError) {
        if failure.is_cancelled() {
            debug!("Actor {} unwound after cancellation", actor);
        } else {
            error!("Actor {} failed: {}", actor, failure);
        }
        let mut slot = self.failure.lock().await;
        let replace = match slot.as_ref() {
            None => true,
            Some(existing) => existing.is_cancelled() && !failure.is_cancelled(),
        };
        if replace {
            *slot = Some(failure);
        }
        self.cancellation.cancel();
    }
}

async fn run_mailbox(
    mut actor: Box<dyn Actor>,
    mut inbox: mpsc::UnboundedReceiver<Envelope>,
    ctx: ActorContext,
) {
    while let Some(envelope) = inbox.recv().await {
        let router = Arc::clone(&ctx.router);
        if router.cancellation.is_cancelled() {
            trace!(
                "{} dropping {} after cancellation",
                ctx.id,
                envelope.kind.as_str()
            );
        } else {
            trace!(
                "{} handling {} from {}",
                ctx.id,
                envelope.kind.as_str(),
                envelope.sender
            );
            let outcome = AssertUnwindSafe(actor.handle(envelope, &ctx))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => router.record_failure(&ctx.id, e).await,
                Err(_) => {
                    router
                        .record_failure(&ctx.id, CouncilError::ActorPanicked(ctx.id.clone()))
                        .await
                }
            }
        }
        router.finish_delivery();
    }
}
