//! Shared conversation store.
//!
//! Three append-only logs shared by every actor of a run:
//!
//! | Log | Written by | Read by |
//! |-----|-----------|---------|
//! | global | coordinator | coordinator (context of every routing decision) |
//! | per-worker | that worker | that worker (its private history) |
//! | round | coordinator | coordinator (aggregation of the open broadcast) |
//!
//! All three live behind one `tokio::sync::Mutex`. Every operation is a
//! copy or an append; no oracle call or other I/O ever happens while the
//! guard is held, so a single lock costs nothing and keeps all operations
//! linearizable. Snapshots are owned `Vec`s taken at the instant of the call.

use council_domain::{ActorId, Message};
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Logs {
    global: Vec<Message>,
    workers: HashMap<ActorId, Vec<Message>>,
    round: Vec<Message>,
}

/// Thread-safe append-only message logs for one council run
#[derive(Debug, Default)]
pub struct ConversationStore {
    logs: Mutex<Logs>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append_global(&self, message: Message) {
        self.logs.lock().await.global.push(message);
    }

    /// Append to `worker`'s private log, creating it on first use.
    pub async fn append_worker(&self, worker: &ActorId, message: Message) {
        self.logs
            .lock()
            .await
            .workers
            .entry(worker.clone())
            .or_default()
            .push(message);
    }

    /// Seed `worker`'s private log with `context` if the log is still empty.
    ///
    /// The emptiness check and the appends happen under one guard, so two
    /// questions racing to the same worker can never both seed it. Returns
    /// whether seeding happened.
    pub async fn seed_worker(&self, worker: &ActorId, context: &[Message]) -> bool {
        let mut logs = self.logs.lock().await;
        let log = logs.workers.entry(worker.clone()).or_default();
        if !log.is_empty() {
            return false;
        }
        log.extend_from_slice(context);
        true
    }

    pub async fn snapshot_global(&self) -> Vec<Message> {
        self.logs.lock().await.global.clone()
    }

    /// Copy of `worker`'s private log; empty if the worker was never asked.
    pub async fn snapshot_worker(&self, worker: &ActorId) -> Vec<Message> {
        self.logs
            .lock()
            .await
            .workers
            .get(worker)
            .cloned()
            .unwrap_or_default()
    }

    /// Clear the round log, opening a new aggregation window.
    pub async fn start_round(&self) {
        self.logs.lock().await.round.clear();
    }

    /// Append a reply to the current round and return the round log's new length.
    pub async fn append_round(&self, message: Message) -> usize {
        let mut logs = self.logs.lock().await;
        logs.round.push(message);
        logs.round.len()
    }

    pub async fn snapshot_round(&self) -> Vec<Message> {
        self.logs.lock().await.round.clone()
    }
}
