//! In-process named queues with receive counts and dead-letter stores
//!
//! Queues are created on first use. Delivery is at-least-once: a handler
//! failure requeues the message with its receive count intact, and a
//! message that exceeds the broker's maximum receive count moves to the
//! queue's dead-letter store, where an operator can list, purge, or
//! redrive it.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use cutover_config::BrokerConfig;

use crate::backoff::BackoffCalculator;
use crate::error::BrokerError;

/// A message as the broker owns it
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub id: Uuid,

    /// Deliveries so far; incremented on receive
    pub receive_count: u32,

    pub enqueued_at: DateTime<Utc>,

    /// Serialized envelope, opaque to the broker
    pub body: JsonValue,
}

impl QueueMessage {
    fn new(body: JsonValue) -> Self {
        Self {
            id: Uuid::new_v4(),
            receive_count: 0,
            enqueued_at: Utc::now(),
            body,
        }
    }
}

/// Handler invoked per delivered message
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, body: JsonValue) -> anyhow::Result<()>;
}

#[derive(Default)]
struct QueueState {
    messages: Mutex<VecDeque<QueueMessage>>,
    dead: Mutex<Vec<QueueMessage>>,
    notify: Notify,
    in_flight: AtomicUsize,
}

impl QueueState {
    async fn push(&self, msg: QueueMessage) {
        self.messages.lock().await.push_back(msg);
        self.notify.notify_one();
    }
}

/// The broker: named queues, per-queue dead-letter stores, admin ops.
///
/// Callers that `receive` a message own it until they either `ack` it or
/// hand it to `retry_or_dead_letter`; `pending` counts both queued and
/// in-flight messages so drain checks do not race in-flight work.
pub struct InProcessBroker {
    max_receive_count: u32,
    backoff: BackoffCalculator,
    queues: RwLock<HashMap<String, Arc<QueueState>>>,
}

impl InProcessBroker {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            max_receive_count: config.max_receive_count,
            backoff: BackoffCalculator::from_config(config),
            queues: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_receive_count(&self) -> u32 {
        self.max_receive_count
    }

    async fn state(&self, queue: &str) -> Arc<QueueState> {
        if let Some(state) = self.queues.read().await.get(queue) {
            return state.clone();
        }
        let mut queues = self.queues.write().await;
        queues.entry(queue.to_string()).or_default().clone()
    }

    /// Publish a message for immediate delivery
    pub async fn publish(&self, queue: &str, body: &impl Serialize) -> Result<(), BrokerError> {
        let msg = QueueMessage::new(serde_json::to_value(body)?);
        debug!(queue, message_id = %msg.id, "publishing message");
        self.state(queue).await.push(msg).await;
        Ok(())
    }

    /// Pop the next message, incrementing its receive count.
    ///
    /// The caller owns the message until `ack` or `retry_or_dead_letter`.
    pub async fn receive(&self, queue: &str) -> Option<QueueMessage> {
        let state = self.state(queue).await;
        let mut msg = state.messages.lock().await.pop_front()?;
        msg.receive_count += 1;
        state.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(msg)
    }

    /// Wait for the next message on a queue
    pub async fn next_message(&self, queue: &str) -> QueueMessage {
        let state = self.state(queue).await;
        loop {
            let popped = state.messages.lock().await.pop_front();
            if let Some(mut msg) = popped {
                msg.receive_count += 1;
                state.in_flight.fetch_add(1, Ordering::SeqCst);
                return msg;
            }
            state.notify.notified().await;
        }
    }

    /// Acknowledge successful processing of a received message
    pub async fn ack(&self, queue: &str) {
        self.state(queue).await.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Requeue a failed message, or dead-letter it once its receive count
    /// reaches the broker maximum. Redelivery delay follows the backoff
    /// calculator; a zero delay requeues synchronously.
    pub async fn retry_or_dead_letter(&self, queue: &str, msg: QueueMessage) {
        let state = self.state(queue).await;
        state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if msg.receive_count >= self.max_receive_count {
            warn!(
                queue,
                message_id = %msg.id,
                receive_count = msg.receive_count,
                "receive count exhausted, moving message to dead letter store"
            );
            state.dead.lock().await.push(msg);
            return;
        }

        let delay = self.backoff.calculate_delay(msg.receive_count);
        debug!(queue, message_id = %msg.id, ?delay, "requeueing failed message");
        if delay.is_zero() {
            state.push(msg).await;
        } else {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                state.push(msg).await;
            });
        }
    }

    /// Queued plus in-flight messages
    pub async fn pending(&self, queue: &str) -> usize {
        let state = self.state(queue).await;
        let queued = state.messages.lock().await.len();
        queued + state.in_flight.load(Ordering::SeqCst)
    }

    pub async fn is_idle(&self, queue: &str) -> bool {
        self.pending(queue).await == 0
    }

    /// Process messages serially until the queue is empty.
    ///
    /// Messages published while draining (next pages, immediate retries)
    /// are drained too. Returns how many deliveries were handled.
    pub async fn drain<H: MessageHandler + ?Sized>(&self, queue: &str, handler: &H) -> usize {
        let mut processed = 0;
        while let Some(msg) = self.receive(queue).await {
            processed += 1;
            match handler.handle(msg.body.clone()).await {
                Ok(()) => self.ack(queue).await,
                Err(error) => {
                    warn!(queue, message_id = %msg.id, %error, "handler failed");
                    self.retry_or_dead_letter(queue, msg).await;
                }
            }
        }
        processed
    }

    // ---- dead letter administration ----

    pub async fn dead_letter_count(&self, queue: &str) -> usize {
        self.state(queue).await.dead.lock().await.len()
    }

    pub async fn dead_letters(&self, queue: &str) -> Vec<QueueMessage> {
        self.state(queue).await.dead.lock().await.clone()
    }

    /// Drop all dead letters, returning how many were purged
    pub async fn purge_dead_letters(&self, queue: &str) -> usize {
        let state = self.state(queue).await;
        let mut dead = state.dead.lock().await;
        let purged = dead.len();
        dead.clear();
        purged
    }

    /// Move dead letters back onto the queue with a fresh receive count
    pub async fn redrive_dead_letters(&self, queue: &str) -> usize {
        let state = self.state(queue).await;
        let drained: Vec<QueueMessage> = state.dead.lock().await.drain(..).collect();
        let redriven = drained.len();
        for mut msg in drained {
            msg.receive_count = 0;
            state.push(msg).await;
        }
        redriven
    }

    /// Publish straight to the dead-letter store (dispatcher exhaustion)
    pub async fn dead_letter(&self, queue: &str, body: &impl Serialize) -> Result<(), BrokerError> {
        let msg = QueueMessage::new(serde_json::to_value(body)?);
        warn!(queue, message_id = %msg.id, "dead-lettering message");
        self.state(queue).await.dead.lock().await.push(msg);
        Ok(())
    }
}
