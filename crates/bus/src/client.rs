//! The bus client capability.
//!
//! [`BusClient`] is the seam between Courier and the message bus: fire and
//! forget publishing, topic subscriptions, and a correlated request/reply
//! primitive with a caller-supplied deadline. Components receive it as an
//! `Arc<dyn BusClient>` — never through process-wide state — so a test can
//! hand them a bus of its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot, Mutex};
use uuid::Uuid;

/// Errors surfaced by bus operations.
///
/// None of these ever cross the bus itself; callers normalize them into a
/// reply envelope (or a connection rejection) before anything leaves the
/// component that saw the failure.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus request timed out after {0:?}")]
    Timeout(Duration),

    #[error("no subscribers on topic {0}")]
    NoResponders(String),

    #[error("bus connection closed")]
    Closed,
}

/// Map of outstanding correlation tokens to their waiting callers.
///
/// One entry per in-flight `request`; removed by the first reply or by
/// timeout, whichever comes first. At most one reply is ever delivered per
/// token — a second reply finds no entry and is discarded.
pub(crate) type PendingReplies = Arc<Mutex<HashMap<Uuid, oneshot::Sender<Vec<u8>>>>>;

/// The reply handle attached to a delivery that expects an answer.
///
/// Consuming `reply` makes the at-most-one contract structural: a handle
/// answers once, and a duplicate (cloned handle, or bus misbehavior) finds
/// its correlation entry already gone.
#[derive(Debug, Clone)]
pub struct Replier {
    token: Uuid,
    pending: PendingReplies,
}

impl Replier {
    pub(crate) fn new(token: Uuid, pending: PendingReplies) -> Self {
        Self { token, pending }
    }

    /// Deliver the reply for this correlation token.
    ///
    /// If the token is no longer pending — already answered, or the caller
    /// timed out — the payload is discarded.
    pub async fn reply(self, payload: Vec<u8>) {
        match self.pending.lock().await.remove(&self.token) {
            Some(waiting) => {
                // A send error means the caller stopped waiting; the
                // payload just drops.
                let _ = waiting.send(payload);
            }
            None => {
                tracing::debug!(token = %self.token, "discarding duplicate or expired reply");
            }
        }
    }
}

/// One message received from a subscription.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Vec<u8>,
    /// Present when the publisher is waiting on a correlated reply.
    pub replier: Option<Replier>,
}

/// A live subscription to one topic.
///
/// Messages on the same topic may be handled concurrently by the consumer;
/// the subscription itself imposes no ordering beyond arrival order.
pub struct Subscription {
    topic: String,
    rx: broadcast::Receiver<Delivery>,
}

impl Subscription {
    pub(crate) fn new(topic: String, rx: broadcast::Receiver<Delivery>) -> Self {
        Self { topic, rx }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next delivery, or `None` once the bus side is closed.
    ///
    /// A lagged consumer skips the overwritten messages and keeps going;
    /// the gap is logged, not fatal.
    pub async fn next(&mut self) -> Option<Delivery> {
        loop {
            match self.rx.recv().await {
                Ok(delivery) => return Some(delivery),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(topic = %self.topic, skipped, "bus subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// The message-bus capability.
///
/// Implementations own topic storage and the pending-correlation table;
/// consumers only see these three operations.
#[async_trait]
pub trait BusClient: Send + Sync + 'static {
    /// Publish a payload to a topic. Nobody listening is not an error —
    /// the message is simply dropped.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError>;

    /// Subscribe to a topic, receiving every message published after this
    /// call returns.
    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError>;

    /// Publish a payload and wait for the single correlated reply.
    ///
    /// Resolves with the reply, or [`BusError::Timeout`] once `timeout`
    /// elapses. Resources tied to the exchange are released no later than
    /// the deadline, whether or not the caller is still waiting.
    async fn request(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError>;
}
