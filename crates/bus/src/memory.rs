//! In-process bus backed by `tokio::sync::broadcast` channels.
//!
//! [`MemoryBus`] is the broker used when the gateway and its backend
//! services run in one process, and the substitute bus in tests. One
//! broadcast channel per topic; request/reply rides on the same channels
//! with a pending-correlation table keyed by generated UUID tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use uuid::Uuid;

use crate::client::{BusClient, BusError, Delivery, PendingReplies, Replier, Subscription};

/// Default buffer capacity per topic channel.
///
/// When a topic's buffer is full the oldest un-consumed messages are
/// dropped and slow subscribers observe a lag, not a stall.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process message bus.
///
/// Cheap to share: wrap it in an `Arc` (or use it as `Arc<dyn BusClient>`)
/// and hand clones to every component that needs bus access.
pub struct MemoryBus {
    topics: RwLock<HashMap<String, broadcast::Sender<Delivery>>>,
    pending: PendingReplies,
    capacity: usize,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            pending: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Get or create the broadcast sender for a topic.
    async fn sender(&self, topic: &str) -> broadcast::Sender<Delivery> {
        if let Some(tx) = self.topics.read().await.get(topic) {
            return tx.clone();
        }
        let mut topics = self.topics.write().await;
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    #[cfg(test)]
    async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusClient for MemoryBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        let tx = self.sender(topic).await;
        // A send error only means there are zero subscribers right now.
        let _ = tx.send(Delivery {
            payload,
            replier: None,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<Subscription, BusError> {
        let tx = self.sender(topic).await;
        Ok(Subscription::new(topic.to_string(), tx.subscribe()))
    }

    async fn request(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, BusError> {
        let token = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(token, reply_tx);

        let delivery = Delivery {
            payload,
            replier: Some(Replier::new(token, Arc::clone(&self.pending))),
        };

        let tx = self.sender(topic).await;
        if tx.send(delivery).is_err() {
            // Nobody can ever answer; fail now instead of eating the
            // whole deadline.
            self.pending.lock().await.remove(&token);
            return Err(BusError::NoResponders(topic.to_string()));
        }

        // Janitor: whatever happens to the caller (including its future
        // being dropped mid-wait), the correlation entry is gone by the
        // deadline.
        let pending = Arc::clone(&self.pending);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if pending.lock().await.remove(&token).is_some() {
                tracing::trace!(%token, "expired pending correlation entry");
            }
        });

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(reply)) => Ok(reply),
            // Sender dropped without a send: the bus itself went away.
            Ok(Err(_)) => Err(BusError::Closed),
            Err(_) => {
                self.pending.lock().await.remove(&token);
                Err(BusError::Timeout(timeout))
            }
        }
    }
}
