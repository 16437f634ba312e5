//! The broadcast relay: one bus subscription, many connections.
//!
//! Each gateway instance holds a single subscription to the broadcast
//! topic — not one per connection — and fans every event out to the local
//! groups it addresses. Events addressing only identities with no local
//! members are dropped here; other gateway instances' subscriptions serve
//! their own connections.

use std::sync::Arc;

use axum::extract::ws::Message;
use tokio_util::sync::CancellationToken;

use courier_bus::{BusClient, BusError, Delivery, Subscription};
use courier_core::{topics, BroadcastEvent};

use crate::ws::groups::GroupRegistry;

/// The per-instance broadcast consumer.
pub struct Relay {
    subscription: Subscription,
    groups: Arc<GroupRegistry>,
}

impl Relay {
    /// Subscribe to the broadcast topic.
    ///
    /// The subscription exists once this returns, so events published
    /// after `bind` are seen even if `run` is spawned a beat later.
    pub async fn bind(bus: &dyn BusClient, groups: Arc<GroupRegistry>) -> Result<Self, BusError> {
        let subscription = bus.subscribe(topics::MESSAGE_NEW).await?;
        tracing::info!(topic = topics::MESSAGE_NEW, "event relay subscribed");
        Ok(Self {
            subscription,
            groups,
        })
    }

    /// Run the delivery loop until cancelled or the bus closes.
    ///
    /// Delivery goes through each member's unbounded channel, so pushing
    /// one event to N local connections never blocks receipt of the next
    /// bus message.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("event relay shutting down");
                    break;
                }
                delivery = self.subscription.next() => match delivery {
                    Some(delivery) => self.deliver(delivery).await,
                    None => {
                        tracing::info!("bus closed, event relay stopping");
                        break;
                    }
                },
            }
        }
    }

    /// Fan one broadcast event out to the groups it addresses.
    ///
    /// A connection receives the event iff its identity is the sender or
    /// the recipient; the sender's own other devices get it too. A
    /// self-message addresses one group, so it is delivered once.
    async fn deliver(&self, delivery: Delivery) {
        let event: BroadcastEvent = match serde_json::from_slice(&delivery.payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed broadcast event");
                return;
            }
        };

        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, "failed to re-encode broadcast event");
                return;
            }
        };
        let message = Message::Text(text.into());

        for target in event.targets() {
            let delivered = self.groups.send_to_group(target, message.clone()).await;
            if delivered > 0 {
                tracing::debug!(identity = target, connections = delivered, "event delivered");
            }
        }
    }
}
