//! Integration tests for the broadcast relay.
//!
//! These drive the relay through the bus directly: join identities to the
//! group registry, publish broadcast events, and observe what each
//! connection's channel receives.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use courier_bus::{BusClient, MemoryBus};
use courier_core::topics;
use courier_gateway::ws::{GroupRegistry, Relay};

/// How long to wait before declaring that nothing was delivered.
const QUIET: Duration = Duration::from_millis(100);

async fn start_relay(bus: &Arc<MemoryBus>, groups: Arc<GroupRegistry>) -> CancellationToken {
    let cancel = CancellationToken::new();
    let relay = Relay::bind(bus.as_ref(), groups)
        .await
        .expect("relay should bind");
    tokio::spawn(relay.run(cancel.clone()));
    cancel
}

async fn publish_event(bus: &MemoryBus, event: serde_json::Value) {
    bus.publish(topics::MESSAGE_NEW, event.to_string().into_bytes())
        .await
        .expect("publish should succeed");
}

/// Receive one Text frame as JSON, or panic after a short deadline.
async fn recv_json(rx: &mut UnboundedReceiver<Message>) -> serde_json::Value {
    let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("expected a delivery")
        .expect("channel should stay open");
    match message {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("delivery is JSON"),
        other => panic!("expected a Text frame, got: {other:?}"),
    }
}

/// Assert that nothing arrives on the channel for a little while.
async fn assert_quiet(rx: &mut UnboundedReceiver<Message>) {
    let outcome = tokio::time::timeout(QUIET, rx.recv()).await;
    assert!(outcome.is_err(), "expected no delivery, got: {outcome:?}");
}

// ---------------------------------------------------------------------------
// Test: delivery iff the connection's identity is sender or recipient
// ---------------------------------------------------------------------------

#[tokio::test]
async fn event_reaches_sender_and_recipient_groups_only() {
    let bus = Arc::new(MemoryBus::new());
    let groups = Arc::new(GroupRegistry::new());
    let _cancel = start_relay(&bus, Arc::clone(&groups)).await;

    let mut rx_sender = groups.join("u1", Uuid::new_v4()).await;
    let mut rx_recipient = groups.join("u2", Uuid::new_v4()).await;
    let mut rx_bystander = groups.join("u3", Uuid::new_v4()).await;

    publish_event(&bus, json!({"senderId": "u1", "recipientId": "u2", "text": "hi"})).await;

    let seen_by_recipient = recv_json(&mut rx_recipient).await;
    assert_eq!(seen_by_recipient["text"], "hi");

    // Self-echo: the sender's group receives its own outbound event.
    let seen_by_sender = recv_json(&mut rx_sender).await;
    assert_eq!(seen_by_sender["senderId"], "u1");

    assert_quiet(&mut rx_bystander).await;
}

// ---------------------------------------------------------------------------
// Test: multi-device fan-out within one identity's group
// ---------------------------------------------------------------------------

#[tokio::test]
async fn both_devices_of_one_identity_receive_the_event() {
    let bus = Arc::new(MemoryBus::new());
    let groups = Arc::new(GroupRegistry::new());
    let _cancel = start_relay(&bus, Arc::clone(&groups)).await;

    let mut rx_phone = groups.join("u2", Uuid::new_v4()).await;
    let mut rx_laptop = groups.join("u2", Uuid::new_v4()).await;

    publish_event(&bus, json!({"senderId": "u1", "recipientId": "u2", "text": "hi"})).await;

    assert_eq!(recv_json(&mut rx_phone).await["text"], "hi");
    assert_eq!(recv_json(&mut rx_laptop).await["text"], "hi");
}

// ---------------------------------------------------------------------------
// Test: a self-message is delivered once, not twice
// ---------------------------------------------------------------------------

#[tokio::test]
async fn self_message_is_delivered_once() {
    let bus = Arc::new(MemoryBus::new());
    let groups = Arc::new(GroupRegistry::new());
    let _cancel = start_relay(&bus, Arc::clone(&groups)).await;

    let mut rx = groups.join("u1", Uuid::new_v4()).await;

    publish_event(&bus, json!({"senderId": "u1", "recipientId": "u1", "note": "self"})).await;

    assert_eq!(recv_json(&mut rx).await["note"], "self");
    assert_quiet(&mut rx).await;
}

// ---------------------------------------------------------------------------
// Test: events with no local members are dropped without effect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn event_for_absent_groups_is_dropped_locally() {
    let bus = Arc::new(MemoryBus::new());
    let groups = Arc::new(GroupRegistry::new());
    let _cancel = start_relay(&bus, Arc::clone(&groups)).await;

    let mut rx = groups.join("u1", Uuid::new_v4()).await;

    // Neither u8 nor u9 has local members; the relay drops the event and
    // keeps serving.
    publish_event(&bus, json!({"senderId": "u8", "recipientId": "u9"})).await;
    publish_event(&bus, json!({"senderId": "u2", "recipientId": "u1", "text": "after"})).await;

    assert_eq!(recv_json(&mut rx).await["text"], "after");
}

// ---------------------------------------------------------------------------
// Test: a malformed broadcast event does not stall the relay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_event_is_skipped() {
    let bus = Arc::new(MemoryBus::new());
    let groups = Arc::new(GroupRegistry::new());
    let _cancel = start_relay(&bus, Arc::clone(&groups)).await;

    let mut rx = groups.join("u1", Uuid::new_v4()).await;

    bus.publish(topics::MESSAGE_NEW, b"not json".to_vec())
        .await
        .expect("publish should succeed");
    publish_event(&bus, json!({"senderId": "u2", "recipientId": "u1", "text": "ok"})).await;

    assert_eq!(recv_json(&mut rx).await["text"], "ok");
}

// ---------------------------------------------------------------------------
// Test: after leaving, a connection receives nothing further
// ---------------------------------------------------------------------------

#[tokio::test]
async fn departed_connection_receives_nothing() {
    let bus = Arc::new(MemoryBus::new());
    let groups = Arc::new(GroupRegistry::new());
    let _cancel = start_relay(&bus, Arc::clone(&groups)).await;

    let conn = Uuid::new_v4();
    let mut rx = groups.join("u1", conn).await;
    groups.leave("u1", conn).await;

    publish_event(&bus, json!({"senderId": "u2", "recipientId": "u1"})).await;

    assert_quiet(&mut rx).await;
}
