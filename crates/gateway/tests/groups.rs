//! Unit tests for `GroupRegistry`.
//!
//! These exercise the delivery-group table directly, without any HTTP
//! upgrades: join/leave semantics, group-addressed sends, and graceful
//! shutdown behaviour.

use axum::extract::ws::Message;
use uuid::Uuid;

use courier_gateway::ws::GroupRegistry;

// ---------------------------------------------------------------------------
// Test: new registry starts empty
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_registry_has_zero_connections() {
    let groups = GroupRegistry::new();

    assert_eq!(groups.connection_count().await, 0);
    assert_eq!(groups.group_size("u1").await, 0);
}

// ---------------------------------------------------------------------------
// Test: join and leave update group membership
// ---------------------------------------------------------------------------

#[tokio::test]
async fn join_and_leave_update_membership() {
    let groups = GroupRegistry::new();
    let conn = Uuid::new_v4();

    let _rx = groups.join("u1", conn).await;
    assert_eq!(groups.group_size("u1").await, 1);
    assert_eq!(groups.connection_count().await, 1);

    groups.leave("u1", conn).await;
    assert_eq!(groups.group_size("u1").await, 0);
    assert_eq!(groups.connection_count().await, 0);
}

// ---------------------------------------------------------------------------
// Test: leaving an unknown connection is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn leave_unknown_connection_is_noop() {
    let groups = GroupRegistry::new();
    let _rx = groups.join("u1", Uuid::new_v4()).await;

    groups.leave("u1", Uuid::new_v4()).await;
    groups.leave("ghost", Uuid::new_v4()).await;

    assert_eq!(groups.connection_count().await, 1);
}

// ---------------------------------------------------------------------------
// Test: group-addressed send reaches every member and only them
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_group_reaches_all_members_only() {
    let groups = GroupRegistry::new();
    let mut rx_a = groups.join("u1", Uuid::new_v4()).await;
    let mut rx_b = groups.join("u1", Uuid::new_v4()).await;
    let mut rx_other = groups.join("u2", Uuid::new_v4()).await;

    let delivered = groups
        .send_to_group("u1", Message::Text("hello".into()))
        .await;

    assert_eq!(delivered, 2, "both of u1's devices are addressed");
    assert!(matches!(rx_a.recv().await, Some(Message::Text(t)) if t == "hello"));
    assert!(matches!(rx_b.recv().await, Some(Message::Text(t)) if t == "hello"));
    assert!(
        rx_other.try_recv().is_err(),
        "another identity's group receives nothing"
    );
}

// ---------------------------------------------------------------------------
// Test: sending to an absent group delivers to nobody
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_to_absent_group_delivers_zero() {
    let groups = GroupRegistry::new();

    let delivered = groups
        .send_to_group("nobody", Message::Text("hello".into()))
        .await;

    assert_eq!(delivered, 0);
}

// ---------------------------------------------------------------------------
// Test: a closed channel is skipped without poisoning the group
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_channel_is_skipped() {
    let groups = GroupRegistry::new();
    let rx_gone = groups.join("u1", Uuid::new_v4()).await;
    let mut rx_live = groups.join("u1", Uuid::new_v4()).await;

    drop(rx_gone);

    let delivered = groups
        .send_to_group("u1", Message::Text("still alive".into()))
        .await;

    assert_eq!(delivered, 1);
    assert!(matches!(rx_live.recv().await, Some(Message::Text(t)) if t == "still alive"));
}

// ---------------------------------------------------------------------------
// Test: shutdown_all sends Close and clears every group
// ---------------------------------------------------------------------------

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let groups = GroupRegistry::new();
    let mut rx1 = groups.join("u1", Uuid::new_v4()).await;
    let mut rx2 = groups.join("u2", Uuid::new_v4()).await;

    groups.shutdown_all().await;

    assert_eq!(groups.connection_count().await, 0);
    assert!(matches!(rx1.recv().await, Some(Message::Close(None))));
    assert!(matches!(rx2.recv().await, Some(Message::Close(None))));
    assert!(
        rx1.recv().await.is_none(),
        "channel should be closed after shutdown"
    );
}
