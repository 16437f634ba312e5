//! Identity-addressed delivery groups.
//!
//! A group is the set of live connections sharing one authenticated
//! identity; it is the addressing unit for broadcast delivery, so two
//! devices logged in as the same user both receive everything addressed
//! to that user. Membership is mutated by connect/disconnect and read by
//! the relay's fan-out; a `tokio::sync::RwLock` serializes the two.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use courier_core::types::{Identity, Timestamp};

/// Channel sender half for pushing messages to one connection.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// One group member.
struct Member {
    /// Outbound channel to the connection's socket task. Unbounded, so
    /// fan-out to a slow consumer never blocks the relay loop.
    sender: ConnectionSender,
    /// When this connection was established.
    connected_at: Timestamp,
}

/// All delivery groups of one gateway instance.
///
/// Designed to be wrapped in `Arc` and shared between the upgrade handler
/// (joins/leaves) and the relay (sends). Connections that never finished
/// authentication are never registered here, so there is nothing to clean
/// up for them.
pub struct GroupRegistry {
    groups: RwLock<HashMap<Identity, HashMap<Uuid, Member>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Join a connection to its identity's group.
    ///
    /// Returns the receiver half of the connection's message channel so
    /// the caller can forward messages to the socket sink.
    pub async fn join(&self, identity: &str, conn_id: Uuid) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let member = Member {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.groups
            .write()
            .await
            .entry(identity.to_string())
            .or_default()
            .insert(conn_id, member);
        rx
    }

    /// Remove a connection from its group, dropping the group once its
    /// last local member is gone.
    pub async fn leave(&self, identity: &str, conn_id: Uuid) {
        let mut groups = self.groups.write().await;
        let Some(members) = groups.get_mut(identity) else {
            return;
        };
        if let Some(member) = members.remove(&conn_id) {
            let connected_for = chrono::Utc::now() - member.connected_at;
            tracing::debug!(
                identity,
                %conn_id,
                connected_secs = connected_for.num_seconds(),
                "connection left group"
            );
        }
        if members.is_empty() {
            groups.remove(identity);
        }
    }

    /// Send a message to every member of one identity's group.
    ///
    /// Returns the number of connections the message was sent to; zero
    /// when the identity has no local members. Closed channels are
    /// silently skipped — their sockets are mid-teardown.
    pub async fn send_to_group(&self, identity: &str, message: Message) -> usize {
        let groups = self.groups.read().await;
        let Some(members) = groups.get(identity) else {
            return 0;
        };
        let mut delivered = 0;
        for member in members.values() {
            if member.sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of live connections for one identity.
    pub async fn group_size(&self, identity: &str) -> usize {
        self.groups
            .read()
            .await
            .get(identity)
            .map_or(0, HashMap::len)
    }

    /// Total live connections across all groups.
    pub async fn connection_count(&self) -> usize {
        self.groups.read().await.values().map(HashMap::len).sum()
    }

    /// Send a Ping frame to every connected client.
    pub async fn ping_all(&self) {
        let groups = self.groups.read().await;
        for members in groups.values() {
            for member in members.values() {
                let _ = member.sender.send(Message::Ping(Bytes::new()));
            }
        }
    }

    /// Send a Close frame to every connection, then clear all groups.
    ///
    /// Used during graceful shutdown to notify clients before the server
    /// stops accepting connections.
    pub async fn shutdown_all(&self) {
        let mut groups = self.groups.write().await;
        let count: usize = groups.values().map(HashMap::len).sum();
        for members in groups.values() {
            for member in members.values() {
                let _ = member.sender.send(Message::Close(None));
            }
        }
        groups.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
