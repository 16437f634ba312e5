//! Authenticated WebSocket upgrade handler.
//!
//! The credential token travels in the handshake query string and is
//! verified before the upgrade completes: a connection that fails
//! verification is rejected with 401 while it is still plain HTTP — it
//! never holds an identity, joins a group, or touches a subscription.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;

use courier_core::{token, topics, BroadcastEvent, CoreError};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Handshake query parameters: `/ws?token=<jwt>`.
#[derive(Debug, Deserialize)]
pub struct HandshakeQuery {
    token: Option<String>,
}

/// HTTP handler that authenticates and upgrades the connection.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HandshakeQuery>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let Some(token) = query.token else {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Missing credential token".into(),
        )));
    };

    let claims = token::verify(&token, &state.config.token).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;

    let identity = claims.sub;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, identity, state)))
}

/// Manage a single authenticated connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Joins the connection to its identity's delivery group.
///   2. Spawns a sender task forwarding group messages to the sink.
///   3. Processes inbound frames on the current task, republishing client
///      messages onto the outbound bus topic.
///   4. Leaves the group on disconnect.
async fn handle_socket(socket: WebSocket, identity: String, state: AppState) {
    let conn_id = Uuid::new_v4();
    tracing::info!(%conn_id, identity = %identity, "WebSocket connected");

    let mut rx = state.groups.join(&identity, conn_id).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id;
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                publish_outbound(&state, &identity, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(%conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    state.groups.leave(&identity, conn_id).await;
    send_task.abort();
    tracing::info!(%conn_id, identity = %identity, "WebSocket disconnected");
}

/// Republish one client message onto the outbound topic for workers.
///
/// The sender is the connection's verified identity, unconditionally: a
/// connection may never assert a sender other than its own, so whatever
/// the client put there is overwritten. No worker acknowledgment is
/// awaited.
async fn publish_outbound(state: &AppState, identity: &str, raw: &str) {
    let mut event: BroadcastEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(identity, error = %e, "ignoring malformed client message");
            return;
        }
    };
    event.sender_id = Some(identity.to_string());

    let payload = match serde_json::to_vec(&event) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode outbound event");
            return;
        }
    };

    if let Err(e) = state.bus.publish(topics::MESSAGE_SEND, payload).await {
        tracing::warn!(error = %e, "failed to publish outbound event");
    }
}
