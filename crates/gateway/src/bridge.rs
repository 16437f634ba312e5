//! The request bridge: synchronous HTTP in, correlated bus exchange out.
//!
//! Each configured path prefix forwards to one request topic — a static
//! mapping decided at router construction, not a runtime branch. The
//! bridge produces exactly one response per inbound call, after at most
//! one bus round trip; timeouts and transport failures surface to the
//! caller only as a generic 500.

use std::collections::HashMap;
use std::str::FromStr;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::{json, Value};

use courier_core::{topics, ReplyEnvelope, RequestEnvelope, Verb};

use crate::identity::CallerIdentity;
use crate::state::AppState;

/// The forwarding route table: one wildcard route per backend service.
pub fn forward_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/{*rest}", any(forward_auth))
        .route("/messages/{*rest}", any(forward_messages))
}

async fn forward_auth(
    State(state): State<AppState>,
    method: Method,
    Path(rest): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    CallerIdentity(identity): CallerIdentity,
    body: Bytes,
) -> Response {
    forward(state, topics::AUTH_REQUEST, method, rest, query, identity, body).await
}

async fn forward_messages(
    State(state): State<AppState>,
    method: Method,
    Path(rest): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    CallerIdentity(identity): CallerIdentity,
    body: Bytes,
) -> Response {
    forward(
        state,
        topics::MESSAGE_REQUEST,
        method,
        rest,
        query,
        identity,
        body,
    )
    .await
}

/// Build the request envelope, run one bus exchange, map the reply.
async fn forward(
    state: AppState,
    topic: &'static str,
    method: Method,
    rest: String,
    query: HashMap<String, String>,
    identity: Option<String>,
    body: Bytes,
) -> Response {
    let Ok(verb) = Verb::from_str(method.as_str()) else {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({"error": "Method not allowed"})),
        )
            .into_response();
    };

    // An absent body forwards as an empty object, the same shape a JSON
    // body parser would hand the service.
    let body: Value = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": "Invalid JSON body"})),
                )
                    .into_response();
            }
        }
    };

    // The wildcard segment is the path the service sees; the mount prefix
    // never crosses the bus.
    let envelope = RequestEnvelope {
        method: verb,
        path: format!("/{rest}"),
        body,
        query,
        params: HashMap::new(),
        user_id: identity,
    };

    let payload = match serde_json::to_vec(&envelope) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "failed to encode request envelope");
            return internal_error();
        }
    };

    match state
        .bus
        .request(topic, payload, state.config.bus_request_timeout)
        .await
    {
        Ok(reply) => match serde_json::from_slice::<ReplyEnvelope>(&reply) {
            Ok(reply) => {
                let status = StatusCode::from_u16(reply.status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(reply.data)).into_response()
            }
            Err(e) => {
                tracing::error!(topic, error = %e, "malformed reply envelope");
                internal_error()
            }
        },
        Err(e) => {
            tracing::warn!(topic, error = %e, "bus request failed");
            internal_error()
        }
    }
}

/// The only failure shape a caller ever sees for bus-side problems.
fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Internal server error"})),
    )
        .into_response()
}
