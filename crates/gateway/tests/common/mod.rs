//! Shared test harness for gateway integration tests.
//!
//! Builds the application router the same way `main.rs` does, but against
//! a test-owned `MemoryBus` — the point of the bus being a passed-in
//! capability is exactly that tests can do this.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

use courier_bus::BusClient;
use courier_core::token::{self, TokenConfig};
use courier_gateway::config::GatewayConfig;
use courier_gateway::routes;
use courier_gateway::state::AppState;
use courier_gateway::ws::GroupRegistry;

/// Signing secret shared by the test token issuer and the gateway.
pub const TEST_SECRET: &str = "gateway-test-secret";

/// Build a test `GatewayConfig` with the reference 5000 ms bus deadline.
pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        bus_request_timeout: Duration::from_millis(5000),
        token: TokenConfig::new(TEST_SECRET),
    }
}

/// Build application state around a test-owned bus.
pub fn test_state(bus: Arc<dyn BusClient>) -> AppState {
    AppState {
        bus,
        config: Arc::new(test_config()),
        groups: Arc::new(GroupRegistry::new()),
    }
}

/// Build the full application router, mirroring `main.rs`, so tests
/// exercise the same middleware stack production uses.
pub fn build_test_app(state: AppState) -> Router {
    routes::app(state)
}

/// Issue a token the gateway will accept for the given user id.
pub fn auth_token(user_id: &str) -> String {
    token::issue(user_id, &TokenConfig::new(TEST_SECRET)).expect("token issuing should succeed")
}

/// Serve the app on an ephemeral local port, returning its address.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener has an address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });
    addr
}

/// Collect a response body as JSON.
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}
