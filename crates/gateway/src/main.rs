use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courier_auth::{AuthService, MemoryStore};
use courier_bus::{BusClient, MemoryBus};
use courier_gateway::config::GatewayConfig;
use courier_gateway::state::AppState;
use courier_gateway::{routes, ws};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier_gateway=debug,courier_bus=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = GatewayConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded gateway configuration");

    // --- Message bus ---
    // The in-process broker: every component receives it as a capability,
    // so swapping in an external broker is a wiring change here, not a
    // code change anywhere else.
    let bus: Arc<dyn BusClient> = Arc::new(MemoryBus::new());
    tracing::info!("Message bus created");

    // --- Auth service endpoint ---
    let auth_service = Arc::new(AuthService::new(
        Arc::new(MemoryStore::new()),
        config.token.clone(),
    ));
    let auth_endpoint = courier_auth::endpoint(bus.as_ref(), auth_service)
        .await
        .expect("Failed to bind auth service endpoint");
    let auth_handle = tokio::spawn(auth_endpoint.run());

    // --- Delivery groups + event relay ---
    let groups = Arc::new(ws::GroupRegistry::new());

    let relay_cancel = CancellationToken::new();
    let relay = ws::Relay::bind(bus.as_ref(), Arc::clone(&groups))
        .await
        .expect("Failed to bind event relay");
    let relay_handle = tokio::spawn(relay.run(relay_cancel.clone()));

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&groups));

    tracing::info!("Background services started (auth endpoint, event relay, heartbeat)");

    // --- App state + router ---
    let state = AppState {
        bus,
        config: Arc::new(config.clone()),
        groups: Arc::clone(&groups),
    };
    let app = routes::app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting gateway");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Gateway stopped accepting connections, cleaning up");

    relay_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), relay_handle).await;
    tracing::info!("Event relay stopped");

    let count = groups.connection_count().await;
    tracing::info!(count, "Closing remaining WebSocket connections");
    groups.shutdown_all().await;

    heartbeat_handle.abort();
    auth_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the gateway
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
