use std::sync::Arc;

use courier_bus::BusClient;

use crate::config::GatewayConfig;
use crate::ws::GroupRegistry;

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// The bus is an explicitly constructed capability, never process-wide
/// state — tests hand the gateway a bus of their own.
#[derive(Clone)]
pub struct AppState {
    /// Message-bus capability.
    pub bus: Arc<dyn BusClient>,
    /// Gateway configuration.
    pub config: Arc<GatewayConfig>,
    /// Identity-addressed delivery groups for live connections.
    pub groups: Arc<GroupRegistry>,
}
