//! WebSocket infrastructure for real-time delivery.
//!
//! - [`groups`] — identity-addressed delivery groups for live connections.
//! - [`handler`] — the authenticated HTTP upgrade handler.
//! - [`relay`] — the per-instance broadcast subscription that fans events
//!   out to local groups.
//! - [`heartbeat`] — periodic pings keeping connections alive.

pub mod groups;
mod handler;
mod heartbeat;
pub mod relay;

pub use groups::GroupRegistry;
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use relay::Relay;
