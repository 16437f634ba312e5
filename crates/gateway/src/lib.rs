//! Courier gateway library.
//!
//! The externally-facing process: HTTP calls are bridged onto the message
//! bus as correlated request/reply exchanges, and the bus's broadcast
//! stream is relayed to authenticated WebSocket connections. Exposed as a
//! library so integration tests and the binary entrypoint share the same
//! building blocks.

pub mod bridge;
pub mod config;
pub mod error;
pub mod identity;
pub mod routes;
pub mod state;
pub mod ws;
