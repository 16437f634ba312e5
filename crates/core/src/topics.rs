//! Well-known bus topic name constants.
//!
//! One request topic per backend service, plus the two broadcast topics
//! used by the real-time relay. These must match the topics the service
//! endpoints subscribe to — they are the addressing scheme of the whole
//! system, so they live in one place.

/// Request topic for the auth service (register, login, profile).
pub const AUTH_REQUEST: &str = "auth.request";

/// Request topic for the message service.
pub const MESSAGE_REQUEST: &str = "message.request";

/// Broadcast topic carrying new-message events toward live connections.
pub const MESSAGE_NEW: &str = "message.new";

/// Outbound topic where the gateway republishes messages sent by
/// connected clients, for backend workers to consume.
pub const MESSAGE_SEND: &str = "message.send";
