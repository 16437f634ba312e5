//! The Courier auth service.
//!
//! Register/login/profile operations exposed over the bus on the
//! `auth.request` topic. Business logic lives behind the [`UserStore`]
//! seam; the service itself only knows envelopes in, envelopes out.

pub mod handlers;
pub mod password;
pub mod service;
pub mod store;

pub use handlers::AuthService;
pub use service::endpoint;
pub use store::{MemoryStore, PresenceStatus, StoreError, User, UserStore};
