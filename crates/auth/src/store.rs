//! The user-record store seam.
//!
//! Persistence is an external collaborator: the handlers only see
//! [`UserStore`]. [`MemoryStore`] is the in-process implementation used by
//! the bundled deployment and by tests; a database-backed store slots in
//! behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use courier_core::types::Timestamp;

/// Presence of a user, mirrored into the profile payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
    Away,
}

/// A stored user record. `password_hash` never leaves the auth service.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    pub status: PresenceStatus,
    pub created_at: Timestamp,
}

impl User {
    /// Create a fresh record with a generated id, empty avatar, and
    /// offline presence.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            email,
            password_hash,
            avatar: String::new(),
            status: PresenceStatus::Offline,
            created_at: chrono::Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email or username already in use")]
    Duplicate,

    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// User-record operations the auth handlers need.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] when the
    /// username or email is already taken — the check and the insert are
    /// one atomic step, so concurrent registrations cannot both win.
    async fn insert(&self, user: User) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Find a user by username or email; either credential identifies the
    /// account.
    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError>;

    async fn set_status(&self, id: &str, status: PresenceStatus) -> Result<(), StoreError>;
}

/// In-memory store, keyed by user id.
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        let taken = users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(StoreError::Duplicate);
        }
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_login(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        let found = users.values().find(|u| {
            username.is_some_and(|name| u.username == name)
                || email.is_some_and(|mail| u.email == mail)
        });
        Ok(found.cloned())
    }

    async fn set_status(&self, id: &str, status: PresenceStatus) -> Result<(), StoreError> {
        if let Some(user) = self.users.write().await.get_mut(id) {
            user.status = status;
        }
        Ok(())
    }
}
