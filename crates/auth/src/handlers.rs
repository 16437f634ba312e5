//! Auth business handlers: register, login, profile.
//!
//! Each handler takes the decoded request and produces a [`ReplyEnvelope`]
//! whose status follows HTTP semantics. Business outcomes (duplicate
//! account, bad credentials) are envelope statuses; `Err` is reserved for
//! unexpected failure and becomes a generic 500 at the endpoint boundary.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use courier_core::token::{self, TokenConfig};
use courier_core::{CoreError, ReplyEnvelope, RequestEnvelope};

use crate::password::{hash_password, verify_password};
use crate::store::{PresenceStatus, StoreError, User, UserStore};

/// Request body for `POST /register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, message = "Username must be at least 3 characters"))]
    pub username: String,
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Request body for `POST /login`. Either credential identifies the
/// account.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

/// The auth service's business logic, behind the [`UserStore`] seam.
pub struct AuthService {
    store: Arc<dyn UserStore>,
    tokens: TokenConfig,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, tokens: TokenConfig) -> Self {
        Self { store, tokens }
    }

    /// POST /register
    ///
    /// Create an account and hand back a signed token plus the public
    /// profile. Duplicate username or email is a 400 with no token.
    pub async fn register(&self, body: Value) -> Result<ReplyEnvelope, CoreError> {
        let input: RegisterRequest = match serde_json::from_value(body) {
            Ok(input) => input,
            Err(_) => return Ok(ReplyEnvelope::error(400, "Invalid registration payload")),
        };
        if let Err(errors) = input.validate() {
            return Ok(ReplyEnvelope::error(400, &first_validation_message(&errors)));
        }

        let password_hash = hash_password(&input.password)
            .map_err(|e| CoreError::Internal(format!("password hashing failed: {e}")))?;
        let user = User::new(input.username, input.email, password_hash);

        match self.store.insert(user.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate) => {
                return Ok(ReplyEnvelope::error(400, "Email or username already in use"));
            }
            Err(e) => return Err(CoreError::Internal(e.to_string())),
        }

        let token = self.issue_token(&user.id)?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");

        Ok(ReplyEnvelope::ok(
            201,
            json!({
                "message": "User registered successfully",
                "token": token,
                "user": {
                    "id": user.id,
                    "username": user.username,
                    "email": user.email,
                    "avatar": user.avatar,
                },
            }),
        ))
    }

    /// POST /login
    ///
    /// Verify credentials, flip presence to online, return a fresh token.
    pub async fn login(&self, body: Value) -> Result<ReplyEnvelope, CoreError> {
        let input: LoginRequest = match serde_json::from_value(body) {
            Ok(input) => input,
            Err(_) => return Ok(ReplyEnvelope::error(400, "Invalid login payload")),
        };

        let user = self
            .store
            .find_by_login(input.username.as_deref(), input.email.as_deref())
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        let Some(user) = user else {
            return Ok(ReplyEnvelope::error(404, "User not found"));
        };

        let password_valid = verify_password(&input.password, &user.password_hash)
            .map_err(|e| CoreError::Internal(format!("password verification failed: {e}")))?;
        if !password_valid {
            return Ok(ReplyEnvelope::error(401, "Invalid credentials"));
        }

        self.store
            .set_status(&user.id, PresenceStatus::Online)
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))?;

        let token = self.issue_token(&user.id)?;
        tracing::info!(user_id = %user.id, "user logged in");

        Ok(ReplyEnvelope::ok(
            200,
            json!({
                "message": "Login successful",
                "token": token,
                "user": {
                    "id": user.id,
                    "username": user.username,
                    "email": user.email,
                    "avatar": user.avatar,
                    "status": PresenceStatus::Online,
                },
            }),
        ))
    }

    /// GET /me
    ///
    /// Return the caller's own profile. The identity comes from the
    /// envelope's verified `userId`; a request with no identity is an
    /// authentication failure, never treated as anonymous.
    pub async fn profile(&self, envelope: RequestEnvelope) -> Result<ReplyEnvelope, CoreError> {
        let Some(user_id) = envelope.user_id else {
            return Ok(ReplyEnvelope::error(401, "Authentication required"));
        };

        let user = self
            .store
            .find_by_id(&user_id)
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))?;
        let Some(user) = user else {
            return Ok(ReplyEnvelope::error(404, "User not found"));
        };

        Ok(ReplyEnvelope::ok(
            200,
            json!({
                "user": {
                    "id": user.id,
                    "username": user.username,
                    "email": user.email,
                    "avatar": user.avatar,
                    "status": user.status,
                },
            }),
        ))
    }

    fn issue_token(&self, user_id: &str) -> Result<String, CoreError> {
        token::issue(user_id, &self.tokens)
            .map_err(|e| CoreError::Internal(format!("token issuing failed: {e}")))
    }
}

/// Flatten a `validator` error set into its first human-readable message.
fn first_validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|field| field.iter())
        .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| "Invalid registration payload".to_string())
}
