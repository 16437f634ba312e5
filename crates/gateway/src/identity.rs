//! Caller-identity resolution for forwarded requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use courier_core::{token, CoreError};

use crate::error::AppError;
use crate::state::AppState;

/// The caller's verified identity, resolved from an `Authorization: Bearer`
/// header when one is present.
///
/// Absence of the header means an anonymous caller and is not an error —
/// the target service decides whether the operation needs an identity. A
/// header that is present but malformed, unsigned, or expired is rejected
/// with 401 here: authentication failure is never downgraded to anonymous.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Option<String>);

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get("authorization") else {
            return Ok(CallerIdentity(None));
        };

        let header = header.to_str().map_err(|_| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization header".into(),
            ))
        })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        let claims = token::verify(token, &state.config.token).map_err(|_| {
            AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
        })?;

        Ok(CallerIdentity(Some(claims.sub)))
    }
}
