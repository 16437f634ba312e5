//! JWT issuing and verification for identity credentials.
//!
//! Tokens are HS256-signed JWTs carrying a [`Claims`] payload. The auth
//! service issues them; the gateway verifies them when resolving a caller
//! identity for forwarding and when admitting a WebSocket connection.
//! Verification checks signature and expiry; consumers treat the whole
//! thing as an opaque `token -> identity` function.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user's id.
    pub sub: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
}

/// Configuration for token issuing and verification.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Token lifetime in days (default: 7).
    pub expiry_days: i64,
}

/// Default token expiry in days.
const DEFAULT_EXPIRY_DAYS: i64 = 7;

impl TokenConfig {
    /// Build a config with the default expiry.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expiry_days: DEFAULT_EXPIRY_DAYS,
        }
    }

    /// Load token configuration from environment variables.
    ///
    /// | Env Var           | Required | Default |
    /// |-------------------|----------|---------|
    /// | `JWT_SECRET`      | **yes**  | --      |
    /// | `JWT_EXPIRY_DAYS` | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let expiry_days: i64 = std::env::var("JWT_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            expiry_days,
        }
    }
}

/// Issue a signed token for the given user id.
pub fn issue(
    user_id: &str,
    config: &TokenConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.expiry_days * 24 * 60 * 60,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify a token's signature and expiry, returning the embedded [`Claims`].
pub fn verify(
    token: &str,
    config: &TokenConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;
    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> TokenConfig {
        TokenConfig::new("test-secret-that-is-long-enough-for-hmac")
    }

    #[test]
    fn issue_and_verify_round_trip() {
        let config = test_config();
        let token = issue("user-42", &config).expect("issuing should succeed");

        let claims = verify(&token, &config).expect("verification should succeed");
        assert_eq!(claims.sub, "user-42");
        assert!(claims.exp > claims.iat);
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn expired_token_fails_verification() {
        let config = test_config();

        // Manually build an already-expired token, well past the default
        // 60-second leeway.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            iat: now - 600,
            exp: now - 300,
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("encoding should succeed");

        assert!(verify(&token, &config).is_err());
    }

    #[test]
    fn token_signed_with_different_secret_fails() {
        let token = issue("user-1", &TokenConfig::new("secret-alpha"))
            .expect("issuing should succeed");

        let result = verify(&token, &TokenConfig::new("secret-bravo"));
        assert!(result.is_err(), "wrong-secret token must fail");
    }

    #[test]
    fn garbage_token_fails() {
        assert!(verify("not-a-jwt", &test_config()).is_err());
    }
}
