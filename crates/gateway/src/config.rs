use std::time::Duration;

use courier_core::token::TokenConfig;

/// Default bus request/reply deadline in milliseconds.
///
/// This bounds every bridged round trip; it is a configuration constant,
/// never negotiated per call.
pub const DEFAULT_BUS_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Gateway configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Deadline for one bus request/reply round trip (default: 5000 ms).
    pub bus_request_timeout: Duration,
    /// Credential verification configuration (secret, expiry).
    pub token: TokenConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default   |
    /// |--------------------------|-----------|
    /// | `HOST`                   | `0.0.0.0` |
    /// | `PORT`                   | `3000`    |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`      |
    /// | `BUS_REQUEST_TIMEOUT_MS` | `5000`    |
    ///
    /// JWT settings come from [`TokenConfig::from_env`], which panics if
    /// `JWT_SECRET` is missing.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let bus_request_timeout_ms: u64 = std::env::var("BUS_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_BUS_REQUEST_TIMEOUT_MS.to_string())
            .parse()
            .expect("BUS_REQUEST_TIMEOUT_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            bus_request_timeout: Duration::from_millis(bus_request_timeout_ms),
            token: TokenConfig::from_env(),
        }
    }
}
