//! Request and reply envelopes for bus-mediated RPC.
//!
//! The gateway serializes a [`RequestEnvelope`] for every inbound HTTP call
//! it forwards over the bus; the owning service endpoint decodes it,
//! dispatches on `(method, path)`, and answers with a [`ReplyEnvelope`].
//! Field names on the wire are camelCase.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// HTTP-style method carried inside a request envelope.
///
/// Dispatch is by exact `(Verb, path)` pair; no pattern matching happens
/// beyond that, so the enum only covers the methods services register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

impl FromStr for Verb {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Verb::Get),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            "DELETE" => Ok(Verb::Delete),
            other => Err(CoreError::Validation(format!("Unsupported method: {other}"))),
        }
    }
}

/// A single forwarded request.
///
/// Constructed once per inbound call by the request bridge and consumed by
/// exactly one service endpoint. `path` is already stripped of the
/// gateway's mount prefix (`/auth/login` arrives as `/login`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub method: Verb,
    pub path: String,
    /// Request body, opaque to everything but the target handler.
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub query: HashMap<String, String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// Verified caller identity, when the caller presented a valid
    /// credential. Absent means anonymous.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RequestEnvelope {
    /// Build an envelope with just a method, path, and body — the common
    /// case for service-to-service calls and tests.
    pub fn new(method: Verb, path: impl Into<String>, body: Value) -> Self {
        Self {
            method,
            path: path.into(),
            body,
            query: HashMap::new(),
            params: HashMap::new(),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// The answer to one [`RequestEnvelope`].
///
/// `status` follows HTTP status semantics even though no HTTP transport is
/// involved on the bus; the bridge maps it straight onto the outbound
/// response, and `data` is reproduced verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub status: u16,
    #[serde(default)]
    pub data: Value,
}

impl ReplyEnvelope {
    pub fn ok(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    /// An error reply whose body is `{"error": <description>}`.
    pub fn error(status: u16, description: &str) -> Self {
        Self {
            status,
            data: serde_json::json!({ "error": description }),
        }
    }

    /// The reply for an unregistered `(verb, path)` pair.
    pub fn not_found() -> Self {
        Self::error(404, "Not found")
    }

    /// The generic failure reply. Internal detail never rides on this —
    /// the true cause is logged where it happened.
    pub fn internal_error() -> Self {
        Self::error(500, "Internal server error")
    }
}
