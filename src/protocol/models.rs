//! Validation request/response structs and lenient response extraction.
//!
//! The response is extracted from a raw `serde_json::Value` rather than a
//! typed struct: the wire contract defaults missing or wrong-typed fields to
//! `false`/`0`/absent instead of rejecting the whole body, and the raw text
//! is needed anyway for canonical signature verification.

use serde::Serialize;
use serde_json::Value;

/// Request body for a single validation attempt.
///
/// Constructed fresh per attempt; immutable; never persisted. Field order
/// matters only for readability — the server canonicalizes its own response,
/// not the request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    /// The collaborator's license key.
    pub license_key: String,

    /// Plugin identifier; must match the server's registration.
    pub plugin_id: String,

    /// Stable local machine identifier.
    pub server_id: String,

    /// Optional static IP configured by the collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Optional username of the player that triggered the check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mc_username: Option<String>,
}

/// Parsed validation response (signature already stripped and checked).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResponse {
    /// License exists and matches the request.
    pub valid: bool,
    /// License is currently active.
    pub active: bool,
    /// License has expired server-side.
    pub expired: bool,
    /// Server-reported rejection reason.
    pub reason: Option<String>,
    /// Plan name, for logging.
    pub plan: Option<String>,
    /// How many servers this license is bound to.
    pub bound_servers: i64,
    /// How many IPs this license is bound to.
    pub bound_ips: i64,
}

impl ValidationResponse {
    /// Extract a response from parsed JSON, defaulting missing or
    /// wrong-typed fields rather than failing.
    pub fn from_value(value: &Value) -> Self {
        Self {
            valid: opt_bool(value, "valid"),
            active: opt_bool(value, "active"),
            expired: opt_bool(value, "expired"),
            reason: opt_string(value, "reason"),
            plan: opt_string(value, "plan"),
            bound_servers: opt_i64(value, "boundServers"),
            bound_ips: opt_i64(value, "boundIps"),
        }
    }

    /// Whether the license checks pass (`valid && active && !expired`).
    pub fn is_ok(&self) -> bool {
        self.valid && self.active && !self.expired
    }

    /// Rejection reason: server-supplied, or synthesized from the flags.
    pub fn rejection_reason(&self) -> String {
        match &self.reason {
            Some(reason) => reason.clone(),
            None if self.expired => "expired".to_string(),
            None => "invalid".to_string(),
        }
    }
}

/// Summary of a successful validation, carried for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseSummary {
    /// Plan name reported by the server.
    pub plan: Option<String>,
    /// Server-binding count.
    pub bound_servers: i64,
    /// IP-binding count.
    pub bound_ips: i64,
}

impl From<&ValidationResponse> for LicenseSummary {
    fn from(response: &ValidationResponse) -> Self {
        Self {
            plan: response.plan.clone(),
            bound_servers: response.bound_servers,
            bound_ips: response.bound_ips,
        }
    }
}

/// Classified result of one validation attempt.
///
/// All network, parsing, and policy failures are folded into these four
/// buckets; only `TransportFailure` is ever eligible for the grace-preserving
/// inline fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Signed, well-formed, and the license checks pass.
    Success(LicenseSummary),
    /// Hard rejection: bad key format, failed signature, or server says no.
    Rejected(String),
    /// DNS/connect/read failure, timeout, or non-2xx response.
    TransportFailure,
    /// Body was not parseable JSON.
    MalformedResponse,
}

fn opt_bool(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn opt_string(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

fn opt_i64(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}
