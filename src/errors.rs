//! Gracelock error types.

use thiserror::Error;

/// Errors that can occur during license validation.
///
/// Every variant is recovered locally inside the validation pipeline and
/// folded into the state machine's success/failure transition; nothing here
/// propagates as an uncaught fault into the host add-on.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// License key does not match the expected `XXXX-XXXX-XXXX-XXXX-XXXX` form.
    #[error("Missing or malformed license key")]
    InvalidKeyFormat,

    /// The embedded public key block could not be decoded at startup.
    #[error("Ed25519 public key unavailable: {0}")]
    KeyUnavailable(String),

    /// Response signature verification failed.
    #[error("Response signature verification failed")]
    SignatureInvalid,

    /// Response body was not parseable JSON.
    #[error("Malformed validation response: {0}")]
    MalformedResponse(String),

    /// HTTP transport error communicating with the validation endpoint.
    /// Non-2xx responses are folded into this bucket as well.
    #[error("Validation transport error: {0}")]
    Transport(String),

    /// Well-formed, signed response whose license checks failed.
    #[error("License rejected: {reason}")]
    Rejected {
        /// Reason reported by the validation server (or synthesized locally).
        reason: String,
    },

    /// Identity file I/O failed; the core degrades to a synthesized id.
    #[error("Identity store I/O error: {0}")]
    IdentityIo(String),

    /// Collaborator settings file could not be read or parsed.
    #[error("Settings error: {0}")]
    SettingsError(String),
}
