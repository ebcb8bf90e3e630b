//! Ed25519 signature verification against the embedded public key.

use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::error;

/// Verifier built from the add-on's embedded public key.
///
/// The key is decoded once at startup. If decoding fails the verifier is
/// permanently unavailable and every [`verify`](Self::verify) call returns
/// `false` (fail-closed); the failure is surfaced as a startup-level error
/// log so the operator knows validation can never succeed.
pub struct SignatureVerifier {
    key: Option<VerifyingKey>,
}

impl SignatureVerifier {
    /// Build a verifier from a base64-encoded DER (SPKI) public key block.
    ///
    /// Never fails: a broken key yields a fail-closed verifier.
    pub fn from_base64_der(public_key_b64: &str) -> Self {
        let key = match decode_public_key(public_key_b64) {
            Ok(key) => Some(key),
            Err(reason) => {
                error!(%reason, "failed to load Ed25519 public key; every signature check will fail");
                None
            }
        };
        Self { key }
    }

    /// Whether the embedded key decoded successfully at startup.
    pub fn key_available(&self) -> bool {
        self.key.is_some()
    }

    /// Verify a detached base64 signature over the exact canonical payload.
    ///
    /// Returns `false` on any malformed base64, wrong-length signature,
    /// unavailable key, or cryptographic mismatch. Never panics or errors.
    pub fn verify(&self, payload: &[u8], signature_b64: &str) -> bool {
        let Some(key) = &self.key else {
            return false;
        };
        if signature_b64.is_empty() {
            return false;
        }

        let Ok(sig_bytes) = STANDARD.decode(signature_b64) else {
            return false;
        };
        let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes) else {
            return false;
        };

        let signature = Signature::from_bytes(&sig_array);
        key.verify(payload, &signature).is_ok()
    }
}

fn decode_public_key(public_key_b64: &str) -> Result<VerifyingKey, String> {
    let sanitized: String = public_key_b64
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let der = STANDARD
        .decode(&sanitized)
        .map_err(|e| format!("invalid base64: {}", e))?;

    VerifyingKey::from_public_key_der(&der).map_err(|e| format!("invalid DER key block: {}", e))
}
