//! Gracelock configuration.
//!
//! Two layers of configuration exist:
//! - [`LicenseConfig`]: product constants compiled into the add-on (plugin
//!   id, endpoint, embedded public key, intervals).
//! - [`LicenseSettings`]: the two collaborator-owned values this core is
//!   allowed to read (`license.key`, `license.ip`), stored as a small JSON
//!   file in the add-on's private data directory and reloadable at runtime.

use crate::LicenseError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Periodic check interval floor. Ticks can never be scheduled tighter.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for gracelock license validation.
///
/// These are product-specific settings baked into the add-on. The endpoint
/// URL and public key are owned `String`s so test harnesses can point the
/// core at a local server with a freshly generated keypair.
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Plugin identifier sent with every validation request.
    /// Must match what the validation server expects.
    pub plugin_id: &'static str,

    /// Validation endpoint (`POST <validation_url>`, JSON body).
    pub validation_url: String,

    /// Embedded Ed25519 public key: base64-encoded DER (SPKI) block.
    /// SECURITY: hard-code this in the add-on; do not read it from config.
    pub public_key_b64: String,

    /// User-Agent product identifier (e.g., "giftcode-plugin/1.4.0").
    pub user_agent: &'static str,

    /// Namespace for the add-on's private data directory.
    pub data_namespace: &'static str,

    /// Periodic validation interval. Clamped up to [`MIN_CHECK_INTERVAL`].
    pub check_interval: Duration,

    /// Grace window after the last known-good validation.
    pub grace_window: Duration,
}

impl LicenseConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), LicenseError> {
        if self.plugin_id.is_empty() {
            return Err(LicenseError::ConfigError(
                "plugin_id cannot be empty".to_string(),
            ));
        }
        if self.validation_url.is_empty() {
            return Err(LicenseError::ConfigError(
                "validation_url cannot be empty".to_string(),
            ));
        }
        if self.public_key_b64.is_empty() {
            return Err(LicenseError::ConfigError(
                "public_key_b64 cannot be empty".to_string(),
            ));
        }
        if self.data_namespace.is_empty() {
            return Err(LicenseError::ConfigError(
                "data_namespace cannot be empty".to_string(),
            ));
        }
        if self.grace_window.is_zero() {
            return Err(LicenseError::ConfigError(
                "grace_window cannot be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// The periodic check interval with the floor applied.
    pub fn effective_interval(&self) -> Duration {
        self.check_interval.max(MIN_CHECK_INTERVAL)
    }
}

/// Collaborator-owned settings, read-only to this core.
///
/// Backing file layout (`license.json` in the data directory):
/// ```json
/// { "license": { "key": "XXXX-XXXX-XXXX-XXXX-XXXX", "ip": "" } }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LicenseSettings {
    /// The license key entered by the server owner.
    #[serde(default)]
    pub key: String,

    /// Optional static IP to report to the validation server.
    #[serde(default)]
    pub ip: String,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    license: LicenseSettings,
}

impl LicenseSettings {
    /// File name of the settings file inside the data directory.
    pub const FILE_NAME: &'static str = "license.json";

    /// Load settings from the given data directory.
    ///
    /// A missing file yields defaults (empty key, no static IP) so a fresh
    /// install starts up and reports "missing key" through the normal
    /// validation path instead of erroring here.
    pub fn load(data_dir: &Path) -> Result<Self, LicenseError> {
        let path = data_dir.join(Self::FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .map_err(|e| LicenseError::SettingsError(format!("read {}: {}", path.display(), e)))?;

        let file: SettingsFile = serde_json::from_str(&raw)
            .map_err(|e| LicenseError::SettingsError(format!("parse {}: {}", path.display(), e)))?;

        Ok(file.license)
    }

    /// The static IP, if one is configured and non-empty.
    pub fn static_ip(&self) -> Option<&str> {
        if self.ip.trim().is_empty() {
            None
        } else {
            Some(self.ip.trim())
        }
    }
}
