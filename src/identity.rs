//! Local machine identity, persisted to `machine.dat`.
//!
//! The validation server binds licenses to server ids, so the id must be
//! stable across restarts. A UUIDv4 is generated on first run and written to
//! the add-on's data directory; if the file cannot be read or written the
//! store degrades to an identifier synthesized from the host's bound network
//! address. The degraded id is best-effort only (it does not survive
//! reinstalls on a different address) and is logged as such.

use crate::host::Host;
use crate::LicenseError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// File name of the identity file inside the data directory.
pub const IDENTITY_FILE: &str = "machine.dat";

/// The local server identity. Created once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerIdentity {
    server_id: String,
    degraded: bool,
}

impl ServerIdentity {
    /// Load the persisted server id, creating and persisting one if absent.
    ///
    /// Falls back to `"<address>:<port>"` (or `"unknown:<port>"`) from the
    /// host when file I/O fails at any step. The fallback never fails.
    pub fn load_or_create(data_dir: &Path, host: &dyn Host) -> Self {
        match Self::read_or_generate(data_dir) {
            Ok(server_id) => Self {
                server_id,
                degraded: false,
            },
            Err(e) => {
                let server_id = synthesize_id(host);
                warn!(error = %e, server_id = %server_id, "identity file unavailable; using fallback server-id");
                Self {
                    server_id,
                    degraded: true,
                }
            }
        }
    }

    fn read_or_generate(data_dir: &Path) -> Result<String, LicenseError> {
        let path = identity_path(data_dir);

        if path.exists() {
            let contents = fs::read_to_string(&path)
                .map_err(|e| LicenseError::IdentityIo(format!("read {}: {}", path.display(), e)))?;
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }

        let server_id = Uuid::new_v4().to_string();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LicenseError::IdentityIo(format!("create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(&path, &server_id)
            .map_err(|e| LicenseError::IdentityIo(format!("write {}: {}", path.display(), e)))?;

        info!("generated new server-id");
        Ok(server_id)
    }

    /// The stable machine identifier.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Whether this identity came from the network-address fallback.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

fn identity_path(data_dir: &Path) -> PathBuf {
    data_dir.join(IDENTITY_FILE)
}

fn synthesize_id(host: &dyn Host) -> String {
    match host.bound_address() {
        Some(addr) => format!("{}:{}", addr, host.port()),
        None => format!("unknown:{}", host.port()),
    }
}
