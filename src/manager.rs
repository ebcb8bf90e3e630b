//! License Manager - the main collaborator-facing API.
//!
//! The `LicenseManager` ties the core together:
//! - Fire-and-forget validation with a single-flight admission gate
//! - Grace-window bookkeeping via the state machine
//! - Disable handoff to the host once grace is exhausted
//!
//! Protected actions query [`LicenseManager::is_license_valid`] synchronously
//! from any thread before executing.

use crate::client::http::ValidationClient;
use crate::clock::{Clock, SystemClock};
use crate::config::{LicenseConfig, LicenseSettings};
use crate::host::Host;
use crate::identity::ServerIdentity;
use crate::protocol::models::{ValidationOutcome, ValidationRequest};
use crate::state::{LicenseState, Transition};
use crate::LicenseError;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{error, warn};

/// Placeholder shown when no presentable key is configured.
const MASKED_PLACEHOLDER: &str = "xxxx-xxxx-xxxx-xxxx-xxxx";

/// Main license manager.
///
/// Create one instance per add-on at startup and share clones with the
/// scheduler and any protected-action call sites; clones share all state.
#[derive(Clone)]
pub struct LicenseManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    config: LicenseConfig,
    data_dir: PathBuf,
    settings: RwLock<LicenseSettings>,
    identity: ServerIdentity,
    client: ValidationClient,
    state: LicenseState,
    clock: Arc<dyn Clock>,
    host: Arc<dyn Host>,
    /// Single-flight admission gate for validation runs.
    checking: AtomicBool,
    /// Ensures the disable handoff fires at most once.
    disable_requested: AtomicBool,
}

impl LicenseManager {
    /// Create a new license manager.
    ///
    /// Reads collaborator settings and the persisted identity from the
    /// platform data directory under `config.data_namespace`. The embedded
    /// public key is decoded here; a broken key is logged and leaves
    /// verification fail-closed rather than aborting startup.
    ///
    /// # Errors
    /// Returns an error if configuration validation fails, the platform data
    /// directory cannot be determined, or HTTP client creation fails.
    pub fn new(config: LicenseConfig, host: Arc<dyn Host>) -> Result<Self, LicenseError> {
        let base_dir = dirs::data_dir()
            .ok_or_else(|| LicenseError::ConfigError("could not find data directory".to_string()))?;
        let data_dir = base_dir.join(config.data_namespace);
        Self::with_parts(config, host, data_dir, Arc::new(SystemClock))
    }

    /// Create a manager with explicit data directory and clock (for testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn with_data_dir(
        config: LicenseConfig,
        host: Arc<dyn Host>,
        data_dir: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LicenseError> {
        Self::with_parts(config, host, data_dir, clock)
    }

    fn with_parts(
        config: LicenseConfig,
        host: Arc<dyn Host>,
        data_dir: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LicenseError> {
        config.validate()?;

        let settings = match LicenseSettings::load(&data_dir) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "could not load license settings; starting with defaults");
                LicenseSettings::default()
            }
        };

        let identity = ServerIdentity::load_or_create(&data_dir, host.as_ref());
        let client = ValidationClient::new(&config)?;
        let state = LicenseState::new(config.grace_window);

        Ok(Self {
            inner: Arc::new(ManagerInner {
                config,
                data_dir,
                settings: RwLock::new(settings),
                identity,
                client,
                state,
                clock,
                host,
                checking: AtomicBool::new(false),
                disable_requested: AtomicBool::new(false),
            }),
        })
    }

    /// Trigger a validation attempt, fire-and-forget.
    ///
    /// A best-effort single-flight gate drops overlapping triggers: if a
    /// validation is already in flight this returns immediately without side
    /// effects. The attempt runs on the tokio runtime; only the network round
    /// trip suspends, bounded by the client timeouts. Called from a thread
    /// with no runtime context the trigger is dropped (with a warning) and
    /// the gate released, so a later trigger can still run.
    pub fn validate_async(&self, username: Option<String>) {
        if self
            .inner
            .checking
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            // The gate must not stay claimed by a trigger that never ran.
            self.inner.checking.store(false, Ordering::SeqCst);
            warn!("validation trigger dropped: no tokio runtime on this thread");
            return;
        };

        let inner = Arc::clone(&self.inner);
        handle.spawn(async move {
            inner.run_validation(username).await;
            inner.checking.store(false, Ordering::SeqCst);
        });
    }

    /// Effective validity, including the grace window.
    pub fn is_license_valid(&self) -> bool {
        self.inner
            .state
            .effective_validity(self.inner.clock.now_millis())
    }

    /// Negation convenience for command handlers.
    pub fn should_block_commands(&self) -> bool {
        !self.is_license_valid()
    }

    /// Redacted key for display: `XXXX-****-****-****-XXXX`.
    pub fn masked_license_key(&self) -> String {
        let Ok(settings) = self.inner.settings.read() else {
            return MASKED_PLACEHOLDER.to_string();
        };
        let key = settings.key.as_str();
        match (
            key.get(..4),
            key.len().checked_sub(4).and_then(|i| key.get(i..)),
        ) {
            (Some(head), Some(tail)) if key.len() >= 10 => {
                format!("{}-****-****-****-{}", head, tail)
            }
            _ => MASKED_PLACEHOLDER.to_string(),
        }
    }

    /// Re-read `license.json` and re-trigger validation.
    ///
    /// A broken settings file keeps the previous values in place.
    pub fn reload_settings(&self) {
        match LicenseSettings::load(&self.inner.data_dir) {
            Ok(fresh) => {
                if let Ok(mut guard) = self.inner.settings.write() {
                    *guard = fresh;
                }
            }
            Err(e) => warn!(error = %e, "settings reload failed; keeping previous values"),
        }
        self.validate_async(None);
    }

    /// The stable server identity used in validation requests.
    pub fn server_id(&self) -> &str {
        self.inner.identity.server_id()
    }

    /// The manager's configuration.
    pub fn config(&self) -> &LicenseConfig {
        &self.inner.config
    }

    /// Whether a validation run is currently in flight.
    #[cfg(any(test, feature = "test-seams"))]
    pub fn is_checking(&self) -> bool {
        self.inner.checking.load(Ordering::SeqCst)
    }

    /// Feed an outcome straight into the completion handler (for testing the
    /// transition logic without a network round trip).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn report_outcome(&self, outcome: ValidationOutcome) {
        self.inner.handle_outcome(outcome);
    }
}

impl ManagerInner {
    async fn run_validation(&self, username: Option<String>) {
        let request = self.build_request(username);
        let outcome = self.client.validate(&request).await;
        self.handle_outcome(outcome);
    }

    fn build_request(&self, username: Option<String>) -> ValidationRequest {
        let (key, ip) = match self.settings.read() {
            Ok(settings) => (
                settings.key.clone(),
                settings.static_ip().map(|s| s.to_string()),
            ),
            Err(_) => (String::new(), None),
        };

        ValidationRequest {
            license_key: key,
            plugin_id: self.config.plugin_id.to_string(),
            server_id: self.identity.server_id().to_string(),
            ip,
            mc_username: username.filter(|u| !u.is_empty()),
        }
    }

    /// The state-machine transition for one completed attempt.
    fn handle_outcome(&self, outcome: ValidationOutcome) {
        let now = self.clock.now_millis();

        let tag = match outcome {
            ValidationOutcome::Success(_) => {
                self.state.record_success(now);
                return;
            }
            // Inline fallback: a transport blip while still inside grace is
            // absorbed without a state transition, so transient outages do
            // not flap the anchor. Signature failures and server rejections
            // are never eligible.
            ValidationOutcome::TransportFailure if self.state.within_grace(now) => {
                warn!("network failure; still within grace");
                return;
            }
            ValidationOutcome::TransportFailure => "network failure".to_string(),
            ValidationOutcome::MalformedResponse => "malformed response".to_string(),
            ValidationOutcome::Rejected(reason) => reason,
        };

        match self.state.record_failure(now) {
            Transition::GraceStarted => {
                warn!(
                    grace_secs = self.config.grace_window.as_secs(),
                    tag = %tag,
                    "first validation failure; entering initial grace"
                );
            }
            Transition::GraceContinued => {
                warn!(tag = %tag, "validation failed; using grace window");
            }
            Transition::Expired => {
                error!(tag = %tag, "grace window exhausted; disabling add-on");
                if self
                    .disable_requested
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    self.host.request_disable();
                }
            }
            // record_failure never reports Valid.
            Transition::Valid => {}
        }
    }
}
