//! # Gracelock
//!
//! **License enforcement core for game-server add-ons.**
//!
//! Gracelock periodically calls a remote validation endpoint,
//! **cryptographically verifies** every response with Ed25519 signatures,
//! and tells the host add-on whether protected actions may run. Network
//! failures are tolerated through a bounded grace window; once the window is
//! exhausted the core asks the host to disable the add-on.
//!
//! ## Features
//!
//! - **Ed25519 signature verification** — responses are signed by the
//!   validation server's private key over a canonicalized payload
//! - **Grace window** — a prior good validation keeps the add-on
//!   operational through outages, bounded at 24 hours by default
//! - **Single-flight validation** — overlapping triggers (startup, periodic
//!   tick, manual reload) are dropped, never queued
//! - **Stable machine identity** — a persisted UUID, degrading to a
//!   network-address-derived id when the filesystem is unavailable
//! - **Fail-closed key handling** — a broken embedded public key makes every
//!   signature check fail instead of silently passing
//!
//! ## Quickstart
//!
//! ```no_run
//! use gracelock::{Host, LicenseConfig, LicenseManager, PeriodicCheck};
//! use std::net::IpAddr;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct MyHost;
//!
//! impl Host for MyHost {
//!     fn bound_address(&self) -> Option<IpAddr> { None }
//!     fn port(&self) -> u16 { 25565 }
//!     fn request_disable(&self) { /* marshal onto the main thread */ }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gracelock::LicenseError> {
//!     let config = LicenseConfig {
//!         plugin_id: "giftcode-plugin",
//!         validation_url: "https://licenses.example.com/license/validate".into(),
//!         public_key_b64: "MCowBQYDK2VwAyEA...".into(),
//!         user_agent: "giftcode-plugin/1.0.0",
//!         data_namespace: "giftcode-plugin",
//!         check_interval: Duration::from_secs(3600),
//!         grace_window: Duration::from_secs(86400),
//!     };
//!
//!     let manager = LicenseManager::new(config, Arc::new(MyHost))?;
//!     let _check = PeriodicCheck::start(manager.clone());
//!
//!     if manager.should_block_commands() {
//!         // run in limited mode until the first validation lands
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Gracelock protects against spoofed validation responses (MITM): anything
//! that fails Ed25519 verification is a hard rejection, never eligible for
//! the grace fallback. It does **not** prevent binary patching; client-side
//! licensing can always be bypassed by a determined attacker with access to
//! the binary.

#![deny(warnings)]
#![deny(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// License state machine
pub mod state;

// Host integration seam
pub mod host;

// Local machine identity
pub mod identity;

// Scheduler glue
pub mod scheduler;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::{LicenseConfig, LicenseSettings};
pub use errors::LicenseError;
pub use host::Host;
pub use identity::ServerIdentity;
pub use manager::LicenseManager;
pub use protocol::models::{ValidationOutcome, ValidationRequest};
pub use scheduler::PeriodicCheck;
pub use state::{LicenseState, Transition};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
