//! Periodic validation scheduling.
//!
//! One tokio task per manager: the first tick fires immediately (the startup
//! check), then ticks repeat at the configured interval for the lifetime of
//! the guard. No jitter, no backoff — the cadence is constant regardless of
//! recent outcomes. Every tick goes through the same single-flight entry
//! point as manual triggers, so overlapping work is dropped, not queued.

use crate::manager::LicenseManager;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Guard owning the periodic validation task.
///
/// The task is aborted on [`stop`](Self::stop) or drop so the timer can
/// never fire into a torn-down host. An already in-flight validation is not
/// cancelled; it completes naturally.
pub struct PeriodicCheck {
    handle: JoinHandle<()>,
}

impl PeriodicCheck {
    /// Start the startup check and the periodic cadence.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(manager: LicenseManager) -> Self {
        let period = manager.config().effective_interval();
        Self::spawn(manager, period)
    }

    /// Start with an explicit period, bypassing the interval floor (testing).
    #[cfg(any(test, feature = "test-seams"))]
    pub fn start_with_period(manager: LicenseManager, period: Duration) -> Self {
        Self::spawn(manager, period)
    }

    fn spawn(manager: LicenseManager, period: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately: the startup check.
                ticker.tick().await;
                debug!("periodic license check tick");
                manager.validate_async(None);
            }
        });
        Self { handle }
    }

    /// Stop the periodic cadence.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for PeriodicCheck {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
