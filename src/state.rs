//! License validity state and grace-window bookkeeping.
//!
//! A single process-wide instance, written only by the validation completion
//! handler and read synchronously from arbitrary threads. Plain atomics give
//! the required cross-thread visibility; no broader locking is needed under
//! the single-writer discipline. State is never persisted — grace does not
//! survive a restart.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

/// Sentinel for "no successful validation yet".
const UNSET: i64 = 0;

/// Result of feeding one validation outcome into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Validation succeeded; fully operational.
    Valid,
    /// First-ever failure; an initial grace window was started.
    GraceStarted,
    /// Failure within the grace window; still operational.
    GraceContinued,
    /// Grace exhausted; protected actions must stop. Terminal for this
    /// process instance.
    Expired,
}

/// Thread-safe validity holder.
///
/// Timestamps are epoch milliseconds; `0` means unset.
#[derive(Debug)]
pub struct LicenseState {
    valid: AtomicBool,
    last_success: AtomicI64,
    grace_millis: i64,
}

impl LicenseState {
    /// Fresh state: invalid, no success recorded.
    pub fn new(grace_window: Duration) -> Self {
        Self {
            valid: AtomicBool::new(false),
            last_success: AtomicI64::new(UNSET),
            grace_millis: grace_window.as_millis() as i64,
        }
    }

    /// Record a verified successful validation.
    pub fn record_success(&self, now_millis: i64) -> Transition {
        self.last_success.store(now_millis, Ordering::SeqCst);
        self.valid.store(true, Ordering::SeqCst);
        Transition::Valid
    }

    /// Record a failed validation attempt (rejection, signature failure, or
    /// transport failure that was not absorbed by the inline fallback).
    pub fn record_failure(&self, now_millis: i64) -> Transition {
        self.valid.store(false, Ordering::SeqCst);

        let last = self.last_success.load(Ordering::SeqCst);
        if last == UNSET {
            // First-ever failure starts an initial grace window.
            self.last_success.store(now_millis, Ordering::SeqCst);
            return Transition::GraceStarted;
        }

        if now_millis - last <= self.grace_millis {
            Transition::GraceContinued
        } else {
            Transition::Expired
        }
    }

    /// Effective validity: last check succeeded, or a prior success is still
    /// covered by the grace window.
    pub fn effective_validity(&self, now_millis: i64) -> bool {
        if self.valid.load(Ordering::SeqCst) {
            return true;
        }
        self.within_grace(now_millis)
    }

    /// Whether `now` falls inside the grace window of the last success (or
    /// the initial grace window started by the first failure).
    pub fn within_grace(&self, now_millis: i64) -> bool {
        let last = self.last_success.load(Ordering::SeqCst);
        last != UNSET && now_millis - last <= self.grace_millis
    }

    /// The last-known-good flag, without grace.
    pub fn is_valid_flag(&self) -> bool {
        self.valid.load(Ordering::SeqCst)
    }
}
