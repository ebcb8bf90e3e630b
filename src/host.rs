//! Host integration seam.
//!
//! The core never touches game-server internals directly. The host add-on
//! supplies this narrow interface for the two things the core needs from it:
//! the bound network address (fallback identity derivation) and the disable
//! handoff once the grace window is exhausted.

use std::net::IpAddr;

/// Narrow query/control interface implemented by the host add-on.
pub trait Host: Send + Sync {
    /// The address the game server is bound to, if it can be determined.
    fn bound_address(&self) -> Option<IpAddr>;

    /// The port the game server listens on.
    fn port(&self) -> u16;

    /// Ask the host to disable the add-on's protected functionality.
    ///
    /// Called from a background worker after the grace window is exhausted.
    /// This is a handoff, not a blocking call: implementations that require
    /// lifecycle mutations on a main control path must marshal the request
    /// there themselves and return immediately.
    fn request_disable(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test host recording disable requests.
    #[derive(Debug, Default)]
    pub struct RecordingHost {
        pub address: Option<IpAddr>,
        pub listen_port: u16,
        pub disables: AtomicUsize,
    }

    impl RecordingHost {
        pub fn new(address: Option<IpAddr>, listen_port: u16) -> Self {
            Self {
                address,
                listen_port,
                disables: AtomicUsize::new(0),
            }
        }

        pub fn disable_count(&self) -> usize {
            self.disables.load(Ordering::SeqCst)
        }
    }

    impl Host for RecordingHost {
        fn bound_address(&self) -> Option<IpAddr> {
            self.address
        }

        fn port(&self) -> u16 {
            self.listen_port
        }

        fn request_disable(&self) {
            self.disables.fetch_add(1, Ordering::SeqCst);
        }
    }
}
