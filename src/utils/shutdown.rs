//! Operator cancellation
//!
//! A cloneable flag set from the signal handler and polled by the relay.
//! Every wait in the relay goes through [`Shutdown::sleep`] so an interrupt
//! is honoured within one slice even during long retry delays.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest uninterrupted sleep slice
const SLICE: Duration = Duration::from_millis(50);

/// Cancellation token shared between the signal handler and the relay
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a token that has not been triggered
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT / SIGTERM (Ctrl+C on Windows) to this token
    pub fn install_handler(&self) -> Result<(), ctrlc::Error> {
        let requested = self.requested.clone();
        ctrlc::set_handler(move || {
            requested.store(true, Ordering::SeqCst);
        })
    }

    /// Request shutdown
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Has shutdown been requested?
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early on shutdown
    ///
    /// Returns `true` if the full duration elapsed, `false` if shutdown was
    /// requested before or during the wait.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sleep_completes() {
        let shutdown = Shutdown::new();
        let start = Instant::now();
        assert!(shutdown.sleep(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_sleep_after_request_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.clone().request();
        let start = Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_request_from_other_thread_wakes_sleeper() {
        let shutdown = Shutdown::new();
        let remote = shutdown.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.request();
        });

        let start = Instant::now();
        assert!(!shutdown.sleep(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
