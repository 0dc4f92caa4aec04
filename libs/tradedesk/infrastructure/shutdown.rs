//! Graceful shutdown management

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::{sleep, Instant};
use tracing::info;

/// How often a sleeping feed loop re-checks the flag
const CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Shared "keep running" flag for the feed loops of a binary
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    flag: Arc<AtomicBool>,
}

impl ShutdownManager {
    /// Create a new shutdown manager in the running state
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Spawn a Ctrl+C handler that triggers shutdown
    pub fn spawn_signal_handler(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal (Ctrl+C), closing feeds...");
                manager.trigger();
            }
        });
    }

    /// Request shutdown from code (terminal trade frame, fatal error, ...)
    pub fn trigger(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early on shutdown
    ///
    /// Returns whether the process is still running.
    pub async fn interruptible_sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;

        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep(CHECK_INTERVAL.min(deadline - now)).await;
        }

        self.is_running()
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
