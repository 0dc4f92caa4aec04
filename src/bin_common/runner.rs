//! Binary runner utilities
//!
//! Provides a standardized way to run binaries with proper
//! logging, heartbeat, and graceful shutdown.

use std::time::{Duration, Instant};
use tracing::{error, info};

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Heartbeat interval in seconds
    pub heartbeat_interval_secs: u64,
}

impl RunConfig {
    /// Create a new run configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            heartbeat_interval_secs: 30,
        }
    }

    /// Set heartbeat interval
    pub fn with_heartbeat(mut self, secs: u64) -> Self {
        self.heartbeat_interval_secs = secs;
        self
    }

    pub fn heartbeat(&self) -> Heartbeat {
        Heartbeat::new(Duration::from_secs(self.heartbeat_interval_secs))
    }
}

/// Rate limiter for periodic status lines
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True on the first call and then at most once per interval
    pub fn due(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

const RULE: &str = "========================================";

fn banner(lines: &[String]) {
    info!("{}", RULE);
    for line in lines {
        info!("{}", line);
    }
    info!("{}", RULE);
}

/// A binary built around one long-running feed session
///
/// `execute` wraps `run` between a start and a stop banner; `stats` adds a
/// summary line to the latter.
pub trait BinaryRunner {
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    fn stats(&self) -> Option<String> {
        None
    }

    fn print_banner(&self) {
        banner(&[
            format!("Starting {}", self.config().name),
            "Press Ctrl+C to stop".to_string(),
        ]);
    }

    fn print_shutdown(&self) {
        let mut lines = vec![format!("{} stopped", self.config().name)];
        lines.extend(self.stats());
        banner(&lines);
    }

    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        if let Err(e) = &result {
            error!("{} failed: {:#}", self.config().name, e);
        }
        self.print_shutdown();
        result
    }
}
