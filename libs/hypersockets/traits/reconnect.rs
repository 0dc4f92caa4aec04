use std::time::Duration;

/// Decides whether, and after how long, a closed connection is re-opened
///
/// The connection manager itself never reconnects: a fresh connection needs a
/// fresh URL (and usually a fresh credential), so the owner of the manager
/// consults the strategy after a close and calls `set_url` again.
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before re-opening after the `attempt`-th consecutive close (0-indexed)
    ///
    /// `None` means stop reconnecting.
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

impl<S: ReconnectionStrategy + ?Sized> ReconnectionStrategy for Box<S> {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        (**self).next_delay(attempt)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

fn within_budget(max_attempts: Option<usize>, attempt: usize) -> bool {
    max_attempts.map_or(true, |max| attempt < max)
}

/// Exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// `max_attempts = None` retries forever
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !within_budget(self.max_attempts, attempt) {
            return None;
        }

        let factor = 2u32.checked_pow(attempt as u32).unwrap_or(u32::MAX);
        let delay = self
            .initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

/// Same delay between every attempt
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        within_budget(self.max_attempts, attempt).then_some(self.delay)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// A closed connection stays closed until the owner re-opens it explicitly
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn name(&self) -> &'static str {
        "never"
    }
}
