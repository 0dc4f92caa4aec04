//! Connection lifecycle state
//!
//! Two views of the same lifecycle are kept:
//!
//! - [`ConnectionPhase`]: the explicit state machine
//!   `Idle → Connecting → Open → (Errored | Closed)`
//! - [`ConnectionStatus`]: the `{connected, error}` pair consumers render from
//!
//! Both are written only by the connection manager.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Lifecycle phase of the managed connection
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionPhase {
    /// No URL has been opened yet
    Idle = 0,
    /// Handshake in flight
    Connecting = 1,
    /// Handshake completed, frames flowing
    Open = 2,
    /// Transport reported an error; the socket has not closed yet
    Errored = 3,
    /// Socket closed (peer, transport failure or local teardown)
    Closed = 4,
}

impl ConnectionPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionPhase::Connecting,
            2 => ConnectionPhase::Open,
            3 => ConnectionPhase::Errored,
            4 => ConnectionPhase::Closed,
            _ => ConnectionPhase::Idle,
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step
    pub fn can_transition_to(self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;
        matches!(
            (self, next),
            (Idle | Closed, Connecting)
                | (Connecting, Open | Errored | Closed)
                | (Open, Errored | Closed)
                | (Errored, Errored | Closed)
        )
    }
}

/// Atomic holder for [`ConnectionPhase`]
#[derive(Debug)]
pub struct AtomicConnectionPhase(AtomicU8);

impl AtomicConnectionPhase {
    pub fn new(phase: ConnectionPhase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionPhase {
        ConnectionPhase::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, phase: ConnectionPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }

    pub fn compare_exchange(
        &self,
        current: ConnectionPhase,
        new: ConnectionPhase,
    ) -> Result<ConnectionPhase, ConnectionPhase> {
        self.0
            .compare_exchange(current as u8, new as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(ConnectionPhase::from_u8)
            .map_err(ConnectionPhase::from_u8)
    }
}

/// `{connected, error}` pair exposed to consumers
///
/// Transitions:
/// - open: `connected = true, error = false`
/// - transport error: `error = true`, `connected` left as is
/// - close: back to `{false, false}`; closing clears a previous error flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub error: bool,
}

impl ConnectionStatus {
    pub const INITIAL: ConnectionStatus = ConnectionStatus {
        connected: false,
        error: false,
    };

    #[must_use]
    pub fn opened(self) -> Self {
        Self {
            connected: true,
            error: false,
        }
    }

    #[must_use]
    pub fn errored(self) -> Self {
        Self {
            error: true,
            ..self
        }
    }

    #[must_use]
    pub fn closed(self) -> Self {
        Self::INITIAL
    }
}

/// Per-manager counters
#[derive(Debug, Default)]
pub struct AtomicMetrics {
    frames_received: AtomicU64,
    decode_fallbacks: AtomicU64,
    connections_opened: AtomicU64,
    close_requests: AtomicU64,
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn increment_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_fallbacks(&self) {
        self.decode_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn increment_close_requests(&self) {
        self.close_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn decode_fallbacks(&self) -> u64 {
        self.decode_fallbacks.load(Ordering::Relaxed)
    }

    pub fn connections_opened(&self) -> u64 {
        self.connections_opened.load(Ordering::Relaxed)
    }

    pub fn close_requests(&self) -> u64 {
        self.close_requests.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_clears_error() {
        let status = ConnectionStatus::INITIAL.opened().errored();
        assert_eq!(
            status,
            ConnectionStatus {
                connected: true,
                error: true
            }
        );
        assert_eq!(status.closed(), ConnectionStatus::INITIAL);
    }

    #[test]
    fn test_error_keeps_connected_flag() {
        let status = ConnectionStatus::INITIAL.errored();
        assert!(!status.connected);
        assert!(status.error);
    }

    #[test]
    fn test_phase_transitions() {
        use ConnectionPhase::*;
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Open));
        assert!(Open.can_transition_to(Errored));
        assert!(Errored.can_transition_to(Closed));
        assert!(Closed.can_transition_to(Connecting));
        assert!(!Idle.can_transition_to(Open));
        assert!(!Closed.can_transition_to(Open));
    }

    #[test]
    fn test_atomic_phase_round_trip() {
        let phase = AtomicConnectionPhase::new(ConnectionPhase::Idle);
        assert_eq!(phase.get(), ConnectionPhase::Idle);
        assert!(phase
            .compare_exchange(ConnectionPhase::Idle, ConnectionPhase::Connecting)
            .is_ok());
        assert_eq!(
            phase.compare_exchange(ConnectionPhase::Idle, ConnectionPhase::Open),
            Err(ConnectionPhase::Connecting)
        );
    }
}
