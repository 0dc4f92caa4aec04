//! # HyperSockets
//!
//! A WebSocket connection manager that owns exactly one connection at a time.
//!
//! ## Features
//!
//! - **Owned lifecycle**: open by assigning a URL, close on URL change, explicit
//!   `close()` or drop; one close per open
//! - **Explicit state machine**: `Idle → Connecting → Open → (Errored | Closed)`
//!   plus the `{connected, error}` status consumers render from
//! - **Ordered delivery**: frames are decoded inline and published in arrival order
//! - **Stale-write guard**: a superseded connection can no longer touch state
//! - **Raw fallback**: undecodable frames are surfaced, never dropped

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use self::core::{
    builder, client, config, connection_state,
    builder::{states, ConnectionManagerBuilder},
    client::{redact_url, ClientEvent, ConnectionManager, Metrics},
    config::ConnectionConfig,
    connection_state::{AtomicConnectionPhase, AtomicMetrics, ConnectionPhase, ConnectionStatus},
};

/// Type alias for Result with HyperSocketError
pub type Result<T> = std::result::Result<T, traits::HyperSocketError>;
