//! # HyperSockets Traits
//!
//! Core traits and types shared by the connection manager and its users:
//!
//! - **FrameDecoder**: turn raw frames into structured messages, with raw fallback
//! - **ReconnectionStrategy**: decide whether a closed feed is re-opened
//! - **HyperSocketError**: the error type of the crate

pub mod error;
pub mod parser;
pub mod reconnect;

// Re-export commonly used types
pub use error::{HyperSocketError, Result};
pub use parser::{Decoded, FrameDecoder, JsonDecoder, TypedJsonDecoder, WsMessage};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
