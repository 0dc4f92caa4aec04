//! # HyperSockets Core
//!
//! The connection manager and its building blocks.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hypersockets::{ClientEvent, JsonDecoder};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> hypersockets::Result<()> {
//!     let mut manager = hypersockets::builder()
//!         .label("MarketWS")
//!         .connect_timeout(Duration::from_secs(10))
//!         .decoder(JsonDecoder)
//!         .build()?;
//!
//!     // Nothing happens until a URL is known
//!     manager.set_url(None).await?;
//!
//!     manager.open("wss://api.example.com/market-data/ws?token=abc").await?;
//!
//!     while let Some(event) = manager.next_event(Duration::from_secs(30)).await {
//!         if let ClientEvent::Message(frame) = event {
//!             println!("frame: {:?}", frame);
//!         }
//!     }
//!
//!     manager.close().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;

// Re-export main types
pub use builder::{states, ConnectionManagerBuilder};
pub use client::{redact_url, ClientEvent, ConnectionManager, Metrics};
pub use config::ConnectionConfig;
pub use connection_state::{
    AtomicConnectionPhase, AtomicMetrics, ConnectionPhase, ConnectionStatus,
};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new connection manager builder
pub fn builder() -> ConnectionManagerBuilder<builder::states::NoDecoder, ()> {
    ConnectionManagerBuilder::new()
}
