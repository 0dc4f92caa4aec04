//! Trade Desk Stream - Main Library
//!
//! This crate provides the binaries' shared plumbing for the trade desk
//! stream client, following Clean Architecture principles.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **tradedesk**: Feeds, snapshot and trade clients (re-exported from workspace)
//! - **hypersockets**: WebSocket library (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,no_run
//! use tradedesk_stream::bin_common::{load_config_from_env, ConfigType};
//! use tradedesk_stream::tradedesk::StreamConfig;
//!
//! let config = StreamConfig::load(load_config_from_env(ConfigType::Stream));
//! ```

// Re-export workspace libraries for convenience
pub use hypersockets;
pub use tradedesk;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables
    //!
    //! Provides shared functionality for the presentation layer (binaries)
    //! following Clean Architecture principles.

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, parse_submit_args, parse_tickers, ConfigType};
    pub use runner::{BinaryRunner, Heartbeat, RunConfig};
}
