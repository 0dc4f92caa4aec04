//! Infrastructure Layer
//!
//! Contains implementations of external interfaces (REST API, credentials,
//! configuration, process plumbing).
//! This layer depends on the domain layer but not on the application layer.

pub mod client;
pub mod config;
pub mod credentials;
pub mod logging;
pub mod shutdown;

// Re-export commonly used types from client
pub use client::{
    extract_error_message, EndpointError, Endpoints, FeedKind, RestError, SnapshotFetcher,
    TradeAck, TradeClient,
};

// Re-export config types
pub use config::{ApiConfig, ConfigError, MarketConfig, ReconnectConfig, ReconnectKind, StreamConfig};

// Re-export credential providers
pub use credentials::{
    fetch_token, CredentialError, CredentialProvider, EnvCredential, StaticCredential,
};

// Re-export infrastructure services
pub use logging::init_tracing;
pub use shutdown::ShutdownManager;
