//! Trade Desk Stream
//!
//! Client-side stream reconciliation for a trading dashboard: a REST snapshot
//! merged with an incrementally arriving market feed, plus a single trade's
//! progress feed, both driven by the `hypersockets` connection manager.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used items
pub use application::{
    FeedSession, MarketDataStream, PumpSummary, SessionError, SessionFeed, Subscription,
    TradeProgressTracker,
};
pub use domain::{
    DisplayState, InitialSnapshot, MarketBatch, MarketSeries, MarketTick, TrackerView,
    TradeProgressFrame, TradeRequest, TradeState, TradeStatus, TradeType,
};
pub use infrastructure::{
    init_tracing, CredentialError, CredentialProvider, EnvCredential, Endpoints, FeedKind,
    RestError, ShutdownManager, SnapshotFetcher, StaticCredential, StreamConfig, TradeClient,
};
