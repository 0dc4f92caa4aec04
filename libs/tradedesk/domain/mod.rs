//! Domain Layer
//!
//! Contains the market and trade entities the feeds produce.
//! This layer has no dependencies on infrastructure or application layers.

pub mod market;
pub mod trade;
pub mod view;

// Re-export market entities
pub use market::{
    BatchRejection, InitialSnapshot, MarketBatch, MarketSeries, MarketTick, SeriesPoint,
};

// Re-export trade entities
pub use trade::{
    InvalidTrade, TradeProgressFrame, TradeRequest, TradeState, TradeStatus, TradeType,
};

// Re-export consumer views
pub use view::{DisplayState, TrackerView};
