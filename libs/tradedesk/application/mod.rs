//! Application Layer
//!
//! Contains the feed state holders and the session that drives them.
//! This layer depends on domain and infrastructure layers.

pub mod market_data;
pub mod session;
pub mod stream;
pub mod trade_progress;

// Re-export the generic subscription
pub use stream::{Accumulator, AppendBatches, KeepLatest, PumpSummary, Subscription};

// Re-export feed state holders
pub use market_data::MarketDataStream;
pub use trade_progress::TradeProgressTracker;

// Re-export session driver
pub use session::{FeedSession, SessionError, SessionFeed};
