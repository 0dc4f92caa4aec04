//! Trade submission and progress entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Status reported on a progress frame
///
/// Values other than `success` and `failed` are kept verbatim so the frame
/// still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TradeStatus {
    Success,
    Failed,
    Other(String),
}

impl From<String> for TradeStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "success" => TradeStatus::Success,
            "failed" => TradeStatus::Failed,
            _ => TradeStatus::Other(status),
        }
    }
}

impl From<TradeStatus> for String {
    fn from(status: TradeStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Success => write!(f, "success"),
            TradeStatus::Failed => write!(f, "failed"),
            TradeStatus::Other(status) => write!(f, "{}", status),
        }
    }
}

/// One frame of the trade-progress feed
///
/// Only the newest frame matters to consumers; frames are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeProgressFrame {
    #[serde(default)]
    pub trader_id: String,
    pub trade_id: String,
    pub ticker: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub message: String,
    /// `trade_completed` on the wire
    #[serde(default)]
    pub event: String,
    /// 0..=100
    pub progress: f64,
    #[serde(default)]
    pub status: Option<TradeStatus>,
}

impl TradeProgressFrame {
    /// Progress as a whole percentage, clamped to 0..=100
    pub fn percent(&self) -> u8 {
        if self.progress.is_nan() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }

    /// No further frames are expected for this trade
    pub fn is_terminal(&self) -> bool {
        self.status == Some(TradeStatus::Failed) || self.percent() >= 100
    }
}

/// Side of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for TradeType {
    type Err = InvalidTrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            other => Err(InvalidTrade::UnknownSide(other.to_string())),
        }
    }
}

/// Reasons a trade request is refused before it is sent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidTrade {
    #[error("ticker is required")]
    EmptyTicker,

    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("price must be a non-negative number, got {0}")]
    InvalidPrice(f64),

    #[error("trade type must be buy or sell, got '{0}'")]
    UnknownSide(String),
}

/// Body of `POST /api/trades/send`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub ticker: String,
    pub quantity: i64,
    pub price: f64,
    pub trade_type: TradeType,
}

impl TradeRequest {
    pub fn new(ticker: impl Into<String>, quantity: i64, price: f64, trade_type: TradeType) -> Self {
        Self {
            ticker: ticker.into(),
            quantity,
            price,
            trade_type,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidTrade> {
        if self.ticker.trim().is_empty() {
            return Err(InvalidTrade::EmptyTicker);
        }
        if self.quantity <= 0 {
            return Err(InvalidTrade::NonPositiveQuantity(self.quantity));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(InvalidTrade::InvalidPrice(self.price));
        }
        Ok(())
    }
}

/// Where a submitted trade stands, as far as this client knows
#[derive(Debug, Clone, PartialEq)]
pub enum TradeState {
    /// Accepted by the API, not yet reported on the progress feed
    Queued,
    /// Progress frame below 100%
    InProgress(u8),
    Completed,
    Failed(String),
}

impl TradeState {
    /// State implied by a progress frame
    pub fn from_frame(frame: &TradeProgressFrame) -> Self {
        match &frame.status {
            Some(TradeStatus::Failed) => TradeState::Failed(if frame.message.is_empty() {
                "trade failed".to_string()
            } else {
                frame.message.clone()
            }),
            _ if frame.percent() >= 100 => TradeState::Completed,
            _ => TradeState::InProgress(frame.percent()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TradeState::Completed | TradeState::Failed(_))
    }
}
