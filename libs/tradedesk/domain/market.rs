//! Market data entities
//!
//! A push frame carries one [`MarketBatch`]; accepted batches are appended to
//! a [`MarketSeries`] that only ever grows. The REST snapshot is kept apart as
//! an [`InitialSnapshot`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Timestamp layout used by the feed when it does not send RFC 3339
const FEED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One ticker/price update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTick {
    pub ticker: String,
    pub price: f64,
    /// As sent by the feed (`date` on the wire)
    #[serde(alias = "date", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl MarketTick {
    pub fn new(ticker: impl Into<String>, price: f64, timestamp: Option<String>) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            timestamp,
        }
    }

    /// Validate one element of a frame
    ///
    /// Requires a non-blank string `ticker` and a numeric `price`. The
    /// timestamp is optional and read from `timestamp` or `date`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let fields = value.as_object()?;

        let ticker = fields.get("ticker")?.as_str()?;
        if ticker.trim().is_empty() {
            return None;
        }
        let price = fields.get("price")?.as_f64()?;

        let timestamp = fields
            .get("timestamp")
            .or_else(|| fields.get("date"))
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            });

        Some(Self::new(ticker, price, timestamp))
    }

    /// Parse the timestamp (RFC 3339, or `YYYY-MM-DD HH:MM:SS` taken as UTC)
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, FEED_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Why a frame did not produce a batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchRejection {
    #[error("frame is not an array")]
    NotArray,

    #[error("frame is an empty array")]
    Empty,

    #[error("none of the {0} elements has a ticker and a price")]
    NoValidTicks(usize),
}

/// The ticks carried by one frame, in frame order
///
/// Never empty: frames without a single valid tick are rejected instead.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MarketBatch {
    ticks: Vec<MarketTick>,
}

impl MarketBatch {
    /// Build a batch from already validated ticks; `None` when empty
    pub fn new(ticks: Vec<MarketTick>) -> Option<Self> {
        (!ticks.is_empty()).then_some(Self { ticks })
    }

    /// Validate a decoded frame
    ///
    /// Elements without a ticker or a price are dropped; the frame is rejected
    /// only when nothing valid is left.
    pub fn from_frame(frame: &Value) -> Result<Self, BatchRejection> {
        let elements = frame.as_array().ok_or(BatchRejection::NotArray)?;
        if elements.is_empty() {
            return Err(BatchRejection::Empty);
        }

        let ticks: Vec<MarketTick> = elements.iter().filter_map(MarketTick::from_value).collect();
        Self::new(ticks).ok_or(BatchRejection::NoValidTicks(elements.len()))
    }

    pub fn ticks(&self) -> &[MarketTick] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarketTick> {
        self.ticks.iter()
    }
}

/// One point of a per-ticker chart series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    /// Index of the batch the tick came from
    pub batch_index: usize,
    pub price: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Append-only sequence of accepted batches, in delivery order
///
/// There is deliberately no way to remove, reorder or replace a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MarketSeries {
    batches: Vec<MarketBatch>,
}

impl MarketSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, batch: MarketBatch) {
        self.batches.push(batch);
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn batches(&self) -> &[MarketBatch] {
        &self.batches
    }

    pub fn last_batch(&self) -> Option<&MarketBatch> {
        self.batches.last()
    }

    /// Total number of ticks across all batches
    pub fn tick_count(&self) -> usize {
        self.batches.iter().map(MarketBatch::len).sum()
    }

    /// Every tick for `ticker`, in delivery order
    pub fn series_for(&self, ticker: &str) -> Vec<SeriesPoint> {
        self.batches
            .iter()
            .enumerate()
            .flat_map(|(batch_index, batch)| {
                batch
                    .iter()
                    .filter(move |tick| tick.ticker == ticker)
                    .map(move |tick| SeriesPoint {
                        batch_index,
                        price: tick.price,
                        timestamp: tick.parsed_timestamp(),
                    })
            })
            .collect()
    }

    /// Most recent price per ticker
    pub fn latest_prices(&self) -> BTreeMap<String, f64> {
        let mut latest = BTreeMap::new();
        for tick in self.batches.iter().flat_map(MarketBatch::iter) {
            latest.insert(tick.ticker.clone(), tick.price);
        }
        latest
    }
}

/// REST snapshot returned before (or alongside) the push feed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialSnapshot {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Value,
}

impl InitialSnapshot {
    /// The snapshot payload as a batch, when it is array-shaped
    pub fn batch(&self) -> Option<MarketBatch> {
        MarketBatch::from_frame(&self.message).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tick_accepts_date_alias() {
        let tick = MarketTick::from_value(&json!({
            "ticker": "AAPL",
            "price": 200.66,
            "date": "2025-05-30 19:59:00"
        }))
        .unwrap();

        assert_eq!(tick.ticker, "AAPL");
        assert_eq!(tick.price, 200.66);
        assert_eq!(tick.timestamp.as_deref(), Some("2025-05-30 19:59:00"));
    }

    #[test]
    fn test_tick_requires_ticker_and_price() {
        assert!(MarketTick::from_value(&json!({"price": 1.0})).is_none());
        assert!(MarketTick::from_value(&json!({"ticker": "AAPL"})).is_none());
        assert!(MarketTick::from_value(&json!({"ticker": "  ", "price": 1.0})).is_none());
        assert!(MarketTick::from_value(&json!({"ticker": "AAPL", "price": "1.0"})).is_none());
        assert!(MarketTick::from_value(&json!("AAPL")).is_none());
    }

    #[test]
    fn test_tick_timestamp_formats() {
        let iso = MarketTick::new("AAPL", 1.0, Some("2025-06-01T00:00:00Z".into()));
        let feed = MarketTick::new("AAPL", 1.0, Some("2025-06-01 00:00:00".into()));
        let junk = MarketTick::new("AAPL", 1.0, Some("yesterday".into()));

        assert_eq!(iso.parsed_timestamp(), feed.parsed_timestamp());
        assert!(iso.parsed_timestamp().is_some());
        assert!(junk.parsed_timestamp().is_none());
    }

    #[test]
    fn test_batch_drops_invalid_elements() {
        let batch = MarketBatch::from_frame(&json!([
            {"ticker": "AAPL", "price": 200},
            {"price": 5},
            {"ticker": "MSFT", "price": 459.59}
        ]))
        .unwrap();

        let tickers: Vec<_> = batch.iter().map(|t| t.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn test_batch_rejections() {
        assert_eq!(
            MarketBatch::from_frame(&json!({"ticker": "AAPL"})),
            Err(BatchRejection::NotArray)
        );
        assert_eq!(MarketBatch::from_frame(&Value::Null), Err(BatchRejection::NotArray));
        assert_eq!(MarketBatch::from_frame(&json!([])), Err(BatchRejection::Empty));
        assert_eq!(
            MarketBatch::from_frame(&json!([{"foo": 1}, 3])),
            Err(BatchRejection::NoValidTicks(2))
        );
    }

    #[test]
    fn test_series_views() {
        let mut series = MarketSeries::new();
        assert!(series.is_empty());

        series.push(
            MarketBatch::from_frame(&json!([
                {"ticker": "AAPL", "price": 200, "date": "2025-06-01T00:00:00Z"},
                {"ticker": "TSLA", "price": 345.76}
            ]))
            .unwrap(),
        );
        series.push(MarketBatch::from_frame(&json!([{"ticker": "AAPL", "price": 201}])).unwrap());

        assert_eq!(series.len(), 2);
        assert_eq!(series.tick_count(), 3);

        let aapl = series.series_for("AAPL");
        assert_eq!(aapl.len(), 2);
        assert_eq!((aapl[0].batch_index, aapl[0].price), (0, 200.0));
        assert!(aapl[0].timestamp.is_some());
        assert_eq!((aapl[1].batch_index, aapl[1].price), (1, 201.0));
        assert!(series.series_for("GOOGL").is_empty());

        let latest = series.latest_prices();
        assert_eq!(latest.get("AAPL"), Some(&201.0));
        assert_eq!(latest.get("TSLA"), Some(&345.76));
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let snapshot: InitialSnapshot = serde_json::from_value(json!({
            "status": "success",
            "message": [{"ticker": "AAPL", "price": 200}]
        }))
        .unwrap();
        assert_eq!(snapshot.status, "success");
        assert_eq!(snapshot.batch().map(|b| b.len()), Some(1));

        let bare: InitialSnapshot = serde_json::from_value(json!({})).unwrap();
        assert_eq!(bare, InitialSnapshot::default());
        assert!(bare.batch().is_none());
    }
}
