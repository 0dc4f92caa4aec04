//! Trade desk API clients
//!
//! Provides endpoint construction for the REST API and both push feeds, plus
//! the snapshot and trade-submission clients.

pub mod endpoints;
pub mod rest;

pub use endpoints::{EndpointError, Endpoints, FeedKind};
pub use rest::{
    extract_error_message, RestError, SnapshotFetcher, TradeAck, TradeClient,
    GENERIC_SNAPSHOT_ERROR, GENERIC_TRADE_ERROR,
};
