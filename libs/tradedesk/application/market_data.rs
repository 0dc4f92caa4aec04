//! Market data stream
//!
//! Combines the market feed (an append-only series of batches) with the
//! authenticated initial snapshot. Every successful connection triggers one
//! snapshot read when a credential is present, even if the connection is
//! already gone by the time its events are pumped. While connected, a changed
//! credential or ticker set triggers another. Responses for a superseded
//! request are dropped.

use super::session::{SessionError, SessionFeed};
use super::stream::{AppendBatches, PumpSummary, Subscription};
use crate::domain::{DisplayState, InitialSnapshot, MarketSeries};
use crate::infrastructure::{FeedKind, RestError, SnapshotFetcher, StreamConfig};
use crossbeam_channel::{unbounded, Receiver, Sender};
use hypersockets::{ConnectionManager, ConnectionStatus, Decoded, JsonDecoder, Metrics};
use serde_json::Value;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What a snapshot request was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotKey {
    epoch: u64,
    credential: String,
    tickers: Vec<String>,
}

struct SnapshotOutcome {
    request_id: u64,
    result: Result<InitialSnapshot, RestError>,
}

/// Market feed plus initial snapshot
pub struct MarketDataStream {
    subscription: Subscription<JsonDecoder, AppendBatches>,
    fetcher: Arc<SnapshotFetcher>,
    tickers: Vec<String>,
    credential: Option<String>,
    initial_snapshot: Option<InitialSnapshot>,
    error: Option<String>,
    requested: Option<SnapshotKey>,
    /// Last connection epoch a read was issued for
    served_epoch: u64,
    request_id: u64,
    in_flight: Option<JoinHandle<()>>,
    outcome_tx: Sender<SnapshotOutcome>,
    outcome_rx: Receiver<SnapshotOutcome>,
}

impl MarketDataStream {
    pub fn new(
        manager: ConnectionManager<JsonDecoder>,
        fetcher: Arc<SnapshotFetcher>,
        tickers: Vec<String>,
    ) -> Self {
        let (outcome_tx, outcome_rx) = unbounded();
        Self {
            subscription: Subscription::new(manager, AppendBatches),
            fetcher,
            tickers,
            credential: None,
            initial_snapshot: None,
            error: None,
            requested: None,
            served_epoch: 0,
            request_id: 0,
            in_flight: None,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Manager labelled `MarketWS`, fetcher and tickers from `config`
    pub fn from_config(config: &StreamConfig) -> Result<Self, SessionError> {
        let manager = hypersockets::builder()
            .label(FeedKind::MarketData.label())
            .connect_timeout(config.api.connect_timeout())
            .close_timeout(config.api.close_timeout())
            .decoder(JsonDecoder)
            .build()?;
        let fetcher = SnapshotFetcher::new(config.endpoints()?, config.api.request_timeout())?;

        Ok(Self::new(manager, Arc::new(fetcher), config.market.tickers.clone()))
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Replace the ticker set; a different set invalidates any pending snapshot
    pub fn set_tickers(&mut self, tickers: Vec<String>) {
        if tickers == self.tickers {
            return;
        }
        self.tickers = tickers;
        self.invalidate_request();
        self.maybe_fetch_snapshot();
    }

    /// Replace the credential; a different one invalidates any pending snapshot
    pub fn set_credential(&mut self, credential: Option<String>) {
        if credential == self.credential {
            return;
        }
        self.credential = credential;
        self.invalidate_request();
        self.maybe_fetch_snapshot();
    }

    pub fn series(&self) -> &MarketSeries {
        self.subscription.state()
    }

    pub fn initial_snapshot(&self) -> Option<&InitialSnapshot> {
        self.initial_snapshot.as_ref()
    }

    /// Message of the last failed snapshot read; cleared by a successful one
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.subscription.status()
    }

    pub fn connection_epoch(&self) -> u64 {
        self.subscription.connection_epoch()
    }

    /// Most recent frame of the current connection, appended or not
    pub fn latest_message(&self) -> Option<Decoded<Value>> {
        self.subscription.manager().latest_message()
    }

    pub fn metrics(&self) -> Metrics {
        self.subscription.manager().metrics()
    }

    pub fn has_data(&self) -> bool {
        self.initial_snapshot.is_some() || !self.series().is_empty()
    }

    /// Snapshot failures win over transport errors; both win over data
    pub fn display_state(&self) -> DisplayState {
        let error = self.error().or(self.subscription.transport_error());
        DisplayState::derive(error, self.status().connected, self.has_data())
    }

    /// Apply queued socket events and snapshot responses
    pub fn pump(&mut self) -> PumpSummary {
        let mut summary = self.subscription.pump();
        summary.external_updates += self.apply_snapshot_outcomes();
        self.maybe_fetch_snapshot();
        summary
    }

    fn apply_snapshot_outcomes(&mut self) -> usize {
        let mut applied = 0;

        while let Ok(SnapshotOutcome { request_id, result }) = self.outcome_rx.try_recv() {
            if request_id != self.request_id {
                debug!(
                    "[Snapshot] Dropping stale response #{} (current #{})",
                    request_id, self.request_id
                );
                continue;
            }
            self.in_flight = None;

            match result {
                Ok(snapshot) => {
                    info!("[Snapshot] Initial snapshot ready (status '{}')", snapshot.status);
                    self.initial_snapshot = Some(snapshot);
                    self.error = None;
                }
                Err(e) => {
                    let message = e.user_message();
                    warn!("[Snapshot] Fetch failed: {}", message);
                    self.error = Some(message);
                }
            }
            applied += 1;
        }

        applied
    }

    /// Supersede the pending request; its response will be dropped
    fn invalidate_request(&mut self) {
        self.request_id += 1;
        self.requested = None;
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn maybe_fetch_snapshot(&mut self) {
        let epoch = self.subscription.connection_epoch();
        let unserved = epoch > self.served_epoch;
        if !self.subscription.status().connected && !unserved {
            return;
        }
        let Some(credential) = self.credential.clone() else {
            return;
        };

        let key = SnapshotKey {
            epoch,
            credential,
            tickers: self.tickers.clone(),
        };
        if self.requested.as_ref() == Some(&key) {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!("[Snapshot] No async runtime; snapshot not requested");
            return;
        };

        self.invalidate_request();
        let request_id = self.request_id;
        let fetcher = Arc::clone(&self.fetcher);
        let outcome_tx = self.outcome_tx.clone();
        let SnapshotKey {
            credential,
            tickers,
            ..
        } = key.clone();

        debug!(
            "[Snapshot] Request #{} for {} tickers (epoch {})",
            request_id,
            tickers.len(),
            key.epoch
        );
        self.in_flight = Some(runtime.spawn(async move {
            let result = fetcher.fetch(&credential, &tickers).await;
            let _ = outcome_tx.send(SnapshotOutcome { request_id, result });
        }));
        self.requested = Some(key);
        self.served_epoch = epoch;
    }
}

impl SessionFeed for MarketDataStream {
    fn kind(&self) -> FeedKind {
        FeedKind::MarketData
    }

    fn status(&self) -> ConnectionStatus {
        MarketDataStream::status(self)
    }

    fn pump(&mut self) -> PumpSummary {
        MarketDataStream::pump(self)
    }

    async fn attach(
        &mut self,
        url: Option<String>,
        credential: Option<String>,
    ) -> hypersockets::Result<()> {
        // A new URL means a new connection; nothing pending belongs to it
        if self.subscription.manager().url() != url.as_deref() {
            self.invalidate_request();
        }
        self.set_credential(credential);
        self.subscription.set_url(url).await
    }

    async fn reattach(&mut self, url: String, credential: String) -> hypersockets::Result<()> {
        self.invalidate_request();
        self.set_credential(Some(credential));
        self.subscription.reopen(url).await
    }
}

impl Drop for MarketDataStream {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for MarketDataStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketDataStream")
            .field("tickers", &self.tickers)
            .field("status", &self.status())
            .field("batches", &self.series().len())
            .field("has_snapshot", &self.initial_snapshot.is_some())
            .field("error", &self.error)
            .finish()
    }
}
