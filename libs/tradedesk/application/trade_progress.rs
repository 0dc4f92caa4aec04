//! Trade progress tracker
//!
//! Keeps the most recent progress frame of the trade feed. Frames that fail
//! to decode are counted but never replace the last good one.

use super::session::{SessionError, SessionFeed};
use super::stream::{KeepLatest, PumpSummary, Subscription};
use crate::domain::{TrackerView, TradeProgressFrame, TradeState};
use crate::infrastructure::{FeedKind, StreamConfig};
use hypersockets::{ConnectionManager, ConnectionStatus, Metrics, TypedJsonDecoder};

type ProgressDecoder = TypedJsonDecoder<TradeProgressFrame>;

#[derive(Debug)]
pub struct TradeProgressTracker {
    subscription: Subscription<ProgressDecoder, KeepLatest<TradeProgressFrame>>,
}

impl TradeProgressTracker {
    pub fn new(manager: ConnectionManager<ProgressDecoder>) -> Self {
        Self {
            subscription: Subscription::new(manager, KeepLatest::new()),
        }
    }

    /// Manager labelled `TradeWS` with the timeouts from `config`
    pub fn from_config(config: &StreamConfig) -> Result<Self, SessionError> {
        let manager = hypersockets::builder()
            .label(FeedKind::TradeProgress.label())
            .connect_timeout(config.api.connect_timeout())
            .close_timeout(config.api.close_timeout())
            .decoder(ProgressDecoder::new())
            .build()?;

        Ok(Self::new(manager))
    }

    pub fn latest(&self) -> Option<&TradeProgressFrame> {
        self.subscription.state().as_ref()
    }

    pub fn view(&self) -> TrackerView {
        TrackerView::derive(self.status().connected, self.latest())
    }

    /// Lifecycle state implied by the latest frame
    pub fn trade_state(&self) -> Option<TradeState> {
        self.latest().map(TradeState::from_frame)
    }

    pub fn status(&self) -> ConnectionStatus {
        self.subscription.status()
    }

    pub fn metrics(&self) -> Metrics {
        self.subscription.manager().metrics()
    }

    pub fn pump(&mut self) -> PumpSummary {
        self.subscription.pump()
    }
}

impl SessionFeed for TradeProgressTracker {
    fn kind(&self) -> FeedKind {
        FeedKind::TradeProgress
    }

    fn status(&self) -> ConnectionStatus {
        TradeProgressTracker::status(self)
    }

    fn pump(&mut self) -> PumpSummary {
        TradeProgressTracker::pump(self)
    }

    // The progress feed authenticates through the URL only
    async fn attach(
        &mut self,
        url: Option<String>,
        _credential: Option<String>,
    ) -> hypersockets::Result<()> {
        self.subscription.set_url(url).await
    }

    async fn reattach(&mut self, url: String, _credential: String) -> hypersockets::Result<()> {
        self.subscription.reopen(url).await
    }
}
