//! Subscribe + accumulate
//!
//! A [`Subscription`] owns one connection manager and folds every decoded
//! frame into a state value through an [`Accumulator`]. The two strategies
//! used by the feeds are [`AppendBatches`] (market series) and
//! [`KeepLatest`] (trade progress).

use crate::domain::{MarketBatch, MarketSeries};
use hypersockets::{ClientEvent, ConnectionManager, ConnectionStatus, Decoded, FrameDecoder};
use serde_json::Value;
use std::fmt::Debug;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

/// Folds decoded frames into a state value
///
/// `accumulate` must depend only on the previous state and the frame.
pub trait Accumulator: Send {
    type Item;
    type State: Default;

    /// Apply one frame; returns whether the state changed
    fn accumulate(&self, state: &mut Self::State, frame: &Decoded<Self::Item>) -> bool;
}

/// Appends every non-empty array-shaped frame to a [`MarketSeries`]
///
/// Null, non-array, empty and all-invalid frames leave the series untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendBatches;

impl Accumulator for AppendBatches {
    type Item = Value;
    type State = MarketSeries;

    fn accumulate(&self, series: &mut MarketSeries, frame: &Decoded<Value>) -> bool {
        let Decoded::Value(value) = frame else {
            return false;
        };

        match MarketBatch::from_frame(value) {
            Ok(batch) => {
                series.push(batch);
                true
            }
            Err(reason) => {
                debug!("[MarketWS] Frame not appended: {}", reason);
                false
            }
        }
    }
}

/// Keeps only the newest successfully decoded frame
///
/// Raw fallback frames are ignored, so a garbled frame never hides the last
/// good one.
pub struct KeepLatest<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> KeepLatest<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for KeepLatest<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send> Accumulator for KeepLatest<T> {
    type Item = T;
    type State = Option<T>;

    fn accumulate(&self, latest: &mut Option<T>, frame: &Decoded<T>) -> bool {
        match frame {
            Decoded::Value(value) => {
                *latest = Some(value.clone());
                true
            }
            Decoded::RawFallback(_) => false,
        }
    }
}

/// What one [`Subscription::pump`] observed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PumpSummary {
    /// A `Connected` event was seen
    pub connected: bool,
    /// A `Disconnected` event was seen
    pub disconnected: bool,
    /// Frames that changed the state
    pub accepted: usize,
    /// Frames left out by the accumulator
    pub ignored: usize,
    /// Transport errors, in order
    pub errors: Vec<String>,
    /// Updates applied from outside the socket (e.g. a REST snapshot)
    pub external_updates: usize,
}

impl PumpSummary {
    pub fn is_empty(&self) -> bool {
        *self == PumpSummary::default()
    }
}

/// One connection manager plus the state accumulated from its frames
///
/// Events are drained and applied in the order the manager published them.
pub struct Subscription<D, A>
where
    D: FrameDecoder,
    A: Accumulator<Item = D::Output>,
{
    manager: ConnectionManager<D>,
    accumulator: A,
    state: A::State,
    status: ConnectionStatus,
    transport_error: Option<String>,
    connection_epoch: u64,
}

impl<D, A> Subscription<D, A>
where
    D: FrameDecoder,
    A: Accumulator<Item = D::Output>,
{
    /// Starts with the accumulator's empty state
    pub fn new(manager: ConnectionManager<D>, accumulator: A) -> Self {
        Self {
            manager,
            accumulator,
            state: A::State::default(),
            status: ConnectionStatus::INITIAL,
            transport_error: None,
            connection_epoch: 0,
        }
    }

    pub fn state(&self) -> &A::State {
        &self.state
    }

    pub fn manager(&self) -> &ConnectionManager<D> {
        &self.manager
    }

    /// Status as of the last applied event
    ///
    /// Lags [`ConnectionManager::status`] until the next pump, so it always
    /// agrees with [`Self::state`] and [`Self::connection_epoch`].
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Reason of the transport error while the status carries the error flag
    pub fn transport_error(&self) -> Option<&str> {
        if self.status.error {
            self.transport_error.as_deref()
        } else {
            None
        }
    }

    /// Number of `Connected` events applied so far
    ///
    /// Each successful (re)connection starts a new epoch.
    pub fn connection_epoch(&self) -> u64 {
        self.connection_epoch
    }

    fn label(&self) -> &str {
        self.manager.config().label()
    }

    /// Assign the endpoint URL (see [`ConnectionManager::set_url`])
    pub async fn set_url(&mut self, url: Option<String>) -> hypersockets::Result<()> {
        self.manager.set_url(url).await
    }

    /// Force a fresh connection even if the URL is unchanged
    pub async fn reopen(&mut self, url: String) -> hypersockets::Result<()> {
        self.manager.reopen(url).await
    }

    pub async fn close(&mut self) {
        self.manager.close().await;
    }

    /// Apply every queued event, without waiting
    pub fn pump(&mut self) -> PumpSummary {
        let mut summary = PumpSummary::default();
        while let Some(event) = self.manager.try_recv_event() {
            self.apply(event, &mut summary);
        }
        summary
    }

    pub(crate) fn apply(&mut self, event: ClientEvent<D::Output>, summary: &mut PumpSummary) {
        match event {
            ClientEvent::Connecting => {
                debug!("[{}] Connecting", self.label());
            }
            ClientEvent::Connected => {
                self.connection_epoch += 1;
                self.status = self.status.opened();
                summary.connected = true;
                info!("[{}] Connected (epoch {})", self.label(), self.connection_epoch);
            }
            ClientEvent::Message(frame) => {
                if self.accumulator.accumulate(&mut self.state, &frame) {
                    summary.accepted += 1;
                } else {
                    summary.ignored += 1;
                }
            }
            ClientEvent::Error(reason) => {
                warn!("[{}] Transport error: {}", self.label(), reason);
                self.status = self.status.errored();
                self.transport_error = Some(reason.clone());
                summary.errors.push(reason);
            }
            ClientEvent::Disconnected => {
                self.status = self.status.closed();
                summary.disconnected = true;
                info!("[{}] Disconnected", self.label());
            }
        }
    }
}

impl<D, A> Debug for Subscription<D, A>
where
    D: FrameDecoder,
    A: Accumulator<Item = D::Output>,
    A::State: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.manager.config().label())
            .field("status", &self.status)
            .field("connection_epoch", &self.connection_epoch)
            .field("state", &self.state)
            .finish()
    }
}
