use crate::traits::*;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on the WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default wait for a connection task to finish after a close request
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Configuration shared by the connection manager and its connection tasks
///
/// Built by [`crate::builder::ConnectionManagerBuilder`].
pub struct ConnectionConfig<D>
where
    D: FrameDecoder,
{
    /// Label used as log prefix, e.g. `MarketWS`
    pub(crate) label: String,

    /// Decoder applied to every data frame
    pub(crate) decoder: Arc<D>,

    /// Handshake timeout; a hanging handshake surfaces as a transport error
    pub(crate) connect_timeout: Duration,

    /// How long teardown waits for the connection task before aborting it
    pub(crate) close_timeout: Duration,
}

impl<D> ConnectionConfig<D>
where
    D: FrameDecoder,
{
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn close_timeout(&self) -> Duration {
        self.close_timeout
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}
