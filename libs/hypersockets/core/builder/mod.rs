pub mod states;

use crate::client::ConnectionManager;
use crate::config::{ConnectionConfig, DEFAULT_CLOSE_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
use crate::traits::*;
use states::*;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for [`ConnectionManager`]
///
/// `build()` is only available once a decoder has been set.
pub struct ConnectionManagerBuilder<Dc, D>
where
    Dc: DecoderState,
{
    _state: TypeState<Dc>,
    decoder: Option<D>,
    label: String,
    connect_timeout: Duration,
    close_timeout: Duration,
}

impl ConnectionManagerBuilder<NoDecoder, ()> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            decoder: None,
            label: "WS".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Set the decoder applied to every inbound frame
    pub fn decoder<D: FrameDecoder>(self, decoder: D) -> ConnectionManagerBuilder<HasDecoder, D> {
        ConnectionManagerBuilder {
            _state: TypeState::new(),
            decoder: Some(decoder),
            label: self.label,
            connect_timeout: self.connect_timeout,
            close_timeout: self.close_timeout,
        }
    }
}

impl Default for ConnectionManagerBuilder<NoDecoder, ()> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration, available in every state
impl<Dc, D> ConnectionManagerBuilder<Dc, D>
where
    Dc: DecoderState,
{
    /// Log prefix for this connection (e.g. `MarketWS`)
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Bound on the WebSocket handshake
    ///
    /// A handshake that does not finish in time is reported like any other
    /// transport error followed by a close.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// How long a teardown waits for the old connection to finish closing
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }
}

// Build method - only available when the decoder is set
impl<D> ConnectionManagerBuilder<HasDecoder, D>
where
    D: FrameDecoder,
{
    pub fn build(self) -> Result<ConnectionManager<D>> {
        let decoder = self
            .decoder
            .ok_or_else(|| HyperSocketError::Configuration("decoder must be set".into()))?;

        if self.connect_timeout.is_zero() {
            return Err(HyperSocketError::Configuration(
                "connect timeout must be greater than zero".into(),
            ));
        }

        let config = ConnectionConfig {
            label: self.label,
            decoder: Arc::new(decoder),
            connect_timeout: self.connect_timeout,
            close_timeout: self.close_timeout,
        };

        Ok(ConnectionManager::new(config))
    }
}
