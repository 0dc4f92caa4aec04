//! Credential-aware feed sessions
//!
//! A [`FeedSession`] fetches a fresh credential, builds the socket URL for its
//! feed and hands both to the feed. When the connection drops it consults a
//! [`ReconnectionStrategy`] and reconnects with another fresh credential.
//! Nothing is reconnected unless a strategy says so.

use super::stream::PumpSummary;
use crate::infrastructure::{
    fetch_token, ConfigError, CredentialError, CredentialProvider, EndpointError, Endpoints,
    FeedKind, RestError, ShutdownManager, StreamConfig,
};
use hypersockets::{ConnectionStatus, HyperSocketError, NeverReconnect, ReconnectionStrategy};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Idle wait between pumps when nothing happened
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const DEFAULT_CREDENTIAL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Socket error: {0}")]
    Socket(#[from] HyperSocketError),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("REST client error: {0}")]
    Rest(#[from] RestError),
}

/// A feed a [`FeedSession`] can drive
pub trait SessionFeed {
    fn kind(&self) -> FeedKind;

    /// Status as of the last pump
    fn status(&self) -> ConnectionStatus;

    /// Apply everything queued since the last pump
    fn pump(&mut self) -> PumpSummary;

    /// Assign URL and credential; `None` URL closes the connection
    async fn attach(
        &mut self,
        url: Option<String>,
        credential: Option<String>,
    ) -> hypersockets::Result<()>;

    /// Force a new connection, even to the same URL
    async fn reattach(&mut self, url: String, credential: String) -> hypersockets::Result<()>;
}

/// Drives one feed: credential, URL, reconnection
pub struct FeedSession<F> {
    feed: F,
    credentials: Arc<dyn CredentialProvider>,
    endpoints: Endpoints,
    strategy: Box<dyn ReconnectionStrategy>,
    credential_timeout: Duration,
    attempt: usize,
    started: bool,
}

impl<F: SessionFeed> FeedSession<F> {
    /// Never reconnects until [`Self::with_reconnect`] says otherwise
    pub fn new(feed: F, credentials: Arc<dyn CredentialProvider>, endpoints: Endpoints) -> Self {
        Self {
            feed,
            credentials,
            endpoints,
            strategy: Box::new(NeverReconnect),
            credential_timeout: DEFAULT_CREDENTIAL_TIMEOUT,
            attempt: 0,
            started: false,
        }
    }

    /// Endpoints, reconnect strategy and credential timeout from `config`
    pub fn from_config(
        feed: F,
        credentials: Arc<dyn CredentialProvider>,
        config: &StreamConfig,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(feed, credentials, config.endpoints()?)
            .with_reconnect(config.reconnect.build_strategy())
            .with_credential_timeout(config.api.credential_timeout()))
    }

    pub fn with_reconnect(mut self, strategy: Box<dyn ReconnectionStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_credential_timeout(mut self, timeout: Duration) -> Self {
        self.credential_timeout = timeout;
        self
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn feed_mut(&mut self) -> &mut F {
        &mut self.feed
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Reconnection attempts since the last successful connection
    pub fn attempt(&self) -> usize {
        self.attempt
    }

    fn label(&self) -> &'static str {
        self.feed.kind().label()
    }

    /// Fetch a credential and open the feed
    ///
    /// On a credential failure the feed keeps no URL, so nothing connects.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        let token = fetch_token(self.credentials.as_ref(), self.credential_timeout)
            .await
            .map_err(|e| {
                warn!("[Session] {} not started: {}", self.label(), e);
                e
            })?;
        let url = self.endpoints.socket_url(self.feed.kind(), &token)?;

        self.feed.attach(Some(url), Some(token)).await?;
        self.started = true;
        self.attempt = 0;
        info!("[Session] {} started", self.label());
        Ok(())
    }

    /// Close the feed and forget the credential
    pub async fn stop(&mut self) {
        self.started = false;
        if let Err(e) = self.feed.attach(None, None).await {
            warn!("[Session] {} close failed: {}", self.label(), e);
        }
        info!("[Session] {} stopped", self.label());
    }

    pub fn pump(&mut self) -> PumpSummary {
        let summary = self.feed.pump();
        if summary.connected && self.feed.status().connected {
            self.attempt = 0;
        }
        summary
    }

    /// Reconnect after a drop, if the strategy allows it
    ///
    /// Returns `Ok(false)` when the strategy gave up, the session is not
    /// started, or shutdown was requested during the delay.
    pub async fn recover(&mut self, shutdown: &ShutdownManager) -> Result<bool, SessionError> {
        if !self.started {
            return Ok(false);
        }

        let Some(delay) = self.strategy.next_delay(self.attempt) else {
            info!(
                "[Session] {} closed; not reconnecting ({} strategy, {} attempts)",
                self.label(),
                self.strategy.name(),
                self.attempt
            );
            return Ok(false);
        };
        self.attempt += 1;
        info!(
            "[Session] Reconnecting {} in {:?} (attempt {})",
            self.label(),
            delay,
            self.attempt
        );

        if !shutdown.interruptible_sleep(delay).await {
            return Ok(false);
        }

        let token = match fetch_token(self.credentials.as_ref(), self.credential_timeout).await {
            Ok(token) => token,
            Err(e) => {
                warn!("[Session] {} credential refresh failed: {}", self.label(), e);
                self.stop().await;
                return Err(e.into());
            }
        };
        let url = self.endpoints.socket_url(self.feed.kind(), &token)?;

        self.feed.reattach(url, token).await?;
        Ok(true)
    }

    /// Pump until shutdown, a drop the strategy won't recover, or `on_update`
    /// returns `false`; the feed is closed on the way out
    pub async fn run<C>(&mut self, shutdown: &ShutdownManager, mut on_update: C) -> Result<(), SessionError>
    where
        C: FnMut(&F, &PumpSummary) -> bool,
    {
        if !self.started {
            self.start().await?;
        }

        let result = loop {
            if !shutdown.is_running() {
                info!("[Session] {} received shutdown signal", self.label());
                break Ok(());
            }

            let summary = self.pump();
            if summary.is_empty() {
                sleep(POLL_INTERVAL).await;
                continue;
            }

            if !on_update(&self.feed, &summary) {
                debug!("[Session] {} finished by consumer", self.label());
                break Ok(());
            }

            if summary.disconnected && !self.feed.status().connected {
                match self.recover(shutdown).await {
                    Ok(true) => {}
                    Ok(false) => break Ok(()),
                    Err(e) => break Err(e),
                }
            }
        };

        if self.started {
            self.stop().await;
        }
        result
    }
}
