//! Trade progress tracker
//!
//! Optionally submits a trade, then follows the trade-progress feed until the
//! trade completes or fails.
//!
//! Usage: `trade_progress [--submit TICKER QUANTITY PRICE buy|sell]`

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tradedesk_stream::bin_common::{
    load_config_from_env, parse_args, parse_submit_args, BinaryRunner, ConfigType, RunConfig,
};
use tradedesk_stream::tradedesk::infrastructure::fetch_token;
use tradedesk_stream::tradedesk::{
    init_tracing, CredentialProvider, EnvCredential, FeedSession, ShutdownManager, StreamConfig,
    TrackerView, TradeClient, TradeProgressTracker, TradeRequest, TradeState,
};

struct TradeProgressApp {
    run_config: RunConfig,
    config: StreamConfig,
    shutdown: ShutdownManager,
    credentials: Arc<dyn CredentialProvider>,
    submit: Option<TradeRequest>,
    final_state: Option<TradeState>,
}

impl TradeProgressApp {
    async fn submit_trade(&self, request: &TradeRequest) -> Result<()> {
        let client = TradeClient::new(self.config.endpoints()?, self.config.api.request_timeout())?;
        let token = fetch_token(self.credentials.as_ref(), self.config.api.credential_timeout()).await?;

        info!(
            "[Trade] Submitting {} {} x{} @ {:.2}",
            request.trade_type, request.ticker, request.quantity, request.price
        );
        match client.submit(&token, request).await {
            TradeState::Failed(reason) => bail!("trade rejected: {}", reason),
            state => info!("[Trade] {:?}", state),
        }
        Ok(())
    }
}

impl BinaryRunner for TradeProgressApp {
    async fn run(&mut self) -> Result<()> {
        // Subscribe first so no early progress frame is missed
        let tracker = TradeProgressTracker::from_config(&self.config)?;
        let mut session =
            FeedSession::from_config(tracker, Arc::clone(&self.credentials), &self.config)?;
        session.start().await?;

        if let Some(request) = self.submit.clone() {
            if let Err(e) = self.submit_trade(&request).await {
                session.stop().await;
                return Err(e);
            }
        }

        let mut last_percent: Option<u8> = None;
        session
            .run(&self.shutdown, |tracker, summary| {
                for error in &summary.errors {
                    warn!("[Trade] Feed error: {}", error);
                }

                match tracker.view() {
                    TrackerView::Connecting => {
                        if summary.disconnected {
                            info!("[Trade] Waiting for connection...");
                        }
                        true
                    }
                    TrackerView::Detail(frame) => {
                        if last_percent != Some(frame.percent()) {
                            info!(
                                "[Trade] {} {} x{}: {}% {}",
                                frame.trade_id,
                                frame.ticker,
                                frame.quantity,
                                frame.percent(),
                                frame.message
                            );
                            last_percent = Some(frame.percent());
                        }
                        !frame.is_terminal()
                    }
                }
            })
            .await?;

        self.final_state = session.feed().trade_state();
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        self.final_state
            .as_ref()
            .map(|state| format!("Final trade state: {:?}", state))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let submit = parse_submit_args(&parse_args())?;
    let config = StreamConfig::load(load_config_from_env(ConfigType::Stream))?;

    init_tracing(&config.log_level);
    config.log();
    config.require_token()?;

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let mut app = TradeProgressApp {
        run_config: RunConfig::new("Trade Progress"),
        config,
        shutdown,
        credentials: Arc::new(EnvCredential::from_default_var()),
        submit,
        final_state: None,
    };
    app.execute().await
}
