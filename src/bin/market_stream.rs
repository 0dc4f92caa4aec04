//! Market data stream
//!
//! Opens the market feed with a token from the environment, fetches the
//! initial snapshot and logs every batch as it arrives.
//!
//! Usage: `market_stream [TICKER...]`

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};
use tradedesk_stream::bin_common::{
    load_config_from_env, parse_args, parse_tickers, BinaryRunner, ConfigType, RunConfig,
};
use tradedesk_stream::tradedesk::{
    init_tracing, DisplayState, EnvCredential, FeedSession, MarketDataStream, ShutdownManager,
    StreamConfig,
};

struct MarketStreamApp {
    run_config: RunConfig,
    config: StreamConfig,
    shutdown: ShutdownManager,
    batches_seen: usize,
}

impl BinaryRunner for MarketStreamApp {
    async fn run(&mut self) -> Result<()> {
        let stream = MarketDataStream::from_config(&self.config)?;
        let mut session = FeedSession::from_config(
            stream,
            Arc::new(EnvCredential::from_default_var()),
            &self.config,
        )?;

        let mut heartbeat = self.run_config.heartbeat();
        let mut last_state: Option<DisplayState> = None;
        let mut batches_seen = 0;

        session
            .run(&self.shutdown, |stream, summary| {
                let state = stream.display_state();
                if last_state.as_ref() != Some(&state) {
                    match &state {
                        DisplayState::Error(message) => info!("[Market] Error: {}", message),
                        other => info!("[Market] {:?}", other),
                    }
                    last_state = Some(state);
                }

                if summary.accepted > 0 {
                    batches_seen += summary.accepted;
                    if let Some(batch) = stream.series().last_batch() {
                        for tick in batch.iter() {
                            debug!(
                                "[Market] {} {:.2} {}",
                                tick.ticker,
                                tick.price,
                                tick.timestamp.as_deref().unwrap_or("-")
                            );
                        }
                    }
                }

                if heartbeat.due() {
                    let prices: Vec<String> = stream
                        .series()
                        .latest_prices()
                        .iter()
                        .map(|(ticker, price)| format!("{}={:.2}", ticker, price))
                        .collect();
                    info!(
                        "[Market] {} batches, {} ticks | {}",
                        stream.series().len(),
                        stream.series().tick_count(),
                        prices.join(" ")
                    );
                }
                true
            })
            .await?;

        self.batches_seen = batches_seen;
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn stats(&self) -> Option<String> {
        Some(format!("Batches received: {}", self.batches_seen))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = StreamConfig::load(load_config_from_env(ConfigType::Stream))?;
    if let Some(tickers) = parse_tickers(&parse_args()) {
        config.market.tickers = tickers;
        config.validate()?;
    }

    init_tracing(&config.log_level);
    config.log();
    config.require_token()?;

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let mut app = MarketStreamApp {
        run_config: RunConfig::new("Market Stream"),
        config,
        shutdown,
        batches_seen: 0,
    };
    app.execute().await
}
