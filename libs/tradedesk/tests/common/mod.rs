//! Common test utilities for trade desk integration tests
//!
//! Provides a mock feed host (both socket paths on one port, scripted per
//! path and connection number) and helpers around the wiremock REST API.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tradedesk::{StreamConfig, TradeProgressFrame};

pub const MARKET_PATH: &str = "/market-data/ws";
pub const TRADE_PATH: &str = "/trade-progress/ws";

/// One step of a connection script
#[derive(Debug, Clone)]
pub enum FeedAction {
    Send(String),
    Pause(Duration),
    /// Start the close handshake
    Close,
    /// Drop the TCP stream without a close handshake
    Drop,
}

/// Picks the script for the `n`-th (0-based) connection to `path`
pub type ScriptFn = dyn Fn(&str, usize) -> Vec<FeedAction> + Send + Sync;

/// Connections the feed host accepted, as `path?query`
#[derive(Debug, Default)]
pub struct FeedLog {
    pub uris: Mutex<Vec<String>>,
    pub market_connections: AtomicUsize,
    pub trade_connections: AtomicUsize,
}

impl FeedLog {
    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().clone()
    }

    pub fn connections(&self, path: &str) -> usize {
        match path {
            MARKET_PATH => self.market_connections.load(Ordering::SeqCst),
            _ => self.trade_connections.load(Ordering::SeqCst),
        }
    }
}

/// Serves both feed paths from one address
pub struct MockFeedHost {
    pub addr: SocketAddr,
    pub log: Arc<FeedLog>,
    shutdown: Arc<Notify>,
}

impl MockFeedHost {
    pub async fn start(script: impl Fn(&str, usize) -> Vec<FeedAction> + Send + Sync + 'static) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let log = Arc::new(FeedLog::default());
        let script: Arc<ScriptFn> = Arc::new(script);

        let accept_shutdown = shutdown.clone();
        let accept_log = log.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let shutdown = accept_shutdown.clone();
                        let log = accept_log.clone();
                        let script = script.clone();
                        tokio::spawn(async move {
                            Self::serve(stream, script, log, shutdown).await;
                        });
                    }
                    _ = accept_shutdown.notified() => break,
                }
            }
        });

        Self {
            addr,
            log,
            shutdown,
        }
    }

    /// Same script for every connection to every path
    pub async fn with_script(actions: Vec<FeedAction>) -> Self {
        Self::start(move |_, _| actions.clone()).await
    }

    async fn serve(
        stream: TcpStream,
        script: Arc<ScriptFn>,
        log: Arc<FeedLog>,
        shutdown: Arc<Notify>,
    ) {
        let seen_path = Arc::new(Mutex::new(String::new()));
        let callback_path = seen_path.clone();
        let callback_log = log.clone();
        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            *callback_path.lock() = request.uri().path().to_string();
            callback_log.uris.lock().push(request.uri().to_string());
            Ok(response)
        };

        let Ok(ws_stream) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
            return;
        };

        let path = seen_path.lock().clone();
        let counter = if path == MARKET_PATH {
            &log.market_connections
        } else {
            &log.trade_connections
        };
        let n = counter.fetch_add(1, Ordering::SeqCst);

        let (mut write, mut read) = ws_stream.split();
        for action in (*script)(&path, n) {
            match action {
                FeedAction::Send(text) => {
                    if write.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                FeedAction::Pause(duration) => tokio::time::sleep(duration).await,
                FeedAction::Close => {
                    let _ = write.send(Message::Close(None)).await;
                }
                FeedAction::Drop => return,
            }
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    if !matches!(msg, Some(Ok(_))) {
                        break;
                    }
                }
                _ = shutdown.notified() => break,
            }
        }
    }

    pub fn api_config(&self, api_base: &str) -> StreamConfig {
        let mut config = StreamConfig::default();
        config.api.base_url = api_base.to_string();
        config.api.ws_base_url = Some(format!("ws://{}", self.addr));
        config.api.request_timeout_ms = 2000;
        config.api.connect_timeout_ms = 2000;
        config
    }

    pub fn feed_url(&self, path: &str, token: &str) -> String {
        format!("ws://{}{}?token={}", self.addr, path, token)
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockFeedHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One market batch frame
pub fn batch(ticks: &[(&str, f64)]) -> String {
    let ticks: Vec<Value> = ticks
        .iter()
        .map(|(ticker, price)| {
            json!({"ticker": ticker, "price": price, "timestamp": "2024-01-15T10:30:00Z"})
        })
        .collect();
    Value::Array(ticks).to_string()
}

/// One trade progress frame
pub fn progress(progress: f64, status: Option<&str>) -> String {
    let mut frame = json!({
        "trader_id": "trader_001",
        "trade_id": "3f9c2a1e-7b7d-4c1e-9a61-2f1d5c0b8e42",
        "ticker": "AAPL",
        "quantity": 10,
        "message": format!("Processing {}%", progress),
        "event": "trade_progress",
        "progress": progress,
    });
    if let Some(status) = status {
        frame["status"] = json!(status);
        frame["event"] = json!("trade_completed");
    }
    frame.to_string()
}

pub fn parse_progress(raw: &str) -> TradeProgressFrame {
    serde_json::from_str(raw).unwrap()
}

/// Poll `condition` until it holds or `timeout` elapses
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
