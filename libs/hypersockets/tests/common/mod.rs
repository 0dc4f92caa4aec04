//! Common test utilities for HyperSockets integration tests
//!
//! Provides a scripted mock WebSocket server: every accepted connection runs
//! the same list of [`ServerAction`]s, and the server records what it saw.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

/// One step of the per-connection server script
#[derive(Debug, Clone)]
pub enum ServerAction {
    /// Send a text frame
    Text(String),
    /// Wait before the next step
    Sleep(Duration),
    /// Start the close handshake
    Close,
    /// Drop the TCP stream without a close handshake
    Drop,
}

/// What the server observed
#[derive(Debug, Default)]
pub struct ServerLog {
    pub connections: AtomicUsize,
    pub close_frames: AtomicUsize,
    pub request_uris: Mutex<Vec<String>>,
}

impl ServerLog {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn close_frames(&self) -> usize {
        self.close_frames.load(Ordering::SeqCst)
    }
}

/// A scripted mock WebSocket server for testing
pub struct MockWsServer {
    pub addr: SocketAddr,
    pub log: Arc<ServerLog>,
    shutdown: Arc<Notify>,
}

impl MockWsServer {
    /// Start a server that runs `script` on every connection, then holds it open
    pub async fn start(script: Vec<ServerAction>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let log = Arc::new(ServerLog::default());
        let script = Arc::new(script);

        let shutdown_clone = shutdown.clone();
        let log_clone = log.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let shutdown = shutdown_clone.clone();
                                let log = log_clone.clone();
                                let script = script.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, script, log, shutdown).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            log,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        script: Arc<Vec<ServerAction>>,
        log: Arc<ServerLog>,
        shutdown: Arc<Notify>,
    ) {
        let uri_log = log.clone();
        let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            uri_log.request_uris.lock().push(request.uri().to_string());
            Ok(response)
        };

        let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };
        log.connections.fetch_add(1, Ordering::SeqCst);

        let (write, mut read) = ws_stream.split();

        // Client frames are read while the script runs, so a close sent
        // mid-script is still counted
        let script_run = Self::run_script(write, script);
        tokio::pin!(script_run);
        let mut script_done = false;

        loop {
            tokio::select! {
                dropped = &mut script_run, if !script_done => {
                    if dropped {
                        return;
                    }
                    script_done = true;
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(msg)) if msg.is_close() => {
                            log.close_frames.fetch_add(1, Ordering::SeqCst);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => break,
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Play `script` on the write half; true when it asks to drop the stream
    async fn run_script(mut write: WsSink, script: Arc<Vec<ServerAction>>) -> bool {
        for action in script.iter() {
            match action {
                ServerAction::Text(text) => {
                    if write.send(Message::Text(text.clone())).await.is_err() {
                        return false;
                    }
                }
                ServerAction::Sleep(duration) => tokio::time::sleep(*duration).await,
                ServerAction::Close => {
                    let _ = write.send(Message::Close(None)).await;
                }
                ServerAction::Drop => return true,
            }
        }
        false
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// URL with a path and token, shaped like the real feeds
    pub fn feed_url(&self, path: &str, token: &str) -> String {
        format!("ws://{}{}?token={}", self.addr, path, token)
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
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
