use super::endpoints::{EndpointError, Endpoints};
use crate::domain::{InitialSnapshot, TradeRequest, TradeState};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Shown when nothing more specific is known about a snapshot failure
pub const GENERIC_SNAPSHOT_ERROR: &str = "Failed to fetch market data";

/// Shown when nothing more specific is known about a trade submission failure
pub const GENERIC_TRADE_ERROR: &str = "Failed to submit trade";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RestError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-success status; `message` already went through the error-field chain
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
}

impl From<reqwest::Error> for RestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RestError::Timeout(e.to_string())
        } else {
            RestError::RequestFailed(e.to_string())
        }
    }
}

impl RestError {
    /// Human-readable message for the snapshot error state
    pub fn user_message(&self) -> String {
        self.user_message_or(GENERIC_SNAPSHOT_ERROR)
    }

    /// Server-provided detail, else the transport message, else `fallback`
    pub fn user_message_or(&self, fallback: &str) -> String {
        let candidate = match self {
            RestError::Api { message, .. } => message.as_str(),
            RestError::RequestFailed(text) | RestError::Timeout(text) => text.as_str(),
            RestError::DeserializeFailed(_) | RestError::Endpoint(_) => "",
        };

        if candidate.trim().is_empty() {
            fallback.to_string()
        } else {
            candidate.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, RestError>;

/// Pull a readable message out of an error body
///
/// Candidates, in order: `detail` (a string, or a list of `{msg}` objects
/// joined with `"; "`), `message`, `error`. Blank strings are skipped.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let non_blank = |v: Option<&Value>| {
        v.and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let detail = body.get("detail");
    if let Some(text) = non_blank(detail) {
        return Some(text);
    }
    if let Some(items) = detail.and_then(Value::as_array) {
        let messages: Vec<String> = items
            .iter()
            .filter_map(|item| non_blank(item.get("msg")))
            .collect();
        if !messages.is_empty() {
            return Some(messages.join("; "));
        }
    }

    non_blank(body.get("message")).or_else(|| non_blank(body.get("error")))
}

/// Turn a non-success response into [`RestError::Api`]
async fn api_error(response: Response) -> RestError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| extract_error_message(&value))
        .unwrap_or_else(|| format!("Request failed with status code {}", status));

    RestError::Api { status, message }
}

fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RestError::RequestFailed(e.to_string()))
}

/// Fetches the initial market snapshot
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    client: Client,
    endpoints: Endpoints,
}

impl SnapshotFetcher {
    /// Every request is bounded by `timeout`
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoints,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// One authenticated read for all tickers; no retry
    pub async fn fetch(&self, token: &str, tickers: &[String]) -> Result<InitialSnapshot> {
        let url = self.endpoints.snapshot_url(tickers)?;
        debug!("[Snapshot] Fetching {} tickers from {}", tickers.len(), url);

        let response = self.client.get(url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            let err = api_error(response).await;
            warn!("[Snapshot] {}", err);
            return Err(err);
        }

        let snapshot: InitialSnapshot = response
            .json()
            .await
            .map_err(|e| RestError::DeserializeFailed(e.to_string()))?;

        debug!("[Snapshot] Received snapshot with status '{}'", snapshot.status);
        Ok(snapshot)
    }
}

/// Acknowledgement body of a trade submission
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TradeAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub processing: bool,
    #[serde(default)]
    pub message: String,
}

/// Submits trades; progress then arrives on the trade-progress feed
#[derive(Debug, Clone)]
pub struct TradeClient {
    client: Client,
    endpoints: Endpoints,
}

impl TradeClient {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoints,
        })
    }

    /// `Queued` on 200, `Failed(reason)` otherwise; invalid requests are not sent
    pub async fn submit(&self, token: &str, request: &TradeRequest) -> TradeState {
        if let Err(e) = request.validate() {
            warn!("[Trade] Refusing to submit invalid trade: {}", e);
            return TradeState::Failed(e.to_string());
        }

        match self.send(token, request).await {
            Ok(ack) => {
                info!(
                    "[Trade] {} {} x{} queued{}",
                    request.trade_type,
                    request.ticker,
                    request.quantity,
                    if ack.message.is_empty() {
                        String::new()
                    } else {
                        format!(": {}", ack.message)
                    }
                );
                TradeState::Queued
            }
            Err(e) => {
                error!("[Trade] Submission failed: {}", e);
                TradeState::Failed(e.user_message_or(GENERIC_TRADE_ERROR))
            }
        }
    }

    async fn send(&self, token: &str, request: &TradeRequest) -> Result<TradeAck> {
        let url = self.endpoints.trade_submit_url()?;
        debug!("[Trade] POST {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        // The status code is what counts; an odd body only loses the log line
        let body = response.text().await.unwrap_or_default();
        Ok(serde_json::from_str(&body).unwrap_or_default())
    }
}
