use hypersockets::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use super::client::{EndpointError, Endpoints};

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "TRADEDESK_API_URL";
/// Environment variable overriding `api.ws_base_url`
pub const WS_URL_ENV: &str = "TRADEDESK_WS_URL";
/// Environment variable carrying the bearer token for the binaries
pub const TOKEN_ENV: &str = "TRADEDESK_TOKEN";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarMissing(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Stream client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bearer token from .env (not in YAML)
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            market: MarketConfig::default(),
            reconnect: ReconnectConfig::default(),
            log_level: default_log_level(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Derived from `base_url` when absent
    #[serde(default)]
    pub ws_base_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
    #[serde(default = "default_credential_timeout_ms")]
    pub credential_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            credential_timeout_ms: default_credential_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }

    pub fn credential_timeout(&self) -> Duration {
        Duration::from_millis(self.credential_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
        }
    }
}

/// Which reconnection strategy the feed sessions use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectKind {
    /// A closed feed stays closed
    #[default]
    Never,
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub strategy: ReconnectKind,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Unlimited when absent
    #[serde(default)]
    pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectKind::Never,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    pub fn build_strategy(&self) -> Box<dyn ReconnectionStrategy> {
        let initial = Duration::from_millis(self.initial_delay_ms);
        match self.strategy {
            ReconnectKind::Never => Box::new(NeverReconnect),
            ReconnectKind::Fixed => Box::new(FixedDelay::new(initial, self.max_attempts)),
            ReconnectKind::Exponential => Box::new(ExponentialBackoff::new(
                initial,
                Duration::from_millis(self.max_delay_ms),
                self.max_attempts,
            )),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_close_timeout_ms() -> u64 {
    2_000
}

fn default_credential_timeout_ms() -> u64 {
    10_000
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_tickers() -> Vec<String> {
    ["AAPL", "GOOGL", "AMZN", "MSFT", "TSLA"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

impl StreamConfig {
    /// Load configuration from a YAML file
    ///
    /// A missing file is not an error: the defaults are used. Environment
    /// overrides are applied before validation.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();

        let mut config = if config_path.exists() {
            let yaml_content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&yaml_content)?
        } else {
            info!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            StreamConfig::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    /// Override URLs and token from the environment
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            info!("Overriding API base URL from environment variable");
            self.api.base_url = url;
        }
        if let Some(url) = lookup(WS_URL_ENV).filter(|v| !v.trim().is_empty()) {
            info!("Overriding socket base URL from environment variable");
            self.api.ws_base_url = Some(url);
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.token = Some(token);
        }
    }

    /// The token from the environment, required by the binaries
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| ConfigError::EnvVarMissing(TOKEN_ENV.to_string()))
    }

    /// Socket base URL, explicit or derived from the API base
    pub fn ws_base_url(&self) -> Result<String> {
        Ok(self.endpoints()?.ws_base().to_string())
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::new(&self.api.base_url, self.api.ws_base_url.as_deref())
            .map_err(|e: EndpointError| ConfigError::ValidationError(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate URLs (scheme checks live in Endpoints)
        self.endpoints()?;

        // Validate tickers
        if self.market.tickers.is_empty() {
            return Err(ConfigError::ValidationError(
                "market.tickers must not be empty".to_string(),
            ));
        }
        if self.market.tickers.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "market.tickers must not contain blank entries".to_string(),
            ));
        }

        // Validate timeouts
        let timeouts = [
            ("api.request_timeout_ms", self.api.request_timeout_ms),
            ("api.connect_timeout_ms", self.api.connect_timeout_ms),
            ("api.close_timeout_ms", self.api.close_timeout_ms),
            ("api.credential_timeout_ms", self.api.credential_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, ms)| *ms == 0) {
            return Err(ConfigError::ValidationError(format!(
                "{} must be greater than 0",
                name
            )));
        }

        // Validate reconnect strategy
        if self.reconnect.strategy == ReconnectKind::Exponential
            && self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms
        {
            return Err(ConfigError::ValidationError(
                "reconnect.initial_delay_ms must not exceed reconnect.max_delay_ms".to_string(),
            ));
        }

        // Validate log_level
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  API base URL: {}", self.api.base_url);
        match self.ws_base_url() {
            Ok(url) => info!("  Socket base URL: {}", url),
            Err(e) => info!("  Socket base URL: invalid ({})", e),
        }
        info!("  Tickers: {}", self.market.tickers.join(", "));
        info!("  Reconnect: {:?}", self.reconnect.strategy);
        info!("  Log level: {}", self.log_level);
        info!(
            "  Token: {}",
            if self.token.is_some() { "set" } else { "not set" }
        );
    }
}
