//! CLI utilities for binaries
//!
//! Handles configuration loading, environment variables and the small
//! argument grammar of the binaries.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use tradedesk::{TradeRequest, TradeType};

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Stream client configuration (stream_config.yaml)
    Stream,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Stream => "config/stream_config.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Stream => "STREAM_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// # Examples
/// ```
/// use tradedesk_stream::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Stream);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Positional tickers, upper-cased; `None` when none were given
pub fn parse_tickers(args: &[String]) -> Option<Vec<String>> {
    let tickers: Vec<String> = args
        .iter()
        .map(|a| a.trim().to_uppercase())
        .filter(|a| !a.is_empty())
        .collect();

    (!tickers.is_empty()).then_some(tickers)
}

/// `--submit TICKER QUANTITY PRICE buy|sell`
///
/// Returns `None` without `--submit`; the request is validated.
pub fn parse_submit_args(args: &[String]) -> Result<Option<TradeRequest>> {
    let Some(pos) = args.iter().position(|a| a == "--submit") else {
        return Ok(None);
    };

    let rest = &args[pos + 1..];
    if rest.len() < 4 {
        bail!("usage: --submit TICKER QUANTITY PRICE buy|sell");
    }

    let quantity: i64 = rest[1]
        .parse()
        .with_context(|| format!("invalid quantity '{}'", rest[1]))?;
    let price: f64 = rest[2]
        .parse()
        .with_context(|| format!("invalid price '{}'", rest[2]))?;
    let trade_type: TradeType = rest[3].parse()?;

    let request = TradeRequest::new(rest[0].to_uppercase(), quantity, price, trade_type);
    request.validate()?;
    Ok(Some(request))
}
