//! API and socket endpoint construction
//!
//! Both feeds authenticate with the bearer token in the query string
//! (`?token=…`); REST calls send it in the `Authorization` header instead.

use reqwest::Url;
use thiserror::Error;

const SNAPSHOT_PATH: &str = "api/market-data/";
const TRADE_SUBMIT_PATH: &str = "api/trades/send";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme '{scheme}' for {role} URL (expected {expected})")]
    UnsupportedScheme {
        scheme: String,
        role: &'static str,
        expected: &'static str,
    },
}

/// Which push feed a socket URL is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    MarketData,
    TradeProgress,
}

impl FeedKind {
    pub fn path(&self) -> &'static str {
        match self {
            FeedKind::MarketData => "market-data/ws",
            FeedKind::TradeProgress => "trade-progress/ws",
        }
    }

    /// Log prefix of the connection
    pub fn label(&self) -> &'static str {
        match self {
            FeedKind::MarketData => "MarketWS",
            FeedKind::TradeProgress => "TradeWS",
        }
    }
}

/// Base URLs of the REST API and of the socket host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    api_base: Url,
    ws_base: Url,
}

impl Endpoints {
    /// `ws_base_url` defaults to the API host with `http→ws` / `https→wss`
    pub fn new(api_base_url: &str, ws_base_url: Option<&str>) -> Result<Self, EndpointError> {
        let api_base = parse_base(api_base_url)?;
        require_scheme(&api_base, "API", &["http", "https"], "http or https")?;

        let ws_base = match ws_base_url {
            Some(url) => parse_base(url)?,
            None => derive_ws_base(&api_base)?,
        };
        require_scheme(&ws_base, "socket", &["ws", "wss"], "ws or wss")?;

        Ok(Self { api_base, ws_base })
    }

    pub fn api_base(&self) -> &str {
        self.api_base.as_str()
    }

    pub fn ws_base(&self) -> &str {
        self.ws_base.as_str()
    }

    /// `GET /api/market-data/?ticker=T1&ticker=T2…`
    pub fn snapshot_url(&self, tickers: &[String]) -> Result<Url, EndpointError> {
        let mut url = join(&self.api_base, SNAPSHOT_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            for ticker in tickers {
                query.append_pair("ticker", ticker);
            }
        }
        if tickers.is_empty() {
            url.set_query(None);
        }
        Ok(url)
    }

    /// `POST /api/trades/send`
    pub fn trade_submit_url(&self) -> Result<Url, EndpointError> {
        join(&self.api_base, TRADE_SUBMIT_PATH)
    }

    /// `ws(s)://host/<feed>/ws?token=…`
    pub fn socket_url(&self, kind: FeedKind, token: &str) -> Result<String, EndpointError> {
        let mut url = join(&self.ws_base, kind.path())?;
        url.query_pairs_mut().append_pair("token", token);
        Ok(url.into())
    }
}

/// Parse a base URL so that relative joins append to its path
fn parse_base(raw: &str) -> Result<Url, EndpointError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| EndpointError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    Ok(url)
}

fn derive_ws_base(api_base: &Url) -> Result<Url, EndpointError> {
    let scheme = match api_base.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    let mut ws_base = api_base.clone();
    ws_base
        .set_scheme(scheme)
        .map_err(|_| EndpointError::UnsupportedScheme {
            scheme: api_base.scheme().to_string(),
            role: "API",
            expected: "http or https",
        })?;
    Ok(ws_base)
}

fn require_scheme(
    url: &Url,
    role: &'static str,
    allowed: &[&str],
    expected: &'static str,
) -> Result<(), EndpointError> {
    if allowed.contains(&url.scheme()) {
        Ok(())
    } else {
        Err(EndpointError::UnsupportedScheme {
            scheme: url.scheme().to_string(),
            role,
            expected,
        })
    }
}

fn join(base: &Url, path: &str) -> Result<Url, EndpointError> {
    base.join(path).map_err(|e| EndpointError::InvalidUrl {
        url: format!("{}{}", base, path),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_default_socket_base_follows_api_scheme() {
        let local = Endpoints::new("http://127.0.0.1:8000", None).unwrap();
        assert_eq!(local.ws_base(), "ws://127.0.0.1:8000/");

        let remote = Endpoints::new("https://desk.example.com", None).unwrap();
        assert_eq!(remote.ws_base(), "wss://desk.example.com/");
    }

    #[test]
    fn test_snapshot_url_repeats_ticker_param() {
        let endpoints = Endpoints::new("http://127.0.0.1:8000", None).unwrap();
        let url = endpoints.snapshot_url(&tickers(&["AAPL", "GOOGL"])).unwrap();

        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8000/api/market-data/?ticker=AAPL&ticker=GOOGL"
        );
        assert_eq!(
            endpoints.snapshot_url(&[]).unwrap().as_str(),
            "http://127.0.0.1:8000/api/market-data/"
        );
    }

    #[test]
    fn test_base_path_prefix_is_kept() {
        let endpoints = Endpoints::new("https://desk.example.com/v1", None).unwrap();
        assert_eq!(
            endpoints.trade_submit_url().unwrap().as_str(),
            "https://desk.example.com/v1/api/trades/send"
        );
    }

    #[test]
    fn test_socket_urls_carry_encoded_token() {
        let endpoints = Endpoints::new("https://x", Some("wss://x")).unwrap();

        assert_eq!(
            endpoints.socket_url(FeedKind::MarketData, "t").unwrap(),
            "wss://x/market-data/ws?token=t"
        );
        assert_eq!(
            endpoints.socket_url(FeedKind::TradeProgress, "a+b/c=").unwrap(),
            "wss://x/trade-progress/ws?token=a%2Bb%2Fc%3D"
        );
    }

    #[test]
    fn test_rejects_wrong_schemes() {
        assert!(matches!(
            Endpoints::new("ftp://x", None),
            Err(EndpointError::UnsupportedScheme { role: "API", .. })
        ));
        assert!(matches!(
            Endpoints::new("http://x", Some("http://x")),
            Err(EndpointError::UnsupportedScheme { role: "socket", .. })
        ));
        assert!(matches!(
            Endpoints::new("not a url", None),
            Err(EndpointError::InvalidUrl { .. })
        ));
    }
}
