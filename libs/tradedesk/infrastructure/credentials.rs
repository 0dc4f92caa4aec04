//! Bearer credential providers
//!
//! A credential is fetched fresh for every connection attempt and never
//! cached across reconnects.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Variable read by [`EnvCredential::from_default_var`]
pub const TOKEN_ENV_VAR: &str = "TRADEDESK_TOKEN";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("No active session: {0}")]
    NoSession(String),

    #[error("Credential rejected: {0}")]
    Rejected(String),

    #[error("Credential request timed out after {0:?}")]
    Timeout(Duration),
}

/// Supplies a short-lived bearer token on demand
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fails fast when there is no session
    async fn get_token(&self) -> Result<String, CredentialError>;
}

/// Fetch a token, bounded by `timeout`; blank tokens count as rejected
pub async fn fetch_token(
    provider: &dyn CredentialProvider,
    timeout: Duration,
) -> Result<String, CredentialError> {
    let token = tokio::time::timeout(timeout, provider.get_token())
        .await
        .map_err(|_| CredentialError::Timeout(timeout))??;

    if token.trim().is_empty() {
        return Err(CredentialError::Rejected("provider returned a blank token".into()));
    }
    Ok(token)
}

/// A fixed token, e.g. handed over on the command line
#[derive(Debug, Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredential {
    async fn get_token(&self) -> Result<String, CredentialError> {
        if self.token.trim().is_empty() {
            return Err(CredentialError::NoSession("no token configured".into()));
        }
        Ok(self.token.clone())
    }
}

/// Reads the token from an environment variable on every call
///
/// Rotating the variable between reconnects is picked up by the next attempt.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn from_default_var() -> Self {
        Self::new(TOKEN_ENV_VAR)
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait]
impl CredentialProvider for EnvCredential {
    async fn get_token(&self) -> Result<String, CredentialError> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(CredentialError::NoSession(format!(
                "environment variable {} is not set",
                self.var
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProvider;

    #[async_trait]
    impl CredentialProvider for SlowProvider {
        async fn get_token(&self) -> Result<String, CredentialError> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn test_static_credential() {
        assert_eq!(StaticCredential::new("t").get_token().await, Ok("t".to_string()));
        assert!(matches!(
            StaticCredential::new("").get_token().await,
            Err(CredentialError::NoSession(_))
        ));
    }

    #[tokio::test]
    async fn test_env_credential_reads_each_call() {
        let provider = EnvCredential::new("TRADEDESK_TEST_TOKEN_ROTATION");

        std::env::remove_var(provider.var());
        assert!(matches!(
            provider.get_token().await,
            Err(CredentialError::NoSession(_))
        ));

        std::env::set_var(provider.var(), "first");
        assert_eq!(provider.get_token().await, Ok("first".to_string()));

        std::env::set_var(provider.var(), "second");
        assert_eq!(provider.get_token().await, Ok("second".to_string()));

        std::env::remove_var(provider.var());
    }

    #[tokio::test]
    async fn test_fetch_token_times_out() {
        let result = fetch_token(&SlowProvider, Duration::from_millis(20)).await;
        assert_eq!(result, Err(CredentialError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn test_fetch_token_passes_provider_errors() {
        let result = fetch_token(&StaticCredential::new(" "), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(CredentialError::NoSession(_))));
    }
}
