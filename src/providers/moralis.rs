//! Moralis market-data provider implementation

use crate::{
    constants::{MORALIS_API_KEY_ENV, MORALIS_API_URL, REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::ProviderError,
    provider::MetricsProvider,
    types::ProviderUpdate,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Chain the discovery endpoint is queried for
const DEFAULT_CHAIN: &str = "eth";

/// Moralis token discovery response
///
/// Metric fields stay raw `Value`s; whatever the API returns is carried
/// into the snapshot unchanged and parsed only at diff time.
#[derive(Debug, Deserialize)]
struct MoralisTokenResponse {
    token_name: Option<String>,
    token_symbol: Option<String>,
    market_cap: Option<Value>,
    holders: Option<Value>,
}

/// Moralis market-data provider
///
/// Supplies token name, symbol, market cap and holder count. The API key is
/// read from `MORALIS_API_KEY`; a missing key fails the fetch, not the
/// constructor, so a tracker can be wired up before credentials exist.
pub struct MoralisProvider {
    client: Client,
    api_key: Option<String>,
}

impl MoralisProvider {
    /// Creates a new Moralis provider with the key from the environment
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_api_key(std::env::var(MORALIS_API_KEY_ENV).ok())
    }

    /// Creates a new Moralis provider with an explicit key (or none)
    pub fn with_api_key(api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self { client, api_key })
    }

    /// Builds the Moralis discovery URL for one token
    fn build_url(&self, address: &str) -> String {
        format!(
            "{}/discovery/token?chain={}&token_address={}",
            MORALIS_API_URL, DEFAULT_CHAIN, address
        )
    }

    /// Maps the Moralis response onto a partial snapshot update
    fn parse_response(&self, response: MoralisTokenResponse) -> ProviderUpdate {
        ProviderUpdate {
            name: response.token_name,
            symbol: response.token_symbol,
            market_cap: response.market_cap,
            holders: response.holders,
            ..Default::default()
        }
    }
}

impl Default for MoralisProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create Moralis provider")
    }
}

#[async_trait]
impl MetricsProvider for MoralisProvider {
    async fn fetch(&self, address: &str) -> Result<ProviderUpdate, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials(MORALIS_API_KEY_ENV))?;

        let url = self.build_url(address);
        tracing::debug!(%address, "Fetching token data from Moralis");

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", api_key)
            .send()
            .await
            .map_err(ProviderError::NetworkError)?;

        // Check for rate limiting
        if response.status().as_u16() == 429 {
            return Err(ProviderError::RateLimitExceeded);
        }

        // Check for other errors
        if !response.status().is_success() {
            return Err(ProviderError::ApiError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let response_text = response.text().await.map_err(ProviderError::NetworkError)?;

        let moralis_response: MoralisTokenResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                ProviderError::InvalidResponse(format!(
                    "Failed to parse Moralis response: {}. Response: {}",
                    e, response_text
                ))
            })?;

        let update = self.parse_response(moralis_response);

        if update.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No token data returned from Moralis".to_string(),
            ));
        }

        tracing::debug!(%address, "Successfully fetched token data from Moralis");

        Ok(update)
    }

    fn provider_name(&self) -> &'static str {
        "moralis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_without_key_reports_missing_credentials() {
        let provider = MoralisProvider::with_api_key(None).unwrap();
        let err = provider.fetch("0xabc").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredentials(MORALIS_API_KEY_ENV)
        ));
    }

    #[test]
    fn parses_discovery_payload_keeping_raw_metric_values() {
        let provider = MoralisProvider::with_api_key(Some("k".into())).unwrap();
        let response: MoralisTokenResponse = serde_json::from_value(json!({
            "token_name": "Test Token",
            "token_symbol": "TEST",
            "market_cap": "1000000",
            "holders": 1000,
            "token_logo": "ignored"
        }))
        .unwrap();

        let update = provider.parse_response(response);

        assert_eq!(update.name.as_deref(), Some("Test Token"));
        assert_eq!(update.symbol.as_deref(), Some("TEST"));
        // The string form survives as-is; parsing happens downstream.
        assert_eq!(update.market_cap, Some(json!("1000000")));
        assert_eq!(update.holders, Some(json!(1000)));
        assert!(update.risk_score.is_none());
    }

    #[test]
    fn builds_the_discovery_url() {
        let provider = MoralisProvider::with_api_key(None).unwrap();
        let url = provider.build_url("0xdeadbeef");
        assert_eq!(
            url,
            "https://deep-index.moralis.io/api/v2.2/discovery/token?chain=eth&token_address=0xdeadbeef"
        );
    }
}
