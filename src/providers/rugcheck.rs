//! RugCheck risk-data provider implementation

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, RUGCHECK_API_KEY_ENV, RUGCHECK_API_URL, USER_AGENT},
    error::ProviderError,
    provider::MetricsProvider,
    types::ProviderUpdate,
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// RugCheck risk-data provider
///
/// Supplies the normalised risk score, the rugged flag, the LP-locked flag
/// and the top-holder address list. The API key is read from
/// `RUGCHECK_API_KEY`; a missing key fails the fetch, not the constructor.
pub struct RugCheckProvider {
    client: Client,
    api_key: Option<String>,
}

impl RugCheckProvider {
    /// Creates a new RugCheck provider with the key from the environment
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_api_key(std::env::var(RUGCHECK_API_KEY_ENV).ok())
    }

    /// Creates a new RugCheck provider with an explicit key (or none)
    pub fn with_api_key(api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self { client, api_key })
    }

    /// Builds the RugCheck report URL for one token
    fn build_url(&self, address: &str) -> String {
        format!("{}/tokens/{}/report", RUGCHECK_API_URL, address)
    }
}

impl Default for RugCheckProvider {
    fn default() -> Self {
        Self::new().expect("Failed to create RugCheck provider")
    }
}

/// Maps a RugCheck report document onto a partial snapshot update
///
/// The report shape varies by token age and chain, so fields are walked
/// dynamically instead of deserialized into a rigid struct. The risk score
/// is carried as the raw value it arrived as.
fn parse_report(report: &Value) -> ProviderUpdate {
    let risk_score = report
        .get("score_normalised")
        .filter(|v| !v.is_null())
        .cloned();

    let honeypot = report["rugged"].as_bool();

    let top_holders = report["topHolders"].as_array().map(|holders| {
        holders
            .iter()
            .filter_map(|holder| holder["address"].as_str())
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
    });

    // Locked when more than half of the reported liquidity is locked,
    // averaged over the markets that report a percentage.
    let lp_locked = report["markets"].as_array().and_then(|markets| {
        let pcts: Vec<f64> = markets
            .iter()
            .filter_map(|market| market["lp"]["lpLockedPct"].as_f64())
            .collect();
        if pcts.is_empty() {
            None
        } else {
            let avg = pcts.iter().sum::<f64>() / pcts.len() as f64;
            Some(avg > 50.0)
        }
    });

    ProviderUpdate {
        risk_score,
        honeypot,
        lp_locked,
        top_holders,
        ..Default::default()
    }
}

#[async_trait]
impl MetricsProvider for RugCheckProvider {
    async fn fetch(&self, address: &str) -> Result<ProviderUpdate, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredentials(RUGCHECK_API_KEY_ENV))?;

        let url = self.build_url(address);
        tracing::debug!(%address, "Fetching token report from RugCheck");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", api_key))
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

        let report: Value = serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::InvalidResponse(format!(
                "Failed to parse RugCheck report: {}. Response: {}",
                e, response_text
            ))
        })?;

        let update = parse_report(&report);

        if update.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "No risk data returned from RugCheck".to_string(),
            ));
        }

        tracing::debug!(%address, "Successfully fetched token report from RugCheck");

        Ok(update)
    }

    fn provider_name(&self) -> &'static str {
        "rugcheck"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn fetch_without_key_reports_missing_credentials() {
        let provider = RugCheckProvider::with_api_key(None).unwrap();
        let err = provider.fetch("some-mint").await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::MissingCredentials(RUGCHECK_API_KEY_ENV)
        ));
    }

    #[test]
    fn parses_a_full_report() {
        let report = json!({
            "mint": "abc",
            "score": 120,
            "score_normalised": 4,
            "rugged": false,
            "topHolders": [
                { "address": "holder-1", "amount": 10, "pct": 5.0 },
                { "address": "holder-2", "amount": 7, "pct": 3.5 }
            ],
            "markets": [
                { "pubkey": "m1", "lp": { "lpLockedPct": 95.5 } },
                { "pubkey": "m2", "lp": { "lpLockedPct": 10.0 } }
            ]
        });

        let update = parse_report(&report);

        assert_eq!(update.risk_score, Some(json!(4)));
        assert_eq!(update.honeypot, Some(false));
        assert_eq!(update.lp_locked, Some(true));
        assert_eq!(
            update.top_holders,
            Some(vec!["holder-1".to_string(), "holder-2".to_string()])
        );
        assert!(update.market_cap.is_none());
    }

    #[test]
    fn mostly_unlocked_liquidity_reads_as_not_locked() {
        let report = json!({
            "markets": [
                { "lp": { "lpLockedPct": 40.0 } },
                { "lp": { "lpLockedPct": 20.0 } }
            ]
        });

        let update = parse_report(&report);
        assert_eq!(update.lp_locked, Some(false));
    }

    #[test]
    fn empty_report_yields_an_empty_update() {
        let update = parse_report(&json!({}));
        assert!(update.is_empty());
    }

    #[test]
    fn null_score_is_treated_as_absent() {
        let report = json!({ "score_normalised": null, "rugged": true });
        let update = parse_report(&report);
        assert!(update.risk_score.is_none());
        assert_eq!(update.honeypot, Some(true));
    }
}
