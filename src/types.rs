//! Types for the token metrics tracker

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evolution::Evolution;

/// One observation of a token's market and risk metrics at a point in time
///
/// Snapshots are immutable once appended to history; the registry holds
/// exactly one *current* snapshot per token, replaced wholesale on each
/// successful tracker pass.
///
/// Metric values (`market_cap`, `holders`, `risk_score`) are kept as the raw
/// JSON values the source supplied - a registration payload or a provider
/// response is stored as-is, and parsing happens at diff/presentation time.
/// The serde names (`token_address`, `mc`, `rugscore`, `timestamp`) match the
/// persisted document layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    /// Token address; the unique, case-sensitive key for the token
    #[serde(rename = "token_address")]
    pub address: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Ticker symbol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    /// Market capitalization in USD
    #[serde(rename = "mc", default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Value>,

    /// Holder count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holders: Option<Value>,

    /// Risk score on the reporting provider's own scale
    #[serde(rename = "rugscore", default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<Value>,

    /// Whether the token looked like a honeypot at observation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub honeypot: Option<bool>,

    /// Whether the liquidity pool was reported locked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lp_locked: Option<bool>,

    /// Largest holder addresses, in the provider's order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_holders: Option<Vec<String>>,

    /// When this observation was taken
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl TokenSnapshot {
    /// Creates an empty snapshot for an address, observed now
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: None,
            symbol: None,
            market_cap: None,
            holders: None,
            risk_score: None,
            honeypot: None,
            lp_locked: None,
            top_holders: None,
            observed_at: Utc::now(),
        }
    }

    /// Market cap parsed as a float, `None` when absent or unparseable
    pub fn market_cap_f64(&self) -> Option<f64> {
        self.market_cap.as_ref().and_then(value_as_f64)
    }

    /// Holder count parsed as an integer, `None` when absent or unparseable
    pub fn holders_i64(&self) -> Option<i64> {
        self.holders.as_ref().and_then(value_as_i64)
    }

    /// Risk score parsed as a float, `None` when absent or unparseable
    pub fn risk_score_f64(&self) -> Option<f64> {
        self.risk_score.as_ref().and_then(value_as_f64)
    }

    /// Renders the plain-text metric summary handed to the analyst
    pub fn summary_text(&self) -> String {
        let market_cap = self
            .market_cap_f64()
            .map(|mc| format!("${}", format_thousands(mc)))
            .unwrap_or_else(|| "n/a".to_string());
        let holders = self
            .holders_i64()
            .map(|h| format_thousands(h as f64))
            .unwrap_or_else(|| "n/a".to_string());
        let risk_score = self
            .risk_score_f64()
            .map(|score| format!("{:.1}", score))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "Token: {} ({})\n\
             Address: {}\n\
             Market Cap: {}\n\
             Holders: {}\n\
             Rug Score: {}\n\
             Honeypot: {}\n\
             LP Locked: {}\n\
             Last Update: {}\n",
            self.name.as_deref().unwrap_or("Unknown"),
            self.symbol.as_deref().unwrap_or("???"),
            self.address,
            market_cap,
            holders,
            risk_score,
            yes_no(self.honeypot),
            yes_no(self.lp_locked),
            self.observed_at.to_rfc3339(),
        )
    }
}

/// Partial snapshot produced by a single provider fetch
///
/// An adapter fills in the fields its source knows about and leaves the rest
/// `None`; the merger overlays updates onto the previously known snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub market_cap: Option<Value>,
    pub holders: Option<Value>,
    pub risk_score: Option<Value>,
    pub honeypot: Option<bool>,
    pub lp_locked: Option<bool>,
    pub top_holders: Option<Vec<String>>,
}

impl ProviderUpdate {
    /// True when the fetch produced no usable field at all
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.symbol.is_none()
            && self.market_cap.is_none()
            && self.holders.is_none()
            && self.risk_score.is_none()
            && self.honeypot.is_none()
            && self.lp_locked.is_none()
            && self.top_holders.is_none()
    }
}

/// One appended history record: the snapshot a pass produced for a token,
/// together with the analysis text written for it
///
/// Entries are never mutated after append; they are only evicted by the
/// per-token retention cap. The serde names match the persisted history
/// document (`token_data`, `analysis`, `evolution`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the pass observed the token
    pub timestamp: DateTime<Utc>,

    /// The merged snapshot recorded on this pass
    #[serde(rename = "token_data")]
    pub snapshot: TokenSnapshot,

    /// Analysis text the summarizer returned for this snapshot
    pub analysis: String,

    /// Change relative to the compared snapshot: the previous entry, or the
    /// registered snapshot when this is a token's first entry. Absent only
    /// in entries recorded without a comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evolution: Option<Evolution>,
}

/// Parses a raw metric value as a float
///
/// JSON numbers pass through; strings must parse as a finite float; anything
/// else is unparseable. Non-finite values ("NaN", "inf") are rejected since
/// serde_json serializes them as null, which would corrupt the store on
/// reload.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Parses a raw metric value as an integer count
///
/// JSON numbers truncate toward zero; strings must parse as an exact
/// integer ("1200.5" is a parse failure, not a truncation).
pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Formats a float with thousands separators and no decimal places
pub(crate) fn format_thousands(value: f64) -> String {
    let rounded = value.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());
    let bytes = digits.as_bytes();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*b as char);
    }
    format!("{}{}", sign, grouped)
}

fn yes_no(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_snapshot() -> TokenSnapshot {
        TokenSnapshot {
            address: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
            name: Some("Test Token".to_string()),
            symbol: Some("TEST".to_string()),
            market_cap: Some(json!(1_000_000)),
            holders: Some(json!(1_000)),
            risk_score: Some(json!(3.5)),
            honeypot: Some(false),
            lp_locked: Some(true),
            top_holders: Some(vec!["0xabc123".to_string(), "0xdef456".to_string()]),
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_serializes_with_document_field_names() {
        let snapshot = sample_snapshot();
        let doc = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(
            doc["token_address"],
            json!("0x1234567890abcdef1234567890abcdef12345678")
        );
        assert_eq!(doc["mc"], json!(1_000_000));
        assert_eq!(doc["rugscore"], json!(3.5));
        assert!(doc.get("timestamp").is_some());
        assert!(doc.get("market_cap").is_none());
        assert!(doc.get("observed_at").is_none());
    }

    #[test]
    fn snapshot_roundtrips_through_document_form() {
        let snapshot = sample_snapshot();
        let text = serde_json::to_string(&snapshot).unwrap();
        let back: TokenSnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn absent_fields_are_omitted_from_the_document() {
        let snapshot = TokenSnapshot::new("0xabc");
        let doc = serde_json::to_value(&snapshot).unwrap();
        let map = doc.as_object().unwrap();
        assert_eq!(map.len(), 2); // token_address + timestamp only
    }

    #[test]
    fn value_parsing_accepts_numbers_and_numeric_strings() {
        assert_eq!(value_as_f64(&json!(1500000)), Some(1_500_000.0));
        assert_eq!(value_as_f64(&json!("1500000.5")), Some(1_500_000.5));
        assert_eq!(value_as_f64(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(value_as_f64(&json!("garbage")), None);
        assert_eq!(value_as_f64(&json!(true)), None);
        assert_eq!(value_as_f64(&json!(null)), None);
    }

    #[test]
    fn non_finite_strings_are_unparseable() {
        // serde_json writes non-finite floats as null, which would make the
        // persisted history unreadable on reload.
        assert_eq!(value_as_f64(&json!("NaN")), None);
        assert_eq!(value_as_f64(&json!("inf")), None);
        assert_eq!(value_as_f64(&json!("-inf")), None);
        assert_eq!(value_as_f64(&json!("infinity")), None);
    }

    #[test]
    fn integer_parsing_truncates_numbers_but_rejects_float_strings() {
        assert_eq!(value_as_i64(&json!(1200)), Some(1200));
        assert_eq!(value_as_i64(&json!(1200.9)), Some(1200));
        assert_eq!(value_as_i64(&json!("1200")), Some(1200));
        assert_eq!(value_as_i64(&json!("1200.5")), None);
        assert_eq!(value_as_i64(&json!([1200])), None);
    }

    #[test]
    fn thousands_formatting() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1_000.0), "1,000");
        assert_eq!(format_thousands(1_500_000.0), "1,500,000");
        assert_eq!(format_thousands(-1_234_567.0), "-1,234,567");
        assert_eq!(format_thousands(1_000_000.4), "1,000,000");
    }

    #[test]
    fn summary_text_includes_formatted_metrics() {
        let summary = sample_snapshot().summary_text();
        assert!(summary.contains("Token: Test Token (TEST)"));
        assert!(summary.contains("Market Cap: $1,000,000"));
        assert!(summary.contains("Holders: 1,000"));
        assert!(summary.contains("Rug Score: 3.5"));
        assert!(summary.contains("Honeypot: No"));
        assert!(summary.contains("LP Locked: Yes"));
    }

    #[test]
    fn summary_text_reports_missing_metrics_as_not_available() {
        let summary = TokenSnapshot::new("0xabc").summary_text();
        assert!(summary.contains("Market Cap: n/a"));
        assert!(summary.contains("Honeypot: Unknown"));
    }

    #[test]
    fn empty_provider_update_is_detected() {
        assert!(ProviderUpdate::default().is_empty());

        let update = ProviderUpdate {
            holders: Some(json!(7)),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }
}
