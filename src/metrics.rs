//! Provider health metrics collection and reporting
//!
//! Tracks fetch latency and success rates per metrics provider.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

/// Maximum number of samples kept per provider for percentile calculation
const MAX_SAMPLES: usize = 100;

/// Health snapshot for a single provider
#[derive(Debug, Clone)]
pub struct ProviderHealth {
    /// Name of the provider
    pub provider_name: String,
    /// 50th percentile fetch latency in milliseconds
    pub latency_p50_ms: f64,
    /// 99th percentile fetch latency in milliseconds
    pub latency_p99_ms: f64,
    /// Success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Total number of fetches tracked
    pub total_fetches: u64,
    /// Number of failed fetches
    pub failed_fetches: u64,
}

impl ProviderHealth {
    /// Creates a health snapshot with no data
    pub fn empty(provider_name: &str) -> Self {
        Self {
            provider_name: provider_name.to_string(),
            latency_p50_ms: 0.0,
            latency_p99_ms: 0.0,
            success_rate: 1.0,
            total_fetches: 0,
            failed_fetches: 0,
        }
    }
}

/// Internal sample for latency tracking
#[derive(Debug, Clone)]
struct FetchSample {
    duration_ms: f64,
    success: bool,
}

/// Rolling window plus lifetime totals for one provider
#[derive(Debug, Default)]
struct Window {
    samples: VecDeque<FetchSample>,
    total_fetches: u64,
    failed_fetches: u64,
}

/// Collects fetch outcomes for every provider the tracker uses
///
/// Percentiles are computed over a rolling window of recent samples;
/// totals cover the collector's lifetime.
pub struct FetchMetrics {
    windows: RwLock<HashMap<String, Window>>,
}

impl FetchMetrics {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Records one fetch with its duration and success status
    pub async fn record_fetch(&self, provider: &str, duration: Duration, success: bool) {
        let duration_ms = duration.as_secs_f64() * 1000.0;

        let mut windows = self.windows.write().await;
        let window = windows.entry(provider.to_string()).or_default();

        window.total_fetches += 1;
        if !success {
            window.failed_fetches += 1;
        }

        if window.samples.len() >= MAX_SAMPLES {
            window.samples.pop_front();
        }
        window.samples.push_back(FetchSample {
            duration_ms,
            success,
        });
    }

    /// Computes the current health snapshot for one provider
    pub async fn health(&self, provider: &str) -> ProviderHealth {
        let windows = self.windows.read().await;
        match windows.get(provider) {
            Some(window) => compute_health(provider, window),
            None => ProviderHealth::empty(provider),
        }
    }

    /// Health snapshots for all providers seen so far, ordered by name
    pub async fn all(&self) -> Vec<ProviderHealth> {
        let windows = self.windows.read().await;
        let mut health: Vec<ProviderHealth> = windows
            .iter()
            .map(|(name, window)| compute_health(name, window))
            .collect();
        health.sort_by(|a, b| a.provider_name.cmp(&b.provider_name));
        health
    }
}

impl Default for FetchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_health(provider: &str, window: &Window) -> ProviderHealth {
    if window.samples.is_empty() {
        return ProviderHealth::empty(provider);
    }

    // Percentiles cover successful fetches only
    let mut latencies: Vec<f64> = window
        .samples
        .iter()
        .filter(|s| s.success)
        .map(|s| s.duration_ms)
        .collect();

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let success_rate = if window.total_fetches > 0 {
        (window.total_fetches - window.failed_fetches) as f64 / window.total_fetches as f64
    } else {
        1.0
    };

    ProviderHealth {
        provider_name: provider.to_string(),
        latency_p50_ms: percentile(&latencies, 50.0),
        latency_p99_ms: percentile(&latencies, 99.0),
        success_rate,
        total_fetches: window.total_fetches,
        failed_fetches: window.failed_fetches,
    }
}

/// Calculate percentile from sorted values, nearest-rank
fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let rank = (p / 100.0 * sorted_values.len() as f64).ceil() as usize;
    sorted_values[rank.saturating_sub(1).min(sorted_values.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_totals_and_success_rate() {
        let metrics = FetchMetrics::new();

        metrics
            .record_fetch("moralis", Duration::from_millis(100), true)
            .await;
        metrics
            .record_fetch("moralis", Duration::from_millis(200), true)
            .await;
        metrics
            .record_fetch("moralis", Duration::from_millis(150), false)
            .await;

        let health = metrics.health("moralis").await;

        assert_eq!(health.provider_name, "moralis");
        assert_eq!(health.total_fetches, 3);
        assert_eq!(health.failed_fetches, 1);
        assert!(health.success_rate > 0.6 && health.success_rate < 0.7);
    }

    #[tokio::test]
    async fn providers_are_tracked_independently() {
        let metrics = FetchMetrics::new();

        metrics
            .record_fetch("moralis", Duration::from_millis(100), true)
            .await;
        metrics
            .record_fetch("rugcheck", Duration::from_millis(50), false)
            .await;

        let all = metrics.all().await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].provider_name, "moralis");
        assert_eq!(all[1].provider_name, "rugcheck");
        assert_eq!(all[1].failed_fetches, 1);
    }

    #[tokio::test]
    async fn unknown_provider_reports_empty_health() {
        let metrics = FetchMetrics::new();
        let health = metrics.health("nobody").await;
        assert_eq!(health.total_fetches, 0);
        assert_eq!(health.success_rate, 1.0);
    }

    #[tokio::test]
    async fn lifetime_totals_outlive_the_sample_window() {
        let metrics = FetchMetrics::new();
        for _ in 0..MAX_SAMPLES + 50 {
            metrics
                .record_fetch("moralis", Duration::from_millis(10), true)
                .await;
        }

        let health = metrics.health("moralis").await;
        assert_eq!(health.total_fetches, (MAX_SAMPLES + 50) as u64);
    }

    #[test]
    fn test_percentile() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 50.0), 5.0);
        assert_eq!(percentile(&values, 99.0), 10.0);
        assert_eq!(percentile(&values, 100.0), 10.0);
        assert_eq!(percentile(&[7.0], 50.0), 7.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }
}
