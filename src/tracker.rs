//! Token tracking service
//!
//! Periodically fetches live data for every registered token, merges it
//! onto the current snapshot, computes the evolution since the previous
//! observation, and records the result durably before notifying.

use crate::{
    analysis::{Analyst, GptAnalyst},
    constants::{HISTORY_FILE, PASS_INTERVAL_SECS, TOKENS_FILE},
    error::{StoreError, TrackerError},
    evolution::diff,
    history::HistoryStore,
    merge::merge_snapshot,
    metrics::{FetchMetrics, ProviderHealth},
    notify::{Notifier, TelegramNotifier},
    provider::MetricsProvider,
    providers::{MoralisProvider, RugCheckProvider},
    registry::TokenRegistry,
    types::{HistoryEntry, ProviderUpdate, TokenSnapshot},
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use uuid::Uuid;

/// Token tracker
///
/// Owns the durable registry and history, a precedence-ordered list of
/// metrics providers, an analyst and a notifier. Each tracking pass walks
/// the registered tokens one by one; a token whose sources all fail is
/// left untouched and never blocks the tokens after it.
///
/// # Example
/// ```no_run
/// use token_metrics_sdk::{TokenSnapshot, TokenTracker};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = std::sync::Arc::new(TokenTracker::from_env("./data").await?);
/// tracker.register(TokenSnapshot::new("0xabc")).await?;
///
/// let handle = tracker.start();
/// // ... tokens are now re-fetched and analyzed on every pass ...
/// handle.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct TokenTracker {
    registry: Arc<TokenRegistry>,
    history: Arc<HistoryStore>,
    /// Merge precedence follows this order: a later provider's fields win
    providers: Vec<Arc<dyn MetricsProvider>>,
    analyst: Arc<dyn Analyst>,
    notifier: Arc<dyn Notifier>,
    fetch_metrics: Arc<FetchMetrics>,
    pass_interval: Duration,
}

impl TokenTracker {
    /// Creates a tracker with explicit components
    ///
    /// This is the seam for tests and for callers bringing their own
    /// providers, analyst or notifier.
    pub fn new(
        registry: Arc<TokenRegistry>,
        history: Arc<HistoryStore>,
        providers: Vec<Arc<dyn MetricsProvider>>,
        analyst: Arc<dyn Analyst>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            history,
            providers,
            analyst,
            notifier,
            fetch_metrics: Arc::new(FetchMetrics::new()),
            pass_interval: Duration::from_secs(PASS_INTERVAL_SECS),
        }
    }

    /// Creates the stock tracker: durable stores under `data_dir`, the
    /// Moralis and RugCheck providers (RugCheck winning shared fields),
    /// the GPT analyst and the Telegram notifier, all credentialed from
    /// the environment
    pub async fn from_env(data_dir: impl AsRef<Path>) -> Result<Self, TrackerError> {
        let data_dir = data_dir.as_ref();
        let registry = Arc::new(TokenRegistry::load(data_dir.join(TOKENS_FILE)).await?);
        let history = Arc::new(HistoryStore::load(data_dir.join(HISTORY_FILE)).await?);

        let providers: Vec<Arc<dyn MetricsProvider>> = vec![
            Arc::new(MoralisProvider::new()?),
            Arc::new(RugCheckProvider::new()?),
        ];

        Ok(Self::new(
            registry,
            history,
            providers,
            Arc::new(GptAnalyst::new()?),
            Arc::new(TelegramNotifier::from_env()),
        ))
    }

    /// Overrides the delay between passes
    pub fn with_pass_interval(mut self, interval: Duration) -> Self {
        self.pass_interval = interval;
        self
    }

    /// Registers a token for tracking
    ///
    /// # Returns
    /// `true` if the token was added, `false` if it was already registered
    pub async fn register(&self, snapshot: TokenSnapshot) -> Result<bool, StoreError> {
        self.registry.register(snapshot).await
    }

    /// Current snapshots of all registered tokens, in registration order
    pub async fn tokens(&self) -> Vec<TokenSnapshot> {
        self.registry.list().await
    }

    /// Current snapshot of one token
    pub async fn token(&self, address: &str) -> Option<TokenSnapshot> {
        self.registry.get(address).await
    }

    /// Retained analysis history for one token, oldest first
    pub async fn history_for(&self, address: &str) -> Vec<HistoryEntry> {
        self.history.entries_for(address).await
    }

    /// Most recent analysis entry for one token
    pub async fn latest_entry(&self, address: &str) -> Option<HistoryEntry> {
        self.history.latest(address).await
    }

    /// Retained analysis history for every token
    pub async fn full_history(&self) -> HashMap<String, Vec<HistoryEntry>> {
        self.history.all().await
    }

    /// Health snapshots for all providers, ordered by name
    pub async fn provider_health(&self) -> Vec<ProviderHealth> {
        self.fetch_metrics.all().await
    }

    /// Runs one tracking pass over every registered token, immediately
    ///
    /// The background task calls this on its schedule; calling it directly
    /// bypasses the interval, which is also how tests drive the tracker
    /// deterministically.
    pub async fn run_pass(&self) {
        let pass_id = Uuid::new_v4();
        let tokens = self.registry.list().await;

        tracing::info!(%pass_id, tokens = tokens.len(), "Starting tracking pass");

        for token in tokens {
            if let Err(e) = self.process_token(&token).await {
                tracing::error!(
                    %pass_id,
                    address = %token.address,
                    error = %e,
                    "Failed to record tracking result"
                );
            }
        }

        tracing::info!(%pass_id, "Tracking pass complete");
    }

    /// Fetches, merges, diffs, analyzes and records one token
    ///
    /// Provider failures are absorbed here; only durable-store failures
    /// surface, and the caller contains those to this token.
    async fn process_token(&self, token: &TokenSnapshot) -> Result<(), StoreError> {
        let updates = self.fetch_updates(&token.address).await;

        if updates.iter().all(|u| u.is_none()) {
            tracing::warn!(
                address = %token.address,
                "No source returned data, keeping previous state"
            );
            return Ok(());
        }

        let current = merge_snapshot(token, updates.iter().flatten(), Utc::now());

        // The durable history is the authoritative "previous"; a token's
        // first pass diffs against its registered snapshot instead.
        let previous = match self.history.latest(&token.address).await {
            Some(entry) => entry.snapshot,
            None => token.clone(),
        };
        let evolution = diff(&current, &previous);

        let analysis = self
            .analyst
            .analyze(&current.summary_text(), Some(&evolution))
            .await;
        tracing::debug!(
            analyst = self.analyst.analyst_name(),
            address = %token.address,
            "Analysis complete"
        );

        let entry = HistoryEntry {
            timestamp: current.observed_at,
            snapshot: current.clone(),
            analysis: analysis.clone(),
            evolution: Some(evolution),
        };

        // History first: the next pass reads its "previous" from here.
        self.history.append(&token.address, entry).await?;
        self.registry.update(current.clone()).await?;

        // Notification is best-effort and strictly after the durable writes.
        let message = format!("{}\n\n{}", current.summary_text(), analysis);
        self.notifier.notify(&message).await;

        Ok(())
    }

    /// Fetches all providers concurrently, in precedence order
    ///
    /// Every failure mode, including an empty update, collapses to `None`
    /// for that source; the slot order always matches `self.providers`.
    async fn fetch_updates(&self, address: &str) -> Vec<Option<ProviderUpdate>> {
        let fetches = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let fetch_metrics = Arc::clone(&self.fetch_metrics);
            let address = address.to_string();

            async move {
                let start = Instant::now();
                let result = provider.fetch(&address).await;
                let elapsed = start.elapsed();
                let name = provider.provider_name();

                match result {
                    Ok(update) if update.is_empty() => {
                        fetch_metrics.record_fetch(name, elapsed, true).await;
                        tracing::debug!(provider = name, %address, "Source returned an empty update");
                        None
                    }
                    Ok(update) => {
                        fetch_metrics.record_fetch(name, elapsed, true).await;
                        tracing::debug!(
                            provider = name,
                            %address,
                            latency_ms = elapsed.as_millis() as u64,
                            "Fetched update"
                        );
                        Some(update)
                    }
                    Err(e) => {
                        fetch_metrics.record_fetch(name, elapsed, false).await;
                        tracing::warn!(
                            provider = name,
                            %address,
                            error = %e,
                            "Fetch failed, treating as no data from this source"
                        );
                        None
                    }
                }
            }
        });

        futures::future::join_all(fetches).await
    }

    /// Starts the background tracking task
    ///
    /// The first pass runs immediately; subsequent passes follow the
    /// configured interval. The returned handle owns the task: call
    /// [`TrackerHandle::stop`] for an orderly shutdown after the
    /// in-flight pass.
    pub fn start(self: &Arc<Self>) -> TrackerHandle {
        let tracker = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            tracing::info!(
                pass_interval_secs = tracker.pass_interval.as_secs(),
                "Starting token tracker background task"
            );

            loop {
                tracker.run_pass().await;

                tokio::select! {
                    _ = sleep(tracker.pass_interval) => {}
                    _ = shutdown_rx.changed() => {
                        tracing::info!("Token tracker shutting down");
                        break;
                    }
                }
            }
        });

        TrackerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Handle to a running tracker's background task
pub struct TrackerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl TrackerHandle {
    /// Signals the task to stop and waits for the in-flight pass to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }

    /// True while the background task is still running
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}
