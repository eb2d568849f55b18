//! # Token Metrics SDK
//!
//! Tracks live market and risk data for registered tokens, records how each
//! token evolves between observations, and runs an analysis over every
//! change. Registrations and analysis history survive restarts: both are
//! flushed to JSON documents on every mutation.
//!
//! ## Usage
//!
//! ```no_run
//! use token_metrics_sdk::{TokenSnapshot, TokenTracker};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Stores under ./data, providers and analyst keyed from the environment
//! let tracker = std::sync::Arc::new(TokenTracker::from_env("./data").await?);
//!
//! // Register a token; its initial metrics are stored as supplied
//! tracker.register(TokenSnapshot::new("0xabc")).await?;
//!
//! // Run the periodic passes until shutdown
//! let handle = tracker.start();
//!
//! // ... later: read back what the passes recorded ...
//! for entry in tracker.history_for("0xabc").await {
//!     println!("{}: {}", entry.timestamp, entry.analysis);
//! }
//!
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Each tracking pass fetches every registered token from all configured
//! providers concurrently, overlays the partial updates onto the token's
//! current snapshot (later providers win shared fields), computes the
//! evolution against the most recent history entry (or against the
//! registered snapshot on a token's first pass), asks the analyst for
//! text, appends the result to durable history, replaces the registry
//! snapshot, and finally notifies. A token whose sources all fail keeps
//! its previous state and never blocks the rest of the pass.

pub mod analysis;
pub mod constants;
pub mod error;
pub mod evolution;
pub mod history;
pub mod merge;
pub mod metrics;
pub mod notify;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod tracker;
pub mod types;

// Re-export commonly used types
pub use analysis::{Analyst, GptAnalyst};
pub use error::{ProviderError, StoreError, TrackerError};
pub use evolution::{diff, Evolution, MetricChange};
pub use history::HistoryStore;
pub use merge::merge_snapshot;
pub use metrics::{FetchMetrics, ProviderHealth};
pub use notify::{Notifier, TelegramNotifier};
pub use provider::MetricsProvider;
pub use providers::{MoralisProvider, RugCheckProvider};
pub use registry::TokenRegistry;
pub use tracker::{TokenTracker, TrackerHandle};
pub use types::{HistoryEntry, ProviderUpdate, TokenSnapshot};
