//! Three-cycle walkthrough of registration, live updates, evolution
//! tracking and durable history, using scripted providers so the output
//! is deterministic.
//!
//! Run with: cargo run --example evolution_demo

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use token_metrics_sdk::{
    Analyst, GptAnalyst, HistoryStore, MetricsProvider, Notifier, ProviderError, ProviderUpdate,
    TelegramNotifier, TokenRegistry, TokenSnapshot, TokenTracker,
};

/// Provider that replays a queue of canned updates per token
struct ScriptedProvider {
    name: &'static str,
    script: Mutex<HashMap<String, VecDeque<ProviderUpdate>>>,
}

impl ScriptedProvider {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            script: Mutex::new(HashMap::new()),
        }
    }

    fn push(&self, address: &str, update: ProviderUpdate) {
        self.script
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(update);
    }
}

#[async_trait]
impl MetricsProvider for ScriptedProvider {
    async fn fetch(&self, address: &str) -> Result<ProviderUpdate, ProviderError> {
        let mut script = self.script.lock().unwrap();
        script
            .get_mut(address)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| ProviderError::ApiError(format!("no scripted data left for {}", address)))
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }
}

const MOON: &str = "0x1111111111111111111111111111111111111111";
const SAFE: &str = "0x2222222222222222222222222222222222222222";

fn market_update(mc: i64, holders: i64) -> ProviderUpdate {
    ProviderUpdate {
        market_cap: Some(json!(mc)),
        holders: Some(json!(holders)),
        ..Default::default()
    }
}

fn risk_update(rugscore: f64) -> ProviderUpdate {
    ProviderUpdate {
        risk_score: Some(json!(rugscore)),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let data_dir = std::path::Path::new("./demo-data");
    std::fs::create_dir_all(data_dir)?;
    // Start every demo run from a clean slate.
    let _ = std::fs::remove_file(data_dir.join("tokens.json"));
    let _ = std::fs::remove_file(data_dir.join("analyses_history.json"));

    println!("Token Metrics SDK: evolution tracking demo");
    println!("-------------------------------------------");

    // 1. Wire the tracker with scripted providers. No OpenAI key is
    // configured, so the analyst answers with its warning text, exactly
    // as it would in an unconfigured deployment.
    let market = Arc::new(ScriptedProvider::new("market-desk"));
    let risk = Arc::new(ScriptedProvider::new("risk-desk"));
    let providers: Vec<Arc<dyn MetricsProvider>> = vec![market.clone(), risk.clone()];

    let registry = Arc::new(TokenRegistry::load(data_dir.join("tokens.json")).await?);
    let history = Arc::new(HistoryStore::load(data_dir.join("analyses_history.json")).await?);
    let analyst: Arc<dyn Analyst> = Arc::new(GptAnalyst::with_api_key(None)?);
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(None, None));

    let tracker = TokenTracker::new(registry, history, providers, analyst, notifier);

    // 2. Register two tokens with their launch metrics.
    tracker
        .register(TokenSnapshot {
            name: Some("Moon Token".into()),
            symbol: Some("MOON".into()),
            market_cap: Some(json!(1_000_000)),
            holders: Some(json!(1_000)),
            risk_score: Some(json!(2.5)),
            honeypot: Some(false),
            lp_locked: Some(true),
            top_holders: Some(vec!["0xabc123".into(), "0xdef456".into()]),
            ..TokenSnapshot::new(MOON)
        })
        .await?;
    tracker
        .register(TokenSnapshot {
            name: Some("Safe Token".into()),
            symbol: Some("SAFE".into()),
            market_cap: Some(json!(5_000_000)),
            holders: Some(json!(2_500)),
            risk_score: Some(json!(1.0)),
            honeypot: Some(false),
            lp_locked: Some(true),
            ..TokenSnapshot::new(SAFE)
        })
        .await?;

    println!("Registered {} tokens\n", tracker.tokens().await.len());

    // 3. Script three cycles of market movement per token. The first
    // cycle's evolution is measured against the registered values.
    market.push(MOON, market_update(1_150_000, 1_060));
    market.push(MOON, market_update(1_350_000, 1_180));
    market.push(MOON, market_update(1_200_000, 1_250));
    risk.push(MOON, risk_update(2.4));
    risk.push(MOON, risk_update(2.8));
    risk.push(MOON, risk_update(2.6));

    market.push(SAFE, market_update(5_300_000, 2_620));
    market.push(SAFE, market_update(5_750_000, 2_900));
    market.push(SAFE, market_update(6_900_000, 3_300));
    risk.push(SAFE, risk_update(1.1));
    risk.push(SAFE, risk_update(1.2));
    risk.push(SAFE, risk_update(0.9));

    // 4. Run the cycles. Calling run_pass directly bypasses the interval;
    // a deployment would use tracker.start() instead.
    for cycle in 1..=3 {
        println!("Analysis cycle {}", cycle);
        println!("------------------");
        tracker.run_pass().await;

        for address in [MOON, SAFE] {
            let snapshot = tracker.token(address).await.unwrap();
            let entry = tracker.latest_entry(address).await.unwrap();

            println!(
                "\n  {} ({})",
                snapshot.name.as_deref().unwrap_or("?"),
                snapshot.symbol.as_deref().unwrap_or("?")
            );

            if let Some(evolution) = &entry.evolution {
                println!("  Evolution since last analysis:");
                for (label, text) in evolution.describe() {
                    println!("    {}: {}", label, text);
                }
            }

            let preview: String = entry.analysis.chars().take(80).collect();
            println!("  Analysis: {}...", preview);
        }

        println!("\nCycle {} recorded durably\n", cycle);
        if cycle < 3 {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    // 5. What the passes left behind.
    println!("-------------------------------------------");
    for health in tracker.provider_health().await {
        println!(
            "Provider {}: {} fetches, {:.0}% success, p50 {:.1}ms",
            health.provider_name,
            health.total_fetches,
            health.success_rate * 100.0,
            health.latency_p50_ms
        );
    }

    for (address, entries) in tracker.full_history().await {
        println!("History for {}: {} entries", address, entries.len());
    }

    println!("\nDurable state:");
    println!("  {}", data_dir.join("tokens.json").display());
    println!("  {}", data_dir.join("analyses_history.json").display());
    println!("\nInspect them to see exactly what a restart would reload.");

    Ok(())
}
