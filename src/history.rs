//! Durable, capped per-token history of analysis passes

use crate::{
    constants::HISTORY_RETENTION,
    error::StoreError,
    registry::write_atomic,
    types::HistoryEntry,
};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// Append-only history of analysis passes, one capped queue per token
///
/// Each append is flushed to the backing JSON document before it returns.
/// Once a token's queue reaches the retention cap, the oldest entry is
/// dropped for each new one, so the newest entries always survive.
pub struct HistoryStore {
    entries: RwLock<HashMap<String, VecDeque<HistoryEntry>>>,
    path: PathBuf,
}

impl HistoryStore {
    /// Opens the history backed by the JSON document at `path`
    ///
    /// A missing document is an empty history; an unreadable or malformed
    /// one is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries: HashMap<String, VecDeque<HistoryEntry>> =
            match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::malformed(path.display().to_string(), e))?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
                Err(e) => return Err(StoreError::read(path.display().to_string(), e)),
            };

        tracing::debug!(
            path = %path.display(),
            tokens = entries.len(),
            "Loaded analysis history"
        );

        Ok(Self {
            entries: RwLock::new(entries),
            path,
        })
    }

    /// Appends one entry to a token's history, evicting the oldest entry
    /// once the retention cap is reached
    pub async fn append(&self, address: &str, entry: HistoryEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;

        let queue = entries.entry(address.to_string()).or_default();
        queue.push_back(entry);
        while queue.len() > HISTORY_RETENTION {
            queue.pop_front();
        }

        let count = queue.len();
        self.persist(&entries).await?;

        tracing::debug!(%address, entries = count, "Appended history entry");
        Ok(())
    }

    /// Most recent entry for a token, if it has any history
    pub async fn latest(&self, address: &str) -> Option<HistoryEntry> {
        let entries = self.entries.read().await;
        entries.get(address).and_then(|q| q.back()).cloned()
    }

    /// Full retained history for a token, oldest first
    ///
    /// An address with no history returns an empty list, whether it is
    /// unregistered or simply has not been analyzed yet.
    pub async fn entries_for(&self, address: &str) -> Vec<HistoryEntry> {
        let entries = self.entries.read().await;
        entries
            .get(address)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Retained history for every token, oldest first per token
    pub async fn all(&self) -> HashMap<String, Vec<HistoryEntry>> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(address, q)| (address.clone(), q.iter().cloned().collect()))
            .collect()
    }

    /// Writes the full document to disk; called with the write lock held
    async fn persist(
        &self,
        entries: &HashMap<String, VecDeque<HistoryEntry>>,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| StoreError::not_durable(self.path.display().to_string(), e.into()))?;
        write_atomic(&self.path, &json).await
    }
}
