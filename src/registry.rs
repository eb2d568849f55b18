//! Durable registry of tracked tokens

use crate::{error::StoreError, types::TokenSnapshot};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Durable, ordered registry of the tokens the tracker follows
///
/// Holds exactly one current snapshot per token address, in registration
/// order. Every mutation is flushed to the backing JSON document before it
/// returns, under the same write lock that changed the in-memory state, so
/// an acknowledged registration is never lost to a restart.
pub struct TokenRegistry {
    tokens: RwLock<Vec<TokenSnapshot>>,
    path: PathBuf,
}

impl TokenRegistry {
    /// Opens the registry backed by the JSON document at `path`
    ///
    /// A missing document is an empty registry; an unreadable or malformed
    /// one is an error, so silent data loss is impossible.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let tokens: Vec<TokenSnapshot> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::malformed(path.display().to_string(), e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::read(path.display().to_string(), e)),
        };

        tracing::debug!(
            path = %path.display(),
            count = tokens.len(),
            "Loaded token registry"
        );

        Ok(Self {
            tokens: RwLock::new(tokens),
            path,
        })
    }

    /// Registers a token for tracking
    ///
    /// # Arguments
    /// * `snapshot` - Initial snapshot; its metric fields are stored as
    ///   supplied, without validation
    ///
    /// # Returns
    /// `true` if the token was added, `false` if the address was already
    /// registered (the existing entry is left untouched)
    pub async fn register(&self, snapshot: TokenSnapshot) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.write().await;

        if tokens.iter().any(|t| t.address == snapshot.address) {
            tracing::debug!(address = %snapshot.address, "Token already registered");
            return Ok(false);
        }

        tracing::info!(address = %snapshot.address, "Registering token");
        tokens.push(snapshot);
        self.persist(&tokens).await?;
        Ok(true)
    }

    /// Replaces the current snapshot of an already-registered token
    ///
    /// An update for an address that was never registered is logged and
    /// dropped; it does not create a registration and is not an error.
    pub async fn update(&self, snapshot: TokenSnapshot) -> Result<(), StoreError> {
        let mut tokens = self.tokens.write().await;

        match tokens.iter().position(|t| t.address == snapshot.address) {
            Some(idx) => {
                tokens[idx] = snapshot;
                self.persist(&tokens).await
            }
            None => {
                tracing::warn!(
                    address = %snapshot.address,
                    "Ignoring update for unregistered token"
                );
                Ok(())
            }
        }
    }

    /// Gets the current snapshot for an address
    pub async fn get(&self, address: &str) -> Option<TokenSnapshot> {
        let tokens = self.tokens.read().await;
        tokens.iter().find(|t| t.address == address).cloned()
    }

    /// Returns all current snapshots in registration order
    pub async fn list(&self) -> Vec<TokenSnapshot> {
        self.tokens.read().await.clone()
    }

    /// Number of registered tokens
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// True when no token is registered
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    /// Writes the full document to disk; called with the write lock held
    /// so concurrent mutations serialize and the file always reflects a
    /// state the memory actually held
    async fn persist(&self, tokens: &[TokenSnapshot]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(tokens)
            .map_err(|e| StoreError::not_durable(self.path.display().to_string(), e.into()))?;
        write_atomic(&self.path, &json).await
    }
}

/// Writes `bytes` to `path` via a sibling temp file and a rename, so a
/// crash mid-write leaves the previous document intact
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let display = path.display().to_string();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::not_durable(&display, e))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::not_durable(&display, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::not_durable(&display, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(address: &str) -> TokenSnapshot {
        TokenSnapshot {
            market_cap: Some(json!(1_000_000)),
            ..TokenSnapshot::new(address)
        }
    }

    #[tokio::test]
    async fn registration_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let registry = TokenRegistry::load(&path).await.unwrap();
        assert!(registry.register(snapshot("0xaaa")).await.unwrap());
        assert!(registry.register(snapshot("0xbbb")).await.unwrap());
        drop(registry);

        let reloaded = TokenRegistry::load(&path).await.unwrap();
        let tokens = reloaded.list().await;
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].address, "0xaaa");
        assert_eq!(tokens[1].address, "0xbbb");

        // The temp file was renamed away, not abandoned.
        assert!(!dir.path().join("tokens.json.tmp").exists());
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let registry = TokenRegistry::load(&path).await.unwrap();

        let mut first = snapshot("0xaaa");
        first.name = Some("Original".into());
        assert!(registry.register(first).await.unwrap());

        let mut second = snapshot("0xaaa");
        second.name = Some("Imposter".into());
        assert!(!registry.register(second).await.unwrap());

        assert_eq!(registry.len().await, 1);
        let kept = registry.get("0xaaa").await.unwrap();
        assert_eq!(kept.name.as_deref(), Some("Original"));
    }

    #[tokio::test]
    async fn update_replaces_the_current_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let registry = TokenRegistry::load(&path).await.unwrap();

        registry.register(snapshot("0xaaa")).await.unwrap();

        let mut updated = snapshot("0xaaa");
        updated.market_cap = Some(json!(1_500_000));
        registry.update(updated).await.unwrap();

        let current = registry.get("0xaaa").await.unwrap();
        assert_eq!(current.market_cap, Some(json!(1_500_000)));

        // The replacement is already on disk.
        let reloaded = TokenRegistry::load(&path).await.unwrap();
        let persisted = reloaded.get("0xaaa").await.unwrap();
        assert_eq!(persisted.market_cap, Some(json!(1_500_000)));
    }

    #[tokio::test]
    async fn update_for_unknown_token_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let registry = TokenRegistry::load(&path).await.unwrap();

        registry.update(snapshot("0xghost")).await.unwrap();

        assert!(registry.is_empty().await);
        assert!(registry.get("0xghost").await.is_none());
    }

    #[tokio::test]
    async fn addresses_are_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let registry = TokenRegistry::load(&path).await.unwrap();

        registry.register(snapshot("0xAAA")).await.unwrap();
        assert!(registry.register(snapshot("0xaaa")).await.unwrap());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn concurrent_registrations_all_survive_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        let registry = std::sync::Arc::new(TokenRegistry::load(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..10 {
            let registry = std::sync::Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .register(snapshot(&format!("0x{:02}", i)))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        assert_eq!(registry.len().await, 10);

        let reloaded = TokenRegistry::load(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 10);
    }

    #[tokio::test]
    async fn malformed_document_is_an_error_not_a_reset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let err = TokenRegistry::load(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn missing_document_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let registry = TokenRegistry::load(&path).await.unwrap();
        assert!(registry.is_empty().await);
    }
}
