//! Provider abstraction for fetching token metrics from external APIs

use crate::{error::ProviderError, types::ProviderUpdate};
use async_trait::async_trait;

/// Trait for token metrics providers
///
/// Implementations fetch live market or risk data for a single token from
/// an upstream source (Moralis, RugCheck, etc.). Each adapter reports only
/// the fields its source knows about; the tracker overlays the partial
/// updates onto the token's current snapshot.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Fetches the current metrics for one token address
    ///
    /// # Arguments
    /// * `address` - The token address to fetch metrics for
    ///
    /// # Returns
    /// A partial update with the fields this source reported, or an error
    /// if the fetch fails
    async fn fetch(&self, address: &str) -> Result<ProviderUpdate, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
