//! Error types for the token metrics tracker

use thiserror::Error;

/// Errors that can occur when fetching metrics from a provider
///
/// Every variant is recoverable: the scheduler treats any of them as
/// "no data from this source" and carries on with the other sources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// The provider's API key is not set in the environment
    #[error("Missing credentials: {0} is not set")]
    MissingCredentials(&'static str),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors that can occur in the durable stores (registry and history)
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file exists but could not be read
    #[error("Failed to read store file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but does not parse as the expected document
    #[error("Store file {path} is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A mutation was applied in memory but the durable write failed.
    ///
    /// The in-memory state is ahead of disk; the next successful flush of
    /// the full document makes it durable again, so callers should log and
    /// retry on the next mutation rather than tear the process down.
    #[error("Durable write to {path} failed (in-memory state is ahead of disk): {source}")]
    NotDurable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from assembling a tracker out of its stores and providers
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A durable store could not be opened
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A provider or analyst client could not be built
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl StoreError {
    /// Creates a Read error
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a Malformed error
    pub fn malformed(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }

    /// Creates a NotDurable error
    pub fn not_durable(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::NotDurable {
            path: path.into(),
            source,
        }
    }
}
