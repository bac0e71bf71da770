//! Error types for the token cache.

use thiserror::Error;

/// Errors that can occur in cache operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A serialized cache blob could not be parsed. The store is unchanged.
    #[error("Cache deserialization failed: {0}")]
    CacheDeserializationFailed(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A token response or authority could not be interpreted.
    #[error("OAuth error: {0}")]
    OAuth(#[from] idcache_oauth::Error),

    /// Instance discovery failed while authority validation was requested.
    #[error("Instance discovery failed: {0}")]
    InstanceDiscovery(#[source] idcache_oauth::Error),

    /// The alias resolver was used after `dispose`.
    #[error("Alias resolver has been disposed")]
    ResolverDisposed,

    /// The request descriptor is incomplete or inconsistent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A persistence layer rejected a load or write.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// OS credential vault error.
    #[error("Credential error: {0}")]
    Credential(#[from] keyring::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
