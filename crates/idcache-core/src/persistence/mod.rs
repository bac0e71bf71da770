//! Durable storage for the cache.
//!
//! Unified cache persistence is expressed as [`CacheHooks`](crate::CacheHooks):
//! load the stored document before each access, write it back after an
//! access that changed state. The legacy document uses
//! [`LegacyCachePersistence`](crate::legacy::LegacyCachePersistence).
//!
//! Backends:
//! - Files on disk, written through a temporary file and a rename
//! - The OS credential vault (Secret Service, Keychain, Credential Manager)

mod file;
mod vault;

pub use file::{FileCachePersistence, FileLegacyPersistence};
pub use vault::{DEFAULT_SERVICE_NAME, KeyringCachePersistence};
