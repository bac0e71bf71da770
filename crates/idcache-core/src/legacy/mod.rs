//! Interop with the legacy flat token cache.
//!
//! Older clients keep one blob per authority, resource, client and user.
//! User tokens written to the unified cache are mirrored there so both
//! generations of clients share sign-in state; the unified cache stays the
//! source of truth on read.

mod bridge;
mod entry;
mod key;

pub use bridge::{
    LegacyUsers, find_refresh_token, from_legacy_entries, legacy_users, remove_user,
    to_legacy_entries, write_refresh_tokens,
};
pub use entry::{LegacyCache, LegacyEntry, LegacyUserInfo};
pub use key::{LegacyKey, SubjectType};

use std::sync::{Mutex, PoisonError};

use crate::Result;

/// Durable home of the legacy cache document.
pub trait LegacyCachePersistence: Send + Sync {
    /// Reads the raw document. Missing storage reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read.
    fn load(&self) -> Result<Vec<u8>>;

    /// Replaces the raw document.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage rejects the write.
    fn write(&self, bytes: &[u8]) -> Result<()>;

    /// Reads and decodes the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage cannot be read or the document is malformed.
    fn load_cache(&self) -> Result<LegacyCache> {
        LegacyCache::from_bytes(&self.load()?)
    }

    /// Encodes and writes the document.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    fn write_cache(&self, cache: &LegacyCache) -> Result<()> {
        self.write(&cache.to_bytes()?)
    }
}

/// Legacy document held in memory.
#[derive(Debug, Default)]
pub struct InMemoryLegacyPersistence {
    blob: Mutex<Vec<u8>>,
}

impl InMemoryLegacyPersistence {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LegacyCachePersistence for InMemoryLegacyPersistence {
    fn load(&self) -> Result<Vec<u8>> {
        Ok(self
            .blob
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn write(&self, bytes: &[u8]) -> Result<()> {
        *self.blob.lock().unwrap_or_else(PoisonError::into_inner) = bytes.to_vec();
        Ok(())
    }
}
