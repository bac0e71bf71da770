//! Persistence in the OS credential vault.
//!
//! Uses the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use tracing::{debug, warn};

use crate::Result;
use crate::hooks::{CacheHooks, CacheSnapshot, MutationQueue, NotificationArgs};

/// Service name used for vault entries unless overridden.
pub const DEFAULT_SERVICE_NAME: &str = "idcache";

/// Default vault entry name for the unified cache.
const DEFAULT_ENTRY_NAME: &str = "token_cache";

/// Keeps the unified cache as a single credential in the OS vault.
#[derive(Debug, Clone)]
pub struct KeyringCachePersistence {
    service: String,
    entry: String,
}

impl Default for KeyringCachePersistence {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICE_NAME, DEFAULT_ENTRY_NAME)
    }
}

impl KeyringCachePersistence {
    /// Creates a hook for the vault entry `entry` under `service`.
    #[must_use]
    pub fn new(service: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            entry: entry.into(),
        }
    }

    fn vault_entry(&self) -> Result<Entry> {
        Ok(Entry::new(&self.service, &self.entry)?)
    }

    /// Reads the stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be reached.
    pub fn load(&self) -> Result<Option<String>> {
        match self.vault_entry()?.get_password() {
            Ok(document) => Ok(Some(document)),
            Err(keyring::Error::NoEntry) => {
                debug!(service = %self.service, entry = %self.entry, "No cache in credential vault");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault rejects the write.
    pub fn store(&self, document: &str) -> Result<()> {
        self.vault_entry()?.set_password(document)?;
        debug!(service = %self.service, entry = %self.entry, "Stored cache in credential vault");
        Ok(())
    }

    /// Deletes the stored document. A missing entry is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault rejects the delete.
    pub fn delete(&self) -> Result<()> {
        match self.vault_entry()?.delete_credential() {
            Ok(()) => {
                debug!(service = %self.service, entry = %self.entry, "Deleted cache from credential vault");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                warn!("Failed to delete cache from credential vault: {e}");
                Err(e.into())
            }
        }
    }
}

impl CacheHooks for KeyringCachePersistence {
    fn before_access(
        &self,
        _args: &NotificationArgs,
        _snapshot: &CacheSnapshot,
        mutations: &mut MutationQueue,
    ) -> Result<()> {
        if let Some(document) = self.load()? {
            mutations.deserialize(document.into_bytes());
        }
        Ok(())
    }

    fn after_access(
        &self,
        args: &NotificationArgs,
        snapshot: &CacheSnapshot,
        _mutations: &mut MutationQueue,
    ) -> Result<()> {
        if !args.has_state_changed {
            return Ok(());
        }
        let bytes = snapshot.serialize()?;
        let document = String::from_utf8(bytes)
            .map_err(|e| crate::Error::Persistence(format!("cache document is not UTF-8: {e}")))?;
        self.store(&document)
    }
}
