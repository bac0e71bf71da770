//! The unified cache document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{AccessTokenEntity, AccountEntity, IdTokenEntity, RefreshTokenEntity};
use crate::{Error, Result};

/// Full contents of a cache, keyed by entity key.
///
/// Serializes to the unified schema: four top-level sections, each a map
/// from key to entity. Keys are recomputed from entity fields on load, so a
/// hand-edited key in the document cannot desynchronize the index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheContents {
    /// Access tokens.
    #[serde(rename = "AccessToken", default)]
    pub access_tokens: BTreeMap<String, AccessTokenEntity>,
    /// Refresh tokens.
    #[serde(rename = "RefreshToken", default)]
    pub refresh_tokens: BTreeMap<String, RefreshTokenEntity>,
    /// Id tokens.
    #[serde(rename = "IdToken", default)]
    pub id_tokens: BTreeMap<String, IdTokenEntity>,
    /// Accounts.
    #[serde(rename = "Account", default)]
    pub accounts: BTreeMap<String, AccountEntity>,
}

impl CacheContents {
    /// Creates empty contents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.access_tokens.len() + self.refresh_tokens.len() + self.id_tokens.len() + self.accounts.len()
    }

    /// Returns true if no section holds any entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts or replaces an access token.
    pub fn insert_access_token(&mut self, entity: AccessTokenEntity) {
        self.access_tokens.insert(entity.key(), entity);
    }

    /// Inserts or replaces a refresh token.
    pub fn insert_refresh_token(&mut self, entity: RefreshTokenEntity) {
        self.refresh_tokens.insert(entity.key(), entity);
    }

    /// Inserts or replaces an id token.
    pub fn insert_id_token(&mut self, entity: IdTokenEntity) {
        self.id_tokens.insert(entity.key(), entity);
    }

    /// Inserts or replaces an account.
    pub fn insert_account(&mut self, entity: AccountEntity) {
        self.accounts.insert(entity.key(), entity);
    }

    /// Encodes the unified JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity fails to serialize.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a unified JSON document.
    ///
    /// Returns `Ok(None)` for empty input or a literal `null`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheDeserializationFailed`] if the document is malformed.
    pub fn from_json(bytes: &[u8]) -> Result<Option<Self>> {
        let trimmed = bytes.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            debug!("Skipping empty cache document");
            return Ok(None);
        }

        let parsed: Self = serde_json::from_slice(trimmed)
            .map_err(|e| Error::CacheDeserializationFailed(e.to_string()))?;

        let mut contents = Self::new();
        parsed
            .access_tokens
            .into_values()
            .for_each(|e| contents.insert_access_token(e));
        parsed
            .refresh_tokens
            .into_values()
            .for_each(|e| contents.insert_refresh_token(e));
        parsed
            .id_tokens
            .into_values()
            .for_each(|e| contents.insert_id_token(e));
        parsed
            .accounts
            .into_values()
            .for_each(|e| contents.insert_account(e));
        Ok(Some(contents))
    }
}
