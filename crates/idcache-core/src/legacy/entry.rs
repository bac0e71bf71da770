//! Legacy cache entries and the flat key→blob document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::key::LegacyKey;
use crate::{Error, Result};

/// User information stored with a legacy entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyUserInfo {
    /// Object id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// UPN or email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub displayable_id: Option<String>,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

/// A legacy cache blob: one token result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyEntry {
    /// Access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Access token type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_type: Option<String>,
    /// Expiry, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<i64>,
    /// Extended expiry, unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_expires_on: Option<i64>,
    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Resource the refresh token was issued for; marks it multi-resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_in_response: Option<String>,
    /// Base64url client info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_client_info: Option<String>,
    /// Tenant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Raw id token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// User information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<LegacyUserInfo>,
}

/// The legacy cache document: a flat map of key to entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyCache {
    entries: BTreeMap<LegacyKey, LegacyEntry>,
}

impl LegacyCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces an entry, returning the previous one.
    pub fn insert(&mut self, key: LegacyKey, entry: LegacyEntry) -> Option<LegacyEntry> {
        self.entries.insert(key, entry)
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, key: &LegacyKey) -> Option<&LegacyEntry> {
        self.entries.get(key)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&LegacyKey, &LegacyEntry)> {
        self.entries.iter()
    }

    /// Keeps only entries for which `keep` returns true. Returns how many were dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&LegacyKey, &LegacyEntry) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, v| keep(k, v));
        before - self.entries.len()
    }

    /// Copies every entry of `other` over this cache.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Decodes a legacy document. Empty input is an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CacheDeserializationFailed`] if the document is malformed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let trimmed = bytes.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            return Ok(Self::new());
        }
        let entries = serde_json::from_slice(trimmed)
            .map_err(|e| Error::CacheDeserializationFailed(format!("legacy cache: {e}")))?;
        Ok(Self { entries })
    }

    /// Encodes the legacy document.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry fails to serialize.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.entries)?)
    }
}
