//! Access token entity.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::key::{CredentialType, credential_key};
use super::scope::ScopeSet;

fn access_token_type() -> CredentialType {
    CredentialType::AccessToken
}

fn bearer() -> String {
    "Bearer".to_string()
}

/// A cached access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenEntity {
    /// Home account id; absent for app-only tokens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::empty_as_none"
    )]
    pub home_account_id: Option<String>,
    /// Host the token is filed under.
    pub environment: String,
    /// Always [`CredentialType::AccessToken`].
    #[serde(default = "access_token_type")]
    pub credential_type: CredentialType,
    /// Client the token was issued to.
    pub client_id: String,
    /// Tenant the token was issued by.
    #[serde(default)]
    pub realm: String,
    /// Granted scopes.
    pub target: ScopeSet,
    /// When the token was written to the cache.
    #[serde(with = "super::unix_seconds")]
    pub cached_at: DateTime<Utc>,
    /// When the token expires.
    #[serde(with = "super::unix_seconds")]
    pub expires_on: DateTime<Utc>,
    /// End of the extended lifetime window.
    #[serde(with = "super::unix_seconds")]
    pub extended_expires_on: DateTime<Utc>,
    /// The access token itself.
    pub secret: String,
    /// Token type, normally `Bearer`.
    #[serde(default = "bearer")]
    pub token_type: String,
    /// Hash of the user assertion for on-behalf-of tokens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::empty_as_none"
    )]
    pub user_assertion_hash: Option<String>,
    /// Fields not recognized by this version.
    #[serde(flatten)]
    pub additional_fields: BTreeMap<String, serde_json::Value>,
}

impl AccessTokenEntity {
    /// Creates an access token entity. Timestamps are truncated to whole seconds.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        environment: impl Into<String>,
        client_id: impl Into<String>,
        realm: impl Into<String>,
        target: ScopeSet,
        secret: impl Into<String>,
        cached_at: DateTime<Utc>,
        expires_on: DateTime<Utc>,
        extended_expires_on: DateTime<Utc>,
    ) -> Self {
        Self {
            home_account_id: None,
            environment: environment.into(),
            credential_type: CredentialType::AccessToken,
            client_id: client_id.into(),
            realm: realm.into(),
            target,
            cached_at: cached_at.trunc_subsecs(0),
            expires_on: expires_on.trunc_subsecs(0),
            extended_expires_on: extended_expires_on.trunc_subsecs(0),
            secret: secret.into(),
            token_type: bearer(),
            user_assertion_hash: None,
            additional_fields: BTreeMap::new(),
        }
    }

    /// Sets the home account id.
    #[must_use]
    pub fn with_home_account_id(mut self, home_account_id: impl Into<String>) -> Self {
        self.home_account_id = Some(home_account_id.into());
        self
    }

    /// Sets the user assertion hash.
    #[must_use]
    pub fn with_user_assertion_hash(mut self, hash: impl Into<String>) -> Self {
        self.user_assertion_hash = Some(hash.into());
        self
    }

    /// Sets the token type.
    #[must_use]
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Cache key.
    #[must_use]
    pub fn key(&self) -> String {
        credential_key(
            self.home_account_id.as_deref().unwrap_or_default(),
            &self.environment,
            self.credential_type,
            &self.client_id,
            &self.realm,
            &self.target.to_target(),
        )
    }

    /// Returns true if the token expires at or before `now + buffer`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>, buffer: chrono::Duration) -> bool {
        self.expires_on <= now + buffer
    }

    /// Returns true if the extended lifetime window is still open past `now + buffer`.
    #[must_use]
    pub fn is_within_extended_lifetime(&self, now: DateTime<Utc>, buffer: chrono::Duration) -> bool {
        self.extended_expires_on > now + buffer
    }
}
