//! Account entity and the public account handle.

use std::collections::BTreeMap;

use idcache_oauth::AuthorityType;
use serde::{Deserialize, Serialize};

use super::key::account_key;

/// Username recorded when the id token carries no `preferred_username`.
pub const NULL_PREFERRED_USERNAME: &str = "Missing from the token response";

fn default_authority_type() -> String {
    AuthorityType::Aad.as_cache_str().to_string()
}

/// A cached account record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountEntity {
    /// Home account id (`uid.utid`).
    pub home_account_id: String,
    /// Host the account was last updated under.
    pub environment: String,
    /// Tenant of the account.
    #[serde(default)]
    pub realm: String,
    /// Object id of the user in `realm`.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::empty_as_none"
    )]
    pub local_account_id: Option<String>,
    /// Displayable username.
    #[serde(default)]
    pub username: String,
    /// `MSSTS`, `ADFS` or `B2C`.
    #[serde(default = "default_authority_type")]
    pub authority_type: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    /// Raw base64url client info the account was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_info: Option<String>,
    /// Fields not recognized by this version.
    #[serde(flatten)]
    pub additional_fields: BTreeMap<String, serde_json::Value>,
}

impl AccountEntity {
    /// Creates an account entity with only the identifying fields set.
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        environment: impl Into<String>,
        realm: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            environment: environment.into(),
            realm: realm.into(),
            local_account_id: None,
            username: username.into(),
            authority_type: default_authority_type(),
            name: None,
            given_name: None,
            family_name: None,
            client_info: None,
            additional_fields: BTreeMap::new(),
        }
    }

    /// Sets the authority type.
    #[must_use]
    pub fn with_authority_type(mut self, authority_type: AuthorityType) -> Self {
        self.authority_type = authority_type.as_cache_str().to_string();
        self
    }

    /// Cache key.
    #[must_use]
    pub fn key(&self) -> String {
        account_key(&self.home_account_id, &self.environment, &self.realm)
    }

    /// Public handle for this record.
    #[must_use]
    pub fn to_account(&self) -> Account {
        Account {
            home_account_id: Some(self.home_account_id.clone()),
            username: self.username.clone(),
            environment: self.environment.clone(),
        }
    }
}

/// An account as seen by callers of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    /// Home account id; `None` for users known only to the legacy cache
    /// without client info.
    pub home_account_id: Option<String>,
    /// Displayable username.
    pub username: String,
    /// Host the account was seen under.
    pub environment: String,
}

impl Account {
    /// Creates an account handle.
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        username: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: Some(home_account_id.into()),
            username: username.into(),
            environment: environment.into(),
        }
    }
}

impl std::fmt::Display for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.home_account_id {
            Some(id) => write!(f, "{} ({id}) @ {}", self.username, self.environment),
            None => write!(f, "{} @ {}", self.username, self.environment),
        }
    }
}
