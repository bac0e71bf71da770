//! Refresh token entity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::key::{CredentialType, credential_key};

fn refresh_token_type() -> CredentialType {
    CredentialType::RefreshToken
}

/// A cached refresh token. One per environment, client and user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenEntity {
    /// Home account id of the user.
    #[serde(default)]
    pub home_account_id: String,
    /// Host the token is filed under.
    pub environment: String,
    /// Always [`CredentialType::RefreshToken`].
    #[serde(default = "refresh_token_type")]
    pub credential_type: CredentialType,
    /// Client the token was issued to.
    pub client_id: String,
    /// The refresh token itself.
    pub secret: String,
    /// Family of clients sharing this token.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::empty_as_none"
    )]
    pub family_id: Option<String>,
    /// Fields not recognized by this version.
    #[serde(flatten)]
    pub additional_fields: BTreeMap<String, serde_json::Value>,
}

impl RefreshTokenEntity {
    /// Creates a refresh token entity.
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        environment: impl Into<String>,
        client_id: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            environment: environment.into(),
            credential_type: CredentialType::RefreshToken,
            client_id: client_id.into(),
            secret: secret.into(),
            family_id: None,
            additional_fields: BTreeMap::new(),
        }
    }

    /// Sets the family id.
    #[must_use]
    pub fn with_family_id(mut self, family_id: impl Into<String>) -> Self {
        self.family_id = Some(family_id.into());
        self
    }

    /// Cache key. Scopes and realm are not part of it.
    #[must_use]
    pub fn key(&self) -> String {
        credential_key(
            &self.home_account_id,
            &self.environment,
            self.credential_type,
            &self.client_id,
            "",
            "",
        )
    }
}
