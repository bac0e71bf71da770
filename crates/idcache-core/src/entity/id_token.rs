//! Id token entity.

use std::collections::BTreeMap;

use idcache_oauth::IdToken;
use serde::{Deserialize, Serialize};

use super::key::{CredentialType, credential_key};

fn id_token_type() -> CredentialType {
    CredentialType::IdToken
}

/// A cached raw id token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenEntity {
    /// Home account id of the user.
    #[serde(default)]
    pub home_account_id: String,
    /// Host the token is filed under.
    pub environment: String,
    /// Always [`CredentialType::IdToken`].
    #[serde(default = "id_token_type")]
    pub credential_type: CredentialType,
    /// Client the token was issued to.
    pub client_id: String,
    /// Tenant the token was issued by.
    #[serde(default)]
    pub realm: String,
    /// Raw JWT.
    pub secret: String,
    /// Fields not recognized by this version.
    #[serde(flatten)]
    pub additional_fields: BTreeMap<String, serde_json::Value>,
}

impl IdTokenEntity {
    /// Creates an id token entity.
    #[must_use]
    pub fn new(
        home_account_id: impl Into<String>,
        environment: impl Into<String>,
        client_id: impl Into<String>,
        realm: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            environment: environment.into(),
            credential_type: CredentialType::IdToken,
            client_id: client_id.into(),
            realm: realm.into(),
            secret: secret.into(),
            additional_fields: BTreeMap::new(),
        }
    }

    /// Cache key.
    #[must_use]
    pub fn key(&self) -> String {
        credential_key(
            &self.home_account_id,
            &self.environment,
            self.credential_type,
            &self.client_id,
            &self.realm,
            "",
        )
    }

    /// Decodes the stored JWT's claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored secret is not a well-formed JWT.
    pub fn claims(&self) -> crate::Result<IdToken> {
        Ok(IdToken::parse(&self.secret)?)
    }
}
