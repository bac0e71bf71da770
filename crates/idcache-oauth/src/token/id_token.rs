//! Unverified `id_token` claim extraction.
//!
//! The cache only needs display data and identifiers from the id token; the
//! signature is validated by whoever issued the request, never here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use super::client_info::decode_base64url;
use crate::error::{Error, Result};

/// Claims read from an id token payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdToken {
    /// Object id of the user in the issuing tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<String>,
    /// Subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuing tenant id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tid: Option<String>,
    /// User principal name or email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl IdToken {
    /// Parses the payload segment of a compact JWT.
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not have three segments or the
    /// payload is not base64url JSON.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(Error::InvalidIdToken(
                    "id token must have three segments".into(),
                ));
            }
        };
        let bytes = decode_base64url(payload)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidIdToken(format!("failed to parse id token payload: {e}")))
    }

    /// Builds an unsigned compact JWT carrying these claims.
    ///
    /// Useful for fixtures and for the legacy cache, which stores a raw id token.
    #[must_use]
    pub fn to_unsigned_jwt(&self) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self).unwrap_or_default());
        format!("{header}.{payload}.")
    }

    /// Object id, falling back to the subject.
    #[must_use]
    pub fn object_id(&self) -> Option<&str> {
        self.oid.as_deref().or(self.sub.as_deref())
    }
}
