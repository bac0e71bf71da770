//! Token endpoint payloads and the values decoded from them.

mod assertion;
mod client_info;
mod id_token;

pub use assertion::UserAssertion;
pub use client_info::ClientInfo;
pub use id_token::IdToken;

use crate::error::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token response from the token endpoint.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Extended lifetime in seconds (resilience window beyond `expires_in`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext_expires_in: Option<u64>,
    /// Refresh token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Raw id token (JWT).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// Space separated scopes granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Base64url encoded `{uid, utid}` JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<String>,
    /// Family of client ids this refresh token is shared with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foci: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Lifetime assumed when the server omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

impl TokenResponse {
    /// Creates a bearer token response.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            ..Self::default()
        }
    }

    /// Sets `expires_in`.
    #[must_use]
    pub const fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the id token.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the raw client info.
    #[must_use]
    pub fn with_client_info(mut self, client_info: impl Into<String>) -> Self {
        self.client_info = Some(client_info.into());
        self
    }

    /// Absolute expiry relative to `now`, saturating at the latest
    /// representable instant.
    #[must_use]
    pub fn expires_on(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        after(now, self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
    }

    /// Absolute extended expiry relative to `now`; falls back to `expires_on`.
    #[must_use]
    pub fn extended_expires_on(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.ext_expires_in
            .map_or_else(|| self.expires_on(now), |secs| after(now, secs))
    }

    /// Decoded client info, if the response carried any.
    ///
    /// # Errors
    ///
    /// Returns an error if `client_info` is present but malformed.
    pub fn decode_client_info(&self) -> crate::Result<Option<ClientInfo>> {
        self.client_info
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(ClientInfo::decode)
            .transpose()
    }

    /// Decoded id token, if the response carried one.
    ///
    /// # Errors
    ///
    /// Returns an error if `id_token` is present but malformed.
    pub fn decode_id_token(&self) -> crate::Result<Option<IdToken>> {
        self.id_token
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(IdToken::parse)
            .transpose()
    }
}

fn after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Error response from `OAuth2` server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,
    /// Error description.
    #[serde(default)]
    pub error_description: String,
}

impl ErrorResponse {
    /// Converts to an Error.
    #[must_use]
    pub fn into_error(self) -> Error {
        Error::oauth_error(self.error, self.error_description)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_deserialize() {
        let json = r#"{
            "access_token": "at",
            "token_type": "Bearer",
            "expires_in": 3599,
            "ext_expires_in": 7200,
            "refresh_token": "rt",
            "scope": "r1/scope1 r1/scope2"
        }"#;
        let response: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.access_token, "at");
        assert_eq!(response.expires_in, Some(3599));
        assert_eq!(response.refresh_token.as_deref(), Some("rt"));
        assert!(response.id_token.is_none());
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"at"}"#).unwrap();
        assert_eq!(response.token_type, "Bearer");
    }

    #[test]
    fn test_expiry_computation() {
        let now = Utc::now();
        let response = TokenResponse::new("at").with_expires_in(60);
        assert_eq!(response.expires_on(now), now + Duration::seconds(60));
        assert_eq!(response.extended_expires_on(now), now + Duration::seconds(60));

        let mut extended = response.clone();
        extended.ext_expires_in = Some(600);
        assert_eq!(extended.extended_expires_on(now), now + Duration::seconds(600));

        let defaulted = TokenResponse::new("at");
        assert_eq!(defaulted.expires_on(now), now + Duration::seconds(3600));
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let now = Utc::now();
        let mut response = TokenResponse::new("at").with_expires_in(10_000_000_000_000);
        response.ext_expires_in = Some(u64::MAX);
        assert_eq!(response.expires_on(now), DateTime::<Utc>::MAX_UTC);
        assert_eq!(response.extended_expires_on(now), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn test_empty_client_info_is_none() {
        let response = TokenResponse::new("at").with_client_info("");
        assert!(response.decode_client_info().unwrap().is_none());
    }

    #[test]
    fn test_error_response() {
        let response: ErrorResponse =
            serde_json::from_str(r#"{"error":"invalid_instance"}"#).unwrap();
        let error = response.into_error();
        assert!(matches!(error, Error::OAuth { ref error, .. } if error == "invalid_instance"));
    }
}
