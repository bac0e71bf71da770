//! Cache key composition.
//!
//! Credential keys follow
//! `<home_account_id>-<environment>-<credential_type>-<client_id>-<realm>-<target>`
//! and account keys `<home_account_id>-<environment>-<realm>`, all lower-cased.
//! Absent components are written as empty strings so the number of
//! delimiters is fixed per credential type. Inside a component `%` is
//! written as `%25` and `-` as `%2d`, so the delimiter only ever separates
//! components and distinct field tuples never share a key.

use serde::{Deserialize, Serialize};

/// Delimiter between key components.
const KEY_DELIMITER: &str = "-";

/// Kind of credential, as written to the `credential_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialType {
    /// Access token.
    AccessToken,
    /// Refresh token.
    RefreshToken,
    /// Id token.
    IdToken,
}

impl CredentialType {
    /// Lower-case form used inside keys.
    #[must_use]
    pub const fn key_component(self) -> &'static str {
        match self {
            Self::AccessToken => "accesstoken",
            Self::RefreshToken => "refreshtoken",
            Self::IdToken => "idtoken",
        }
    }
}

/// Builds the key of a credential entity.
#[must_use]
pub fn credential_key(
    home_account_id: &str,
    environment: &str,
    credential_type: CredentialType,
    client_id: &str,
    realm: &str,
    target: &str,
) -> String {
    join_components(&[
        home_account_id,
        environment,
        credential_type.key_component(),
        client_id,
        realm,
        target,
    ])
}

/// Builds the key of an account entity.
#[must_use]
pub fn account_key(home_account_id: &str, environment: &str, realm: &str) -> String {
    join_components(&[home_account_id, environment, realm])
}

fn join_components(components: &[&str]) -> String {
    components
        .iter()
        .map(|component| escape_component(component))
        .collect::<Vec<_>>()
        .join(KEY_DELIMITER)
}

fn escape_component(component: &str) -> String {
    component
        .to_lowercase()
        .replace('%', "%25")
        .replace(KEY_DELIMITER, "%2d")
}
