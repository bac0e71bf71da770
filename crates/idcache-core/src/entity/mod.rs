//! Cache entities and their keys.
//!
//! Every entity serializes to the unified cache schema shared across
//! platforms. Fields the schema does not name are kept in
//! `additional_fields` so that a blob written by a newer library survives a
//! load/save cycle.

mod access_token;
mod account;
mod id_token;
mod key;
mod refresh_token;
mod scope;

pub use access_token::AccessTokenEntity;
pub use account::{Account, AccountEntity, NULL_PREFERRED_USERNAME};
pub use id_token::IdTokenEntity;
pub use key::{CredentialType, account_key, credential_key};
pub use refresh_token::RefreshTokenEntity;
pub use scope::ScopeSet;

/// Unix-seconds timestamps, written as strings and read as strings or numbers.
pub(crate) mod unix_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.timestamp().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| de::Error::custom(format!("invalid timestamp: {text}")))?,
            Raw::Number(n) => n,
        };
        Utc.timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {seconds}")))
    }
}

/// Treats `""` the same as a missing value.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}
