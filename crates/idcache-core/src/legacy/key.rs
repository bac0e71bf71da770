//! Legacy cache keys.

use std::fmt;
use std::str::FromStr;

use idcache_oauth::authority::host_of;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::Error;

/// Separator between key components.
const KEY_DELIMITER: &str = ":::";

/// Who a legacy token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubjectType {
    /// A user.
    User,
    /// The client itself.
    Client,
    /// A user through a confidential client.
    UserPlusClient,
}

impl SubjectType {
    const fn as_str(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Client => "Client",
            Self::UserPlusClient => "UserPlusClient",
        }
    }
}

impl FromStr for SubjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            "Client" => Ok(Self::Client),
            "UserPlusClient" => Ok(Self::UserPlusClient),
            other => Err(Error::CacheDeserializationFailed(format!(
                "unknown legacy subject type: {other}"
            ))),
        }
    }
}

/// Composite key of a legacy cache entry.
///
/// Written as `authority:::resource:::client_id:::subject_type:::unique_id:::displayable_id`.
/// Authority, resource, client id and displayable id are lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LegacyKey {
    /// Authority URL.
    pub authority: String,
    /// Resource, or the space-joined scopes for tokens written from the
    /// unified cache.
    pub resource: String,
    /// Client id.
    pub client_id: String,
    /// Subject type.
    pub subject_type: SubjectType,
    /// Unique (object) id of the user.
    pub unique_id: String,
    /// Displayable id (UPN) of the user.
    pub displayable_id: String,
}

impl LegacyKey {
    /// Creates a normalized key.
    #[must_use]
    pub fn new(
        authority: &str,
        resource: &str,
        client_id: &str,
        subject_type: SubjectType,
        unique_id: &str,
        displayable_id: &str,
    ) -> Self {
        Self {
            authority: authority.to_lowercase(),
            resource: resource.to_lowercase(),
            client_id: client_id.to_lowercase(),
            subject_type,
            unique_id: unique_id.to_string(),
            displayable_id: displayable_id.to_lowercase(),
        }
    }

    /// Host of the authority.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        host_of(&self.authority)
    }
}

impl fmt::Display for LegacyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}",
            self.authority,
            self.resource,
            self.client_id,
            self.subject_type.as_str(),
            self.unique_id,
            self.displayable_id
        )
    }
}

impl FromStr for LegacyKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_DELIMITER).collect();
        let [authority, resource, client_id, subject_type, unique_id, displayable_id] = parts[..]
        else {
            return Err(Error::CacheDeserializationFailed(format!(
                "legacy key must have 6 components, found {}",
                parts.len()
            )));
        };
        Ok(Self::new(
            authority,
            resource,
            client_id,
            subject_type.parse()?,
            unique_id,
            displayable_id,
        ))
    }
}

impl Serialize for LegacyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LegacyKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let key = LegacyKey::new(
            "https://Login.Windows.net/Tenant/",
            "R1/Scope1",
            "Client",
            SubjectType::User,
            "Object-Id",
            "User@Contoso.com",
        );
        let text = key.to_string();
        assert_eq!(
            text,
            "https://login.windows.net/tenant/:::r1/scope1:::client:::User:::Object-Id:::user@contoso.com"
        );
        assert_eq!(text.parse::<LegacyKey>().unwrap(), key);
        assert_eq!(key.host().as_deref(), Some("login.windows.net"));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!("a:::b:::c".parse::<LegacyKey>().is_err());
        assert!("a:::b:::c:::Robot:::e:::f".parse::<LegacyKey>().is_err());
    }
}
