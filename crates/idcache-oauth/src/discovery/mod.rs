//! Instance discovery: which hosts are aliases of one another.

mod http;

pub use http::{DiscoveryConfig, HttpInstanceDiscovery};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::authority::Authority;
use crate::error::Result;

/// One group of equivalent hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDiscoveryMetadataEntry {
    /// Host to send network requests to.
    pub preferred_network: String,
    /// Host to file cache entries under.
    pub preferred_cache: String,
    /// All hosts in the group, including the two preferred ones.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl InstanceDiscoveryMetadataEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        preferred_network: impl Into<String>,
        preferred_cache: impl Into<String>,
        aliases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            preferred_network: preferred_network.into(),
            preferred_cache: preferred_cache.into(),
            aliases: aliases.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `host` belongs to this group (case-insensitive).
    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.aliases.iter().any(|a| a.eq_ignore_ascii_case(host))
            || self.preferred_cache.eq_ignore_ascii_case(host)
            || self.preferred_network.eq_ignore_ascii_case(host)
    }
}

/// Body of the instance discovery endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceDiscoveryResponse {
    /// OpenID configuration URL for the probed authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_discovery_endpoint: Option<String>,
    /// Alias groups known to the service.
    #[serde(default)]
    pub metadata: Vec<InstanceDiscoveryMetadataEntry>,
}

impl InstanceDiscoveryResponse {
    /// Finds the group containing `host`.
    #[must_use]
    pub fn entry_for(&self, host: &str) -> Option<&InstanceDiscoveryMetadataEntry> {
        self.metadata.iter().find(|e| e.contains(host))
    }
}

/// Source of instance discovery metadata.
#[async_trait]
pub trait InstanceDiscovery: Send + Sync {
    /// Queries alias metadata for `authority`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or rejects the authority.
    async fn discover(&self, authority: &Authority) -> Result<InstanceDiscoveryResponse>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "tenant_discovery_endpoint": "https://login.microsoftonline.com/tenant/v2.0/.well-known/openid-configuration",
        "metadata": [
            {
                "preferred_network": "login.microsoftonline.com",
                "preferred_cache": "login.windows.net",
                "aliases": ["login.microsoftonline.com", "login.windows.net", "sts.microsoft.com"]
            },
            {
                "preferred_network": "login.partner.microsoftonline.cn",
                "preferred_cache": "login.partner.microsoftonline.cn",
                "aliases": ["login.partner.microsoftonline.cn", "login.chinacloudapi.cn"]
            }
        ]
    }"#;

    #[test]
    fn test_parse_discovery_response() {
        let response: InstanceDiscoveryResponse = serde_json::from_str(BODY).unwrap();
        assert_eq!(response.metadata.len(), 2);

        let entry = response.entry_for("STS.microsoft.com").unwrap();
        assert_eq!(entry.preferred_cache, "login.windows.net");
        assert_eq!(entry.preferred_network, "login.microsoftonline.com");

        let china = response.entry_for("login.chinacloudapi.cn").unwrap();
        assert_eq!(china.preferred_cache, "login.partner.microsoftonline.cn");

        assert!(response.entry_for("example.com").is_none());
    }

    #[test]
    fn test_entry_contains_preferred_hosts() {
        let entry = InstanceDiscoveryMetadataEntry::new("net.example", "cache.example", ["alias.example"]);
        assert!(entry.contains("NET.example"));
        assert!(entry.contains("cache.example"));
        assert!(entry.contains("alias.example"));
        assert!(!entry.contains("other.example"));
    }
}
