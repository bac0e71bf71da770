//! Instance discovery over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{InstanceDiscovery, InstanceDiscoveryResponse};
use crate::authority::Authority;
use crate::error::{Error, Result};
use crate::token::ErrorResponse;

/// Configuration for [`HttpInstanceDiscovery`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Host that serves the discovery endpoint.
    pub trusted_host: String,
    /// `api-version` query parameter.
    pub api_version: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            trusted_host: "login.microsoftonline.com".to_string(),
            api_version: "1.1".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Queries `https://<trusted_host>/common/discovery/instance`.
#[derive(Debug, Clone)]
pub struct HttpInstanceDiscovery {
    config: DiscoveryConfig,
    http_client: Client,
}

impl HttpInstanceDiscovery {
    /// Creates a client with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(DiscoveryConfig::default())
    }

    /// Creates a client with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client cannot be built.
    pub fn with_config(config: DiscoveryConfig) -> Result<Self> {
        if config.trusted_host.is_empty() {
            return Err(Error::InvalidConfig("trusted_host is empty".into()));
        }
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Discovery URL probing `authority`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured host does not form a valid URL.
    pub fn discovery_url(&self, authority: &Authority) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "https://{}/common/discovery/instance",
            self.config.trusted_host
        ))?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version)
            .append_pair("authorization_endpoint", &authority.authorize_endpoint());
        Ok(url)
    }
}

#[async_trait]
impl InstanceDiscovery for HttpInstanceDiscovery {
    async fn discover(&self, authority: &Authority) -> Result<InstanceDiscoveryResponse> {
        let url = self.discovery_url(authority)?;
        debug!(host = authority.host(), "Querying instance discovery");

        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }

        let body: InstanceDiscoveryResponse = response.json().await?;
        debug!(groups = body.metadata.len(), "Instance discovery succeeded");
        Ok(body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_url() {
        let discovery = HttpInstanceDiscovery::new().unwrap();
        let authority = Authority::new("https://login.windows.net/tenant").unwrap();
        let url = discovery.discovery_url(&authority).unwrap();
        assert_eq!(url.host_str(), Some("login.microsoftonline.com"));
        assert_eq!(url.path(), "/common/discovery/instance");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("api-version".into(), "1.1".into())));
        assert!(pairs.contains(&(
            "authorization_endpoint".into(),
            "https://login.windows.net/tenant/oauth2/v2.0/authorize".into()
        )));
    }

    #[test]
    fn test_rejects_empty_host() {
        let config = DiscoveryConfig {
            trusted_host: String::new(),
            ..DiscoveryConfig::default()
        };
        assert!(matches!(
            HttpInstanceDiscovery::with_config(config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
