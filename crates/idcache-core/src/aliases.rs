//! Environment alias resolution.
//!
//! Cloud instances answer under several host names. The resolver maps any
//! of them to the same [`EnvironmentAliases`], so tokens written under one
//! name are found under the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use idcache_oauth::{Authority, AuthorityType, InstanceDiscovery, InstanceDiscoveryMetadataEntry};
use tracing::{debug, warn};

use crate::{Error, Result};

/// The equivalence class of a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentAliases {
    /// Host to send network traffic to.
    pub preferred_network: String,
    /// Host every cache write is filed under.
    pub preferred_cache: String,
    /// All equivalent hosts, lower-cased.
    pub aliases: Vec<String>,
}

impl EnvironmentAliases {
    /// A class containing only `host`.
    #[must_use]
    pub fn identity(host: &str) -> Self {
        let host = host.to_ascii_lowercase();
        Self {
            preferred_network: host.clone(),
            preferred_cache: host.clone(),
            aliases: vec![host],
        }
    }

    /// Returns true if `host` is in the class (case-insensitive).
    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.preferred_cache.eq_ignore_ascii_case(host)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(host))
    }

    /// Returns true if `host` is the preferred cache host.
    #[must_use]
    pub fn is_preferred_cache(&self, host: &str) -> bool {
        self.preferred_cache.eq_ignore_ascii_case(host)
    }
}

impl From<&InstanceDiscoveryMetadataEntry> for EnvironmentAliases {
    fn from(entry: &InstanceDiscoveryMetadataEntry) -> Self {
        let mut aliases: Vec<String> = entry
            .aliases
            .iter()
            .map(|a| a.to_ascii_lowercase())
            .collect();
        for preferred in [&entry.preferred_cache, &entry.preferred_network] {
            let preferred = preferred.to_ascii_lowercase();
            if !aliases.contains(&preferred) {
                aliases.push(preferred);
            }
        }
        Self {
            preferred_network: entry.preferred_network.to_ascii_lowercase(),
            preferred_cache: entry.preferred_cache.to_ascii_lowercase(),
            aliases,
        }
    }
}

/// Resolves hosts to alias classes, memoizing discovery results.
///
/// Constructed explicitly and shared by reference; there is no global
/// instance. `clear` forgets everything learned so far, `dispose` makes
/// further resolution fail.
pub struct AliasResolver {
    discovery: Option<Arc<dyn InstanceDiscovery>>,
    known: RwLock<HashMap<String, EnvironmentAliases>>,
    disposed: AtomicBool,
}

impl AliasResolver {
    /// Creates a resolver backed by `discovery`.
    ///
    /// Without a discovery client every host is its own only alias unless
    /// seeded through [`add_known`](Self::add_known).
    #[must_use]
    pub fn new(discovery: Option<Arc<dyn InstanceDiscovery>>) -> Self {
        Self {
            discovery,
            known: RwLock::new(HashMap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Creates a resolver that never goes to the network.
    #[must_use]
    pub fn offline() -> Self {
        Self::new(None)
    }

    /// Resolves the alias class of `authority`'s host.
    ///
    /// B2C and AD FS authorities are not covered by instance discovery and
    /// resolve to themselves without being memoized. When discovery fails, the error is returned
    /// only if `validate_authority` is set; otherwise the host is used as-is
    /// and nothing is memoized.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolverDisposed`] after [`dispose`](Self::dispose), or
    /// [`Error::InstanceDiscovery`] when validation was requested and discovery failed.
    pub async fn resolve(
        &self,
        authority: &Authority,
        validate_authority: bool,
    ) -> Result<EnvironmentAliases> {
        self.ensure_live()?;
        let host = authority.host();

        // Classes learned here only describe AAD hosts.
        if !matches!(authority.authority_type(), AuthorityType::Aad) {
            return Ok(EnvironmentAliases::identity(host));
        }

        if let Some(hit) = self.cached(host) {
            return Ok(hit);
        }

        let Some(discovery) = &self.discovery else {
            return Ok(self.remember_identity(host));
        };

        match discovery.discover(authority).await {
            Ok(response) => {
                debug!(host, groups = response.metadata.len(), "Learned environment aliases");
                self.ensure_live()?;
                for entry in &response.metadata {
                    self.add_known(entry);
                }
                Ok(self
                    .cached(host)
                    .unwrap_or_else(|| self.remember_identity(host)))
            }
            Err(e) if validate_authority => Err(Error::InstanceDiscovery(e)),
            Err(e) => {
                warn!(host, error = %e, "Instance discovery failed; using authority host as-is");
                Ok(EnvironmentAliases::identity(host))
            }
        }
    }

    /// Seeds the resolver with a known alias group. Every host in the
    /// group maps to it.
    pub fn add_known(&self, entry: &InstanceDiscoveryMetadataEntry) {
        let aliases = EnvironmentAliases::from(entry);
        let mut known = self.known.write().unwrap_or_else(PoisonError::into_inner);
        for host in &aliases.aliases {
            known.insert(host.clone(), aliases.clone());
        }
    }

    /// Returns the memoized class of `host`, if any.
    #[must_use]
    pub fn cached(&self, host: &str) -> Option<EnvironmentAliases> {
        self.known
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host.to_ascii_lowercase())
            .cloned()
    }

    /// Number of hosts currently memoized.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets all memoized classes.
    pub fn clear(&self) {
        self.known
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("Cleared environment alias cache");
    }

    /// Clears the resolver and rejects further resolution.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.clear();
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(Error::ResolverDisposed);
        }
        Ok(())
    }

    fn remember_identity(&self, host: &str) -> EnvironmentAliases {
        let aliases = EnvironmentAliases::identity(host);
        self.known
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(aliases.preferred_cache.clone(), aliases.clone());
        aliases
    }
}

impl std::fmt::Debug for AliasResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasResolver")
            .field("has_discovery", &self.discovery.is_some())
            .field("known_hosts", &self.len())
            .field("disposed", &self.disposed.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use idcache_oauth::InstanceDiscoveryResponse;

    struct CountingDiscovery {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingDiscovery {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl InstanceDiscovery for CountingDiscovery {
        async fn discover(&self, _authority: &Authority) -> idcache_oauth::Result<InstanceDiscoveryResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(idcache_oauth::Error::oauth_error("invalid_instance", "unknown host"));
            }
            Ok(InstanceDiscoveryResponse {
                tenant_discovery_endpoint: None,
                metadata: vec![InstanceDiscoveryMetadataEntry::new(
                    "login.microsoftonline.com",
                    "login.windows.net",
                    ["login.microsoftonline.com", "login.windows.net", "sts.windows.net"],
                )],
            })
        }
    }

    fn authority(url: &str) -> Authority {
        Authority::new(url).unwrap()
    }

    #[tokio::test]
    async fn test_resolves_and_memoizes_whole_group() {
        let discovery = CountingDiscovery::new(false);
        let resolver = AliasResolver::new(Some(discovery.clone()));

        let first = resolver
            .resolve(&authority("https://login.microsoftonline.com/tenant"), true)
            .await
            .unwrap();
        assert_eq!(first.preferred_cache, "login.windows.net");
        assert!(first.contains("STS.windows.net"));

        let second = resolver
            .resolve(&authority("https://sts.windows.net/tenant"), true)
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unlisted_host_resolves_to_itself() {
        let discovery = CountingDiscovery::new(false);
        let resolver = AliasResolver::new(Some(discovery.clone()));
        let aliases = resolver
            .resolve(&authority("https://login.example.com/tenant"), false)
            .await
            .unwrap();
        assert_eq!(aliases, EnvironmentAliases::identity("login.example.com"));

        resolver
            .resolve(&authority("https://login.example.com/other"), false)
            .await
            .unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_b2c_skips_discovery() {
        let discovery = CountingDiscovery::new(false);
        let resolver = AliasResolver::new(Some(discovery.clone()));
        let aliases = resolver
            .resolve(&authority("https://login.microsoftonline.com/tfp/tenant/policy"), true)
            .await
            .unwrap();
        assert_eq!(aliases.preferred_cache, "login.microsoftonline.com");
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_b2c_does_not_shadow_aad_aliases() {
        let discovery = CountingDiscovery::new(false);
        let resolver = AliasResolver::new(Some(discovery.clone()));

        resolver
            .resolve(&authority("https://login.microsoftonline.com/tfp/tenant/b2c_1_x"), true)
            .await
            .unwrap();
        assert!(resolver.is_empty());

        let aad = resolver
            .resolve(&authority("https://login.microsoftonline.com/tenant"), true)
            .await
            .unwrap();
        assert_eq!(aad.preferred_cache, "login.windows.net");
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 1);

        let b2c = resolver
            .resolve(&authority("https://login.microsoftonline.com/tfp/tenant/b2c_1_x"), true)
            .await
            .unwrap();
        assert_eq!(b2c, EnvironmentAliases::identity("login.microsoftonline.com"));
    }

    #[tokio::test]
    async fn test_discovery_failure_depends_on_validation() {
        let resolver = AliasResolver::new(Some(CountingDiscovery::new(true)));
        let target = authority("https://login.microsoftonline.com/tenant");

        let err = resolver.resolve(&target, true).await.unwrap_err();
        assert!(matches!(err, Error::InstanceDiscovery(_)));

        let fallback = resolver.resolve(&target, false).await.unwrap();
        assert_eq!(fallback.preferred_cache, "login.microsoftonline.com");
        assert!(resolver.is_empty());
    }

    #[tokio::test]
    async fn test_clear_and_dispose() {
        let discovery = CountingDiscovery::new(false);
        let resolver = AliasResolver::new(Some(discovery.clone()));
        let target = authority("https://login.windows.net/tenant");

        resolver.resolve(&target, true).await.unwrap();
        resolver.clear();
        assert!(resolver.is_empty());
        resolver.resolve(&target, true).await.unwrap();
        assert_eq!(discovery.calls.load(Ordering::SeqCst), 2);

        resolver.dispose();
        assert!(matches!(
            resolver.resolve(&target, true).await,
            Err(Error::ResolverDisposed)
        ));
    }

    #[test]
    fn test_add_known_includes_preferred_hosts() {
        let resolver = AliasResolver::offline();
        resolver.add_known(&InstanceDiscoveryMetadataEntry::new(
            "net.example",
            "cache.example",
            ["alias.example"],
        ));
        let hit = resolver.cached("NET.example").unwrap();
        assert_eq!(hit.preferred_cache, "cache.example");
        assert!(resolver.cached("cache.example").is_some());
        assert!(resolver.cached("alias.example").is_some());
    }
}
