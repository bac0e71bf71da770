//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use idcache_core::legacy::{self, LegacyCachePersistence};
use idcache_core::{
    AliasResolver, Authority, CacheContents, FileCachePersistence, FileLegacyPersistence,
    TokenCache,
};
use idcache_oauth::HttpInstanceDiscovery;
use serde_json::json;
use tracing::info;

/// Cache files a command operates on.
#[derive(Debug, Clone)]
pub struct CachePaths {
    pub cache: PathBuf,
    pub legacy: PathBuf,
}

/// Builds the alias resolver, backed by instance discovery unless `offline`.
pub fn resolver(offline: bool) -> Result<Arc<AliasResolver>> {
    if offline {
        return Ok(Arc::new(AliasResolver::offline()));
    }
    let discovery = HttpInstanceDiscovery::new().context("Failed to create discovery client")?;
    Ok(Arc::new(AliasResolver::new(Some(Arc::new(discovery)))))
}

/// Opens a cache that loads and saves both files around every operation.
fn open_cache(paths: &CachePaths, resolver: Arc<AliasResolver>) -> TokenCache {
    TokenCache::new(resolver)
        .with_hooks(Arc::new(FileCachePersistence::new(&paths.cache)))
        .with_legacy_persistence(Arc::new(FileLegacyPersistence::new(&paths.legacy)))
}

async fn load_contents(path: &Path) -> Result<CacheContents> {
    if !path.exists() {
        return Ok(CacheContents::new());
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(CacheContents::from_json(&bytes)
        .with_context(|| format!("Invalid cache file {}", path.display()))?
        .unwrap_or_default())
}

fn describe_expiry(expires_on: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = expires_on - now;
    if remaining.num_seconds() <= 0 {
        "expired".to_string()
    } else if remaining.num_hours() > 0 {
        format!("expires in {}h{}m", remaining.num_hours(), remaining.num_minutes() % 60)
    } else {
        format!("expires in {}m", remaining.num_minutes())
    }
}

/// Prints a summary of the unified cache. Secrets are never printed.
pub async fn inspect(paths: &CachePaths, as_json: bool) -> Result<()> {
    let contents = load_contents(&paths.cache).await?;
    let now = Utc::now();

    if as_json {
        let summary = json!({
            "path": paths.cache.display().to_string(),
            "access_tokens": contents.access_tokens.values().map(|at| json!({
                "key": at.key(),
                "environment": at.environment,
                "realm": at.realm,
                "scopes": at.target.to_target(),
                "expires_on": at.expires_on.timestamp(),
                "extended_expires_on": at.extended_expires_on.timestamp(),
                "expired": at.expires_on <= now,
            })).collect::<Vec<_>>(),
            "refresh_tokens": contents.refresh_tokens.keys().collect::<Vec<_>>(),
            "id_tokens": contents.id_tokens.keys().collect::<Vec<_>>(),
            "accounts": contents.accounts.values().map(|a| json!({
                "home_account_id": a.home_account_id,
                "environment": a.environment,
                "realm": a.realm,
                "username": a.username,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Cache: {}", paths.cache.display());
    println!("Access tokens ({}):", contents.access_tokens.len());
    for at in contents.access_tokens.values() {
        println!("  {} [{}]", at.key(), describe_expiry(at.expires_on, now));
    }
    println!("Refresh tokens ({}):", contents.refresh_tokens.len());
    for key in contents.refresh_tokens.keys() {
        println!("  {key}");
    }
    println!("Id tokens ({}):", contents.id_tokens.len());
    for key in contents.id_tokens.keys() {
        println!("  {key}");
    }
    println!("Accounts ({}):", contents.accounts.len());
    for account in contents.accounts.values() {
        println!(
            "  {} {} ({}/{})",
            account.home_account_id, account.username, account.environment, account.realm
        );
    }
    Ok(())
}

/// Lists accounts for `client_id` under `authority`.
pub async fn accounts(
    paths: &CachePaths,
    resolver: Arc<AliasResolver>,
    client_id: &str,
    authority: &str,
    as_json: bool,
) -> Result<()> {
    let authority = Authority::new(authority).context("Invalid authority")?;
    let cache = open_cache(paths, resolver);
    let accounts = cache.get_accounts(client_id, &authority).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
    } else if accounts.is_empty() {
        println!("No accounts for client {client_id}");
    } else {
        for account in &accounts {
            println!(
                "{} {} ({})",
                account.home_account_id.as_deref().unwrap_or("-"),
                account.username,
                account.environment
            );
        }
    }
    Ok(())
}

/// Mirrors user refresh tokens of the unified cache into the legacy cache.
pub async fn export_legacy(paths: &CachePaths) -> Result<usize> {
    let contents = load_contents(&paths.cache).await?;
    let entries = legacy::to_legacy_entries(&contents);
    let exported = entries.len();

    let persistence = FileLegacyPersistence::new(&paths.legacy);
    let mut document = persistence
        .load_cache()
        .with_context(|| format!("Failed to read {}", paths.legacy.display()))?;
    legacy::write_refresh_tokens(&mut document, entries);
    persistence.write_cache(&document)?;

    info!(exported, path = %paths.legacy.display(), "Exported legacy cache entries");
    Ok(exported)
}

/// Imports legacy users into the unified cache file.
pub async fn import_legacy(paths: &CachePaths) -> Result<usize> {
    let cache = TokenCache::new(Arc::new(AliasResolver::offline()))
        .with_legacy_persistence(Arc::new(FileLegacyPersistence::new(&paths.legacy)));
    if paths.cache.exists() {
        let bytes = tokio::fs::read(&paths.cache).await?;
        cache
            .deserialize(&bytes)
            .with_context(|| format!("Invalid cache file {}", paths.cache.display()))?;
    }
    cache.reset_state_changed();

    let imported = cache
        .import_legacy()
        .with_context(|| format!("Failed to import {}", paths.legacy.display()))?;
    if cache.has_state_changed() {
        if let Some(parent) = paths.cache.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&paths.cache, cache.serialize()?).await?;
    }
    Ok(imported)
}

/// Empties both cache files.
pub fn clear(paths: &CachePaths) {
    let cache = open_cache(paths, Arc::new(AliasResolver::offline()));
    cache.clear();
}

/// Prints the alias set of `authority`.
pub async fn aliases(resolver: Arc<AliasResolver>, authority: &str, as_json: bool) -> Result<()> {
    let authority = Authority::new(authority).context("Invalid authority")?;
    let aliases = resolver.resolve(&authority, true).await?;

    if as_json {
        let value = json!({
            "preferred_network": aliases.preferred_network,
            "preferred_cache": aliases.preferred_cache,
            "aliases": aliases.aliases,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Preferred network: {}", aliases.preferred_network);
        println!("Preferred cache:   {}", aliases.preferred_cache);
        println!("Aliases:           {}", aliases.aliases.join(", "));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use idcache_core::{ClientInfo, IdToken, ScopeSet, TokenRequest, TokenResponse};

    fn paths(dir: &Path) -> CachePaths {
        CachePaths {
            cache: dir.join("cache.json"),
            legacy: dir.join("legacy.json"),
        }
    }

    async fn seed(paths: &CachePaths) {
        let cache = open_cache(paths, Arc::new(AliasResolver::offline()))
            .with_options(idcache_core::CacheOptions::default().with_mirror_legacy(false));
        let request = TokenRequest::new(
            "client",
            Authority::new("https://login.windows.net/tenant/").unwrap(),
            ScopeSet::parse("user.read"),
        );
        let claims = IdToken {
            oid: Some("oid".into()),
            preferred_username: Some("user@contoso.com".into()),
            ..IdToken::default()
        };
        let response = TokenResponse::new("at")
            .with_expires_in(3600)
            .with_scope("user.read")
            .with_refresh_token("rt")
            .with_id_token(claims.to_unsigned_jwt())
            .with_client_info(ClientInfo::new("uid", "utid").encode());
        cache.save_token_response(&request, &response).await.unwrap();
    }

    #[test]
    fn test_describe_expiry() {
        let now = Utc::now();
        assert_eq!(describe_expiry(now, now), "expired");
        assert_eq!(describe_expiry(now + Duration::minutes(5), now), "expires in 5m");
        assert_eq!(describe_expiry(now + Duration::minutes(90), now), "expires in 1h30m");
    }

    #[tokio::test]
    async fn test_export_then_import() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        seed(&paths).await;
        assert!(!paths.legacy.exists());

        assert_eq!(export_legacy(&paths).await.unwrap(), 1);
        assert_eq!(FileLegacyPersistence::new(&paths.legacy).load_cache().unwrap().len(), 1);

        tokio::fs::remove_file(&paths.cache).await.unwrap();
        assert_eq!(import_legacy(&paths).await.unwrap(), 3);
        let contents = load_contents(&paths.cache).await.unwrap();
        assert_eq!(contents.refresh_tokens.len(), 1);
        assert_eq!(contents.accounts.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(dir.path());
        seed(&paths).await;
        export_legacy(&paths).await.unwrap();

        clear(&paths);

        assert!(load_contents(&paths.cache).await.unwrap().is_empty());
        assert!(FileLegacyPersistence::new(&paths.legacy).load_cache().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_aliases() {
        let resolver = resolver(true).unwrap();
        aliases(Arc::clone(&resolver), "https://login.contoso.example/tenant/", true)
            .await
            .unwrap();
        assert!(resolver.cached("login.contoso.example").is_some());
    }
}
