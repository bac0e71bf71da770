//! Translation between the unified cache and the legacy cache.

use std::collections::BTreeMap;

use idcache_oauth::ClientInfo;
use tracing::debug;

use super::entry::{LegacyCache, LegacyEntry, LegacyUserInfo};
use super::key::{LegacyKey, SubjectType};
use crate::aliases::EnvironmentAliases;
use crate::entity::{
    AccessTokenEntity, AccountEntity, IdTokenEntity, NULL_PREFERRED_USERNAME, RefreshTokenEntity,
};
use crate::store::CacheContents;

/// Realm used when nothing better is known.
const DEFAULT_REALM: &str = "common";

/// Users known to the legacy cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyUsers {
    /// Users with client info, keyed by home account id.
    pub with_client_info: BTreeMap<String, LegacyUserInfo>,
    /// Users without client info.
    pub without_client_info: Vec<LegacyUserInfo>,
}

fn home_account_id_of(raw_client_info: Option<&str>) -> Option<String> {
    raw_client_info
        .filter(|raw| !raw.is_empty())
        .and_then(|raw| ClientInfo::decode(raw).ok())
        .map(|info| info.home_account_id())
}

/// Recovers raw client info from an account, or from a `uid.utid` home id.
fn client_info_for(home_account_id: &str, account: Option<&AccountEntity>) -> Option<String> {
    if let Some(raw) = account.and_then(|a| a.client_info.clone()) {
        return Some(raw);
    }
    let (uid, utid) = home_account_id.split_once('.')?;
    Some(ClientInfo::new(uid, utid).encode())
}

fn normalized_displayable(id: Option<&str>) -> Option<String> {
    id.filter(|v| !v.is_empty() && *v != NULL_PREFERRED_USERNAME)
        .map(str::to_lowercase)
}

/// Applies `keep` unless it would leave nothing.
fn narrow<'a>(
    candidates: Vec<(&'a LegacyKey, &'a LegacyEntry)>,
    keep: impl Fn(&LegacyKey, &LegacyEntry) -> bool,
) -> Vec<(&'a LegacyKey, &'a LegacyEntry)> {
    let narrowed: Vec<_> = candidates
        .iter()
        .copied()
        .filter(|(k, e)| keep(k, e))
        .collect();
    if narrowed.is_empty() { candidates } else { narrowed }
}

fn in_scope(key: &LegacyKey, environments: &EnvironmentAliases, client_id: &str) -> bool {
    key.client_id.eq_ignore_ascii_case(client_id)
        && key.host().is_some_and(|host| environments.contains(&host))
}

/// Projects the unified cache into legacy entries: one entry per user
/// refresh token, carrying the newest matching access token.
#[must_use]
pub fn to_legacy_entries(contents: &CacheContents) -> LegacyCache {
    let mut legacy = LegacyCache::new();

    for rt in contents.refresh_tokens.values() {
        if rt.home_account_id.is_empty() {
            continue;
        }
        let same_user = |home: &str, env: &str| {
            home.eq_ignore_ascii_case(&rt.home_account_id) && env.eq_ignore_ascii_case(&rt.environment)
        };

        let account = contents
            .accounts
            .values()
            .find(|a| same_user(&a.home_account_id, &a.environment));
        let access_token: Option<&AccessTokenEntity> = contents
            .access_tokens
            .values()
            .filter(|at| {
                at.client_id.eq_ignore_ascii_case(&rt.client_id)
                    && at.user_assertion_hash.is_none()
                    && same_user(at.home_account_id.as_deref().unwrap_or_default(), &at.environment)
            })
            .max_by_key(|at| at.cached_at);
        let id_token: Option<&IdTokenEntity> = contents.id_tokens.values().find(|id| {
            id.client_id.eq_ignore_ascii_case(&rt.client_id)
                && same_user(&id.home_account_id, &id.environment)
        });

        let realm = account
            .map(|a| a.realm.as_str())
            .or_else(|| access_token.map(|at| at.realm.as_str()))
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REALM);
        let resource = access_token.map(|at| at.target.to_target()).unwrap_or_default();
        let unique_id = account
            .and_then(|a| a.local_account_id.clone())
            .or_else(|| rt.home_account_id.split_once('.').map(|(uid, _)| uid.to_string()))
            .unwrap_or_default();
        let displayable_id = account.map(|a| a.username.clone()).unwrap_or_default();

        let key = LegacyKey::new(
            &format!("https://{}/{realm}/", rt.environment),
            &resource,
            &rt.client_id,
            SubjectType::User,
            &unique_id,
            &displayable_id,
        );
        let entry = LegacyEntry {
            access_token: access_token.map(|at| at.secret.clone()),
            access_token_type: access_token.map(|at| at.token_type.clone()),
            expires_on: access_token.map(|at| at.expires_on.timestamp()),
            extended_expires_on: access_token.map(|at| at.extended_expires_on.timestamp()),
            refresh_token: Some(rt.secret.clone()),
            resource_in_response: Some(resource.clone()).filter(|r| !r.is_empty()),
            raw_client_info: client_info_for(&rt.home_account_id, account),
            tenant_id: Some(realm.to_string()),
            id_token: id_token.map(|id| id.secret.clone()),
            user_info: Some(LegacyUserInfo {
                unique_id: Some(unique_id).filter(|u| !u.is_empty()),
                displayable_id: Some(displayable_id).filter(|d| !d.is_empty()),
                given_name: account.and_then(|a| a.given_name.clone()),
                family_name: account.and_then(|a| a.family_name.clone()),
            }),
        };
        legacy.insert(key, entry);
    }

    legacy
}

/// Imports legacy entries as refresh tokens, accounts and id tokens.
///
/// Entries without client info or without a refresh token have no unified
/// representation and are skipped.
#[must_use]
pub fn from_legacy_entries(legacy: &LegacyCache) -> CacheContents {
    let mut contents = CacheContents::new();

    for (key, entry) in legacy.iter() {
        let (Some(raw_client_info), Some(refresh_token), Some(environment)) = (
            entry.raw_client_info.as_deref(),
            entry.refresh_token.as_deref(),
            key.host(),
        ) else {
            debug!(client_id = %key.client_id, "Skipping legacy entry without client info or refresh token");
            continue;
        };
        let Ok(client_info) = ClientInfo::decode(raw_client_info) else {
            debug!(client_id = %key.client_id, "Skipping legacy entry with unreadable client info");
            continue;
        };

        let home_account_id = client_info.home_account_id();
        let realm = entry
            .tenant_id
            .clone()
            .unwrap_or_else(|| client_info.utid.clone());
        let user_info = entry.user_info.clone().unwrap_or_default();
        let username = Some(key.displayable_id.as_str())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .or(user_info.displayable_id)
            .unwrap_or_else(|| NULL_PREFERRED_USERNAME.to_string());

        contents.insert_refresh_token(RefreshTokenEntity::new(
            &home_account_id,
            &environment,
            &key.client_id,
            refresh_token,
        ));

        let mut account = AccountEntity::new(&home_account_id, &environment, &realm, username);
        account.local_account_id = user_info
            .unique_id
            .or_else(|| Some(key.unique_id.clone()).filter(|u| !u.is_empty()));
        account.given_name = user_info.given_name;
        account.family_name = user_info.family_name;
        account.client_info = Some(raw_client_info.to_string());
        contents.insert_account(account);

        if let Some(raw) = entry.id_token.as_deref().filter(|raw| !raw.is_empty()) {
            contents.insert_id_token(IdTokenEntity::new(
                &home_account_id,
                &environment,
                &key.client_id,
                &realm,
                raw,
            ));
        }
    }

    contents
}

/// Searches the legacy cache for a refresh token usable by `client_id`.
///
/// Entries are narrowed by home account id (from their client info), then
/// login hint, then unique id; each narrowing applies only when it leaves at
/// least one entry. An entry filed under the preferred cache host wins over
/// other aliases.
#[must_use]
pub fn find_refresh_token(
    legacy: &LegacyCache,
    environments: &EnvironmentAliases,
    client_id: &str,
    login_hint: Option<&str>,
    unique_id: Option<&str>,
    home_account_id: Option<&str>,
) -> Option<RefreshTokenEntity> {
    let mut candidates: Vec<(&LegacyKey, &LegacyEntry)> = legacy
        .iter()
        .filter(|(key, entry)| in_scope(key, environments, client_id) && entry.refresh_token.is_some())
        .collect();

    if let Some(home) = home_account_id.filter(|h| !h.is_empty()) {
        candidates = narrow(candidates, |_, e| {
            home_account_id_of(e.raw_client_info.as_deref())
                .is_some_and(|found| found.eq_ignore_ascii_case(home))
        });
    }
    if let Some(upn) = login_hint.filter(|u| !u.is_empty()) {
        candidates = narrow(candidates, |k, _| k.displayable_id.eq_ignore_ascii_case(upn));
    }
    if let Some(id) = unique_id.filter(|u| !u.is_empty()) {
        candidates = narrow(candidates, |k, _| k.unique_id.eq_ignore_ascii_case(id));
    }

    let preferred = candidates
        .iter()
        .find(|(k, _)| k.host().is_some_and(|h| environments.is_preferred_cache(&h)))
        .or_else(|| candidates.first())?;

    let (key, entry) = *preferred;
    let environment = key.host()?;
    let refresh_token = entry.refresh_token.as_deref()?;
    debug!(client_id = %key.client_id, environment = %environment, "Found refresh token in legacy cache");
    Some(RefreshTokenEntity::new(
        home_account_id_of(entry.raw_client_info.as_deref()).unwrap_or_default(),
        environment,
        &key.client_id,
        refresh_token,
    ))
}

/// Writes `incoming` into `legacy`, first dropping older entries of the
/// same client, host and user so exactly one refresh token stays current.
pub fn write_refresh_tokens(legacy: &mut LegacyCache, incoming: LegacyCache) {
    for (key, entry) in incoming.iter() {
        let host = key.host();
        let home = home_account_id_of(entry.raw_client_info.as_deref());
        let dropped = legacy.retain(|k, e| {
            !(k.client_id == key.client_id
                && k.host() == host
                && home.is_some()
                && home_account_id_of(e.raw_client_info.as_deref()) == home)
        });
        if dropped > 0 {
            debug!(dropped, client_id = %key.client_id, "Replaced superseded legacy entries");
        }
    }
    legacy.extend(incoming);
}

/// Lists users of `client_id` known to the legacy cache under `environments`.
#[must_use]
pub fn legacy_users(
    legacy: &LegacyCache,
    environments: &EnvironmentAliases,
    client_id: &str,
) -> LegacyUsers {
    let mut users = LegacyUsers::default();
    for (key, entry) in legacy.iter().filter(|(k, _)| in_scope(k, environments, client_id)) {
        let mut info = entry.user_info.clone().unwrap_or_default();
        if info.displayable_id.is_none() && !key.displayable_id.is_empty() {
            info.displayable_id = Some(key.displayable_id.clone());
        }
        match home_account_id_of(entry.raw_client_info.as_deref()) {
            Some(home_account_id) => {
                users.with_client_info.insert(home_account_id, info);
            }
            None => users.without_client_info.push(info),
        }
    }
    users
}

/// Removes a user's entries. Returns how many were removed.
///
/// An entry matches when its host is in `environments`, its displayable id
/// matches (a missing id and the placeholder username are equivalent), and
/// its client info yields `home_account_id`. With no home account id only
/// entries without client info match.
pub fn remove_user(
    legacy: &mut LegacyCache,
    displayable_id: Option<&str>,
    environments: &EnvironmentAliases,
    home_account_id: Option<&str>,
) -> usize {
    let wanted_displayable = normalized_displayable(displayable_id);
    legacy.retain(|key, entry| {
        let host_matches = key.host().is_some_and(|h| environments.contains(&h));
        let displayable_matches =
            normalized_displayable(Some(key.displayable_id.as_str())) == wanted_displayable;
        let entry_home = home_account_id_of(entry.raw_client_info.as_deref());
        let identity_matches = match (home_account_id, entry_home.as_deref()) {
            (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
            (None, None) => true,
            _ => false,
        };
        !(host_matches && displayable_matches && identity_matches)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use crate::entity::ScopeSet;
    use chrono::{Duration, TimeZone, Utc};

    fn aliases() -> EnvironmentAliases {
        EnvironmentAliases {
            preferred_network: "login.microsoftonline.com".into(),
            preferred_cache: "login.windows.net".into(),
            aliases: vec!["login.microsoftonline.com".into(), "login.windows.net".into()],
        }
    }

    fn client_info(uid: &str) -> String {
        ClientInfo::new(uid, "utid").encode()
    }

    fn entry(uid: &str, rt: &str) -> LegacyEntry {
        LegacyEntry {
            refresh_token: Some(rt.into()),
            raw_client_info: Some(client_info(uid)),
            user_info: Some(LegacyUserInfo {
                unique_id: Some(format!("{uid}-oid")),
                displayable_id: Some(format!("{uid}@contoso.com")),
                ..LegacyUserInfo::default()
            }),
            ..LegacyEntry::default()
        }
    }

    fn key(host: &str, uid: &str) -> LegacyKey {
        LegacyKey::new(
            &format!("https://{host}/tenant/"),
            "resource",
            "client",
            SubjectType::User,
            &format!("{uid}-oid"),
            &format!("{uid}@contoso.com"),
        )
    }

    fn unified() -> CacheContents {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut contents = CacheContents::new();
        contents.insert_access_token(
            AccessTokenEntity::new(
                "login.windows.net",
                "client",
                "tenant",
                ScopeSet::parse("r1/scope1"),
                "at",
                now,
                now + Duration::hours(1),
                now + Duration::hours(1),
            )
            .with_home_account_id("uid.utid"),
        );
        contents.insert_refresh_token(RefreshTokenEntity::new(
            "uid.utid",
            "login.windows.net",
            "client",
            "rt",
        ));
        let mut account = AccountEntity::new("uid.utid", "login.windows.net", "tenant", "user@contoso.com");
        account.local_account_id = Some("oid".into());
        contents.insert_account(account);
        contents
    }

    #[test]
    fn test_to_legacy_entries() {
        let legacy = to_legacy_entries(&unified());
        assert_eq!(legacy.len(), 1);
        let (key, entry) = legacy.iter().next().unwrap();
        assert_eq!(key.authority, "https://login.windows.net/tenant/");
        assert_eq!(key.resource, "r1/scope1");
        assert_eq!(key.unique_id, "oid");
        assert_eq!(key.displayable_id, "user@contoso.com");
        assert_eq!(entry.refresh_token.as_deref(), Some("rt"));
        assert_eq!(entry.access_token.as_deref(), Some("at"));
        let info = ClientInfo::decode(entry.raw_client_info.as_deref().unwrap()).unwrap();
        assert_eq!(info.home_account_id(), "uid.utid");
    }

    #[test]
    fn test_from_legacy_entries() {
        let mut legacy = LegacyCache::new();
        legacy.insert(key("login.windows.net", "uid"), entry("uid", "rt"));
        legacy.insert(
            key("login.windows.net", "nope"),
            LegacyEntry {
                raw_client_info: None,
                ..entry("nope", "rt2")
            },
        );

        let contents = from_legacy_entries(&legacy);
        assert_eq!(contents.refresh_tokens.len(), 1);
        assert_eq!(contents.accounts.len(), 1);
        let rt = contents.refresh_tokens.values().next().unwrap();
        assert_eq!(rt.home_account_id, "uid.utid");
        assert_eq!(rt.environment, "login.windows.net");
        let account = contents.accounts.values().next().unwrap();
        assert_eq!(account.username, "uid@contoso.com");
        assert_eq!(account.local_account_id.as_deref(), Some("uid-oid"));
    }

    #[test]
    fn test_unified_round_trip_through_legacy() {
        let original = unified();
        let imported = from_legacy_entries(&to_legacy_entries(&original));
        assert_eq!(
            imported.refresh_tokens.keys().collect::<Vec<_>>(),
            original.refresh_tokens.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_find_refresh_token_narrowing() {
        let mut legacy = LegacyCache::new();
        legacy.insert(key("login.microsoftonline.com", "a"), entry("a", "rt-a-network"));
        legacy.insert(key("login.windows.net", "a"), entry("a", "rt-a-cache"));
        legacy.insert(key("login.windows.net", "b"), entry("b", "rt-b"));
        legacy.insert(key("login.chinacloudapi.cn", "c"), entry("c", "rt-c"));

        let envs = aliases();
        let found = find_refresh_token(&legacy, &envs, "client", None, None, Some("a.utid")).unwrap();
        assert_eq!(found.secret, "rt-a-cache");
        assert_eq!(found.home_account_id, "a.utid");

        let found = find_refresh_token(&legacy, &envs, "client", Some("B@contoso.com"), None, None).unwrap();
        assert_eq!(found.secret, "rt-b");

        // A narrowing that matches nothing is ignored.
        let found = find_refresh_token(&legacy, &envs, "client", Some("ghost@contoso.com"), Some("b-oid"), None).unwrap();
        assert_eq!(found.secret, "rt-b");

        assert!(find_refresh_token(&legacy, &envs, "other-client", None, None, None).is_none());
        let china = EnvironmentAliases::identity("login.chinacloudapi.cn");
        assert_eq!(
            find_refresh_token(&legacy, &china, "client", None, None, None).unwrap().secret,
            "rt-c"
        );
    }

    #[test]
    fn test_legacy_users() {
        let mut legacy = LegacyCache::new();
        legacy.insert(key("login.windows.net", "a"), entry("a", "rt"));
        legacy.insert(
            key("login.windows.net", "b"),
            LegacyEntry {
                raw_client_info: None,
                ..entry("b", "rt")
            },
        );
        let users = legacy_users(&legacy, &aliases(), "client");
        assert_eq!(users.with_client_info.len(), 1);
        assert!(users.with_client_info.contains_key("a.utid"));
        assert_eq!(users.without_client_info.len(), 1);
        assert_eq!(
            users.without_client_info[0].displayable_id.as_deref(),
            Some("b@contoso.com")
        );
    }

    #[test]
    fn test_remove_user() {
        let mut legacy = LegacyCache::new();
        legacy.insert(key("login.windows.net", "a"), entry("a", "rt"));
        legacy.insert(key("login.microsoftonline.com", "a"), entry("a", "rt"));
        legacy.insert(key("login.windows.net", "b"), entry("b", "rt"));
        legacy.insert(key("login.chinacloudapi.cn", "a"), entry("a", "rt"));

        let removed = remove_user(&mut legacy, Some("A@contoso.com"), &aliases(), Some("a.utid"));
        assert_eq!(removed, 2);
        assert_eq!(legacy.len(), 2);
    }

    #[test]
    fn test_write_refresh_tokens_supersedes_same_user() {
        let mut legacy = LegacyCache::new();
        legacy.insert(key("login.windows.net", "a"), entry("a", "old"));
        legacy.insert(key("login.windows.net", "b"), entry("b", "other-user"));

        let mut newer = key("login.windows.net", "a");
        newer.resource = "another-resource".into();
        let mut incoming = LegacyCache::new();
        incoming.insert(newer.clone(), entry("a", "new"));

        write_refresh_tokens(&mut legacy, incoming);
        assert_eq!(legacy.len(), 2);
        assert_eq!(legacy.get(&newer).unwrap().refresh_token.as_deref(), Some("new"));
        assert!(legacy.get(&key("login.windows.net", "a")).is_none());
    }
}
