//! Access and refresh token selection.
//!
//! Pure functions over entity snapshots. The caller supplies the clock, the
//! resolved alias class and the subject, so every rule here is testable
//! without a store or a network.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::aliases::EnvironmentAliases;
use crate::entity::{AccessTokenEntity, RefreshTokenEntity, ScopeSet};

/// Who a token is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject<'a> {
    /// App-only token from a client credential grant.
    App,
    /// On-behalf-of token for the user assertion with this hash.
    OnBehalfOf {
        /// `user_assertion_hash` the candidate must carry.
        assertion_hash: &'a str,
    },
    /// Token for a signed-in user.
    User {
        /// Home account id the candidate must carry.
        home_account_id: &'a str,
    },
}

/// Criteria for an access token lookup.
#[derive(Debug, Clone)]
pub struct AccessTokenQuery<'a> {
    /// Client the token must belong to (case-insensitive).
    pub client_id: &'a str,
    /// Alias class of the request authority.
    pub environments: &'a EnvironmentAliases,
    /// Requested scopes.
    pub scopes: &'a ScopeSet,
    /// Tenant the token must come from; `None` accepts any.
    pub realm: Option<&'a str>,
    /// Owner of the token.
    pub subject: Subject<'a>,
    /// Tokens expiring within this window count as expired.
    pub expiration_buffer: Duration,
    /// Whether tokens inside their extended lifetime may be served.
    pub extended_lifetime_enabled: bool,
}

/// An access token returned from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAccessToken {
    /// The stored entity.
    pub entity: AccessTokenEntity,
    /// True if the token is past `expires_on` and served only because its
    /// extended lifetime is still open.
    pub is_extended_lifetime: bool,
}

impl CachedAccessToken {
    /// The access token value.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.entity.secret
    }
}

fn subject_matches(entity: &AccessTokenEntity, subject: Subject<'_>) -> bool {
    match subject {
        Subject::App => entity.home_account_id.is_none() && entity.user_assertion_hash.is_none(),
        Subject::OnBehalfOf { assertion_hash } => {
            entity.user_assertion_hash.as_deref() == Some(assertion_hash)
        }
        Subject::User { home_account_id } => {
            entity.user_assertion_hash.is_none()
                && entity
                    .home_account_id
                    .as_deref()
                    .is_some_and(|id| id.eq_ignore_ascii_case(home_account_id))
        }
    }
}

/// Picks the best usable access token for `query`.
///
/// Candidates must match client, alias class, realm and subject, and hold a
/// superset of the requested scopes. Among those the smallest scope set
/// wins, then the one filed under the preferred cache host, then the lowest
/// key. The winner is discarded if it expires within the buffer, unless
/// extended lifetime is enabled and that window is still open.
#[must_use]
pub fn find_access_token<'e>(
    candidates: impl IntoIterator<Item = &'e AccessTokenEntity>,
    query: &AccessTokenQuery<'_>,
    now: DateTime<Utc>,
) -> Option<CachedAccessToken> {
    let mut matches: Vec<(String, &AccessTokenEntity)> = candidates
        .into_iter()
        .filter(|at| at.client_id.eq_ignore_ascii_case(query.client_id))
        .filter(|at| query.environments.contains(&at.environment))
        .filter(|at| query.realm.is_none_or(|realm| at.realm.eq_ignore_ascii_case(realm)))
        .filter(|at| subject_matches(at, query.subject))
        .filter(|at| at.target.is_superset_of(query.scopes))
        .map(|at| (at.key(), at))
        .collect();

    matches.sort_by(|(a_key, a), (b_key, b)| {
        a.target
            .len()
            .cmp(&b.target.len())
            .then_with(|| {
                let a_pref = query.environments.is_preferred_cache(&a.environment);
                let b_pref = query.environments.is_preferred_cache(&b.environment);
                b_pref.cmp(&a_pref)
            })
            .then_with(|| a_key.cmp(b_key))
    });

    if let [(selected, first), (_, second), ..] = matches.as_slice() {
        if first.target.len() == second.target.len() {
            warn!(
                candidates = matches.len(),
                selected = %selected,
                "Several equally narrow access tokens satisfy the requested scopes; picking deterministically"
            );
        } else {
            debug!(
                candidates = matches.len(),
                selected = %selected,
                "Multiple access tokens satisfy the requested scopes"
            );
        }
    }

    let (key, selected) = matches.into_iter().next()?;

    if !selected.is_expired(now, query.expiration_buffer) {
        debug!(key = %key, "Access token cache hit");
        return Some(CachedAccessToken {
            entity: selected.clone(),
            is_extended_lifetime: false,
        });
    }

    if query.extended_lifetime_enabled
        && selected.is_within_extended_lifetime(now, query.expiration_buffer)
    {
        debug!(key = %key, "Serving access token inside extended lifetime");
        return Some(CachedAccessToken {
            entity: selected.clone(),
            is_extended_lifetime: true,
        });
    }

    debug!(key = %key, "Access token expired or about to expire");
    None
}

/// Criteria for a refresh token lookup.
#[derive(Debug, Clone, Copy)]
pub struct RefreshTokenQuery<'a> {
    /// Client the token must belong to (case-insensitive).
    pub client_id: &'a str,
    /// Alias class of the request authority.
    pub environments: &'a EnvironmentAliases,
    /// Home account id of the user.
    pub home_account_id: &'a str,
}

/// Finds the refresh token for `query`.
///
/// Key uniqueness makes more than one hit impossible for a single host; a
/// second hit can only come from another alias host. In that case the
/// token under the preferred cache host wins, then the lowest key, and the
/// ambiguity is logged.
#[must_use]
pub fn find_refresh_token<'e>(
    candidates: impl IntoIterator<Item = &'e RefreshTokenEntity>,
    query: &RefreshTokenQuery<'_>,
) -> Option<RefreshTokenEntity> {
    let mut matches: Vec<(String, &RefreshTokenEntity)> = candidates
        .into_iter()
        .filter(|rt| rt.client_id.eq_ignore_ascii_case(query.client_id))
        .filter(|rt| query.environments.contains(&rt.environment))
        .filter(|rt| rt.home_account_id.eq_ignore_ascii_case(query.home_account_id))
        .map(|rt| (rt.key(), rt))
        .collect();

    if matches.len() > 1 {
        warn!(
            candidates = matches.len(),
            "Multiple refresh tokens for one user and client; picking deterministically"
        );
    }

    matches.sort_by(|(a_key, a), (b_key, b)| {
        let a_pref = query.environments.is_preferred_cache(&a.environment);
        let b_pref = query.environments.is_preferred_cache(&b.environment);
        b_pref.cmp(&a_pref).then_with(|| a_key.cmp(b_key))
    });

    matches.into_iter().next().map(|(_, rt)| rt.clone())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn aliases() -> EnvironmentAliases {
        EnvironmentAliases {
            preferred_network: "login.microsoftonline.com".into(),
            preferred_cache: "login.windows.net".into(),
            aliases: vec!["login.microsoftonline.com".into(), "login.windows.net".into()],
        }
    }

    fn at(env: &str, scopes: &str, expires_in: Duration) -> AccessTokenEntity {
        AccessTokenEntity::new(
            env,
            "client",
            "tenant",
            ScopeSet::parse(scopes),
            format!("{env}:{scopes}"),
            now(),
            now() + expires_in,
            now() + expires_in + Duration::hours(1),
        )
        .with_home_account_id("uid.utid")
    }

    fn user_query<'a>(envs: &'a EnvironmentAliases, scopes: &'a ScopeSet) -> AccessTokenQuery<'a> {
        AccessTokenQuery {
            client_id: "CLIENT",
            environments: envs,
            scopes,
            realm: Some("tenant"),
            subject: Subject::User {
                home_account_id: "uid.utid",
            },
            expiration_buffer: Duration::minutes(5),
            extended_lifetime_enabled: false,
        }
    }

    #[test]
    fn test_superset_required() {
        let envs = aliases();
        let tokens = [at("login.windows.net", "r1/scope1 r1/scope2", Duration::hours(1))];

        let scopes = ScopeSet::parse("R1/SCOPE1");
        assert!(find_access_token(&tokens, &user_query(&envs, &scopes), now()).is_some());

        let scopes = ScopeSet::parse("r1/scope1 missing");
        assert!(find_access_token(&tokens, &user_query(&envs, &scopes), now()).is_none());
    }

    #[test]
    fn test_smallest_superset_wins() {
        let envs = aliases();
        let tokens = [
            at("login.windows.net", "a b c", Duration::hours(1)),
            at("login.windows.net", "a b", Duration::hours(1)),
            at("login.windows.net", "a b d", Duration::hours(1)),
        ];
        let scopes = ScopeSet::parse("a");
        let hit = find_access_token(&tokens, &user_query(&envs, &scopes), now()).unwrap();
        assert_eq!(hit.secret(), "login.windows.net:a b");
    }

    #[test]
    fn test_tie_break_prefers_cache_host_then_key() {
        let envs = aliases();
        let tokens = [
            at("login.microsoftonline.com", "a b", Duration::hours(1)),
            at("login.windows.net", "a b", Duration::hours(1)),
        ];
        let scopes = ScopeSet::parse("a");
        let hit = find_access_token(&tokens, &user_query(&envs, &scopes), now()).unwrap();
        assert_eq!(hit.entity.environment, "login.windows.net");

        let tokens = [
            at("login.windows.net", "a c", Duration::hours(1)),
            at("login.windows.net", "a b", Duration::hours(1)),
        ];
        let hit = find_access_token(&tokens, &user_query(&envs, &scopes), now()).unwrap();
        assert_eq!(hit.secret(), "login.windows.net:a b");
    }

    /// Runs `f` and returns everything it logged.
    fn captured_logs(f: impl FnOnce()) -> String {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Buffer(Arc<Mutex<Vec<u8>>>);

        impl Write for Buffer {
            fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(bytes);
                Ok(bytes.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_tied_candidates_warn() {
        let envs = aliases();
        let scopes = ScopeSet::parse("a");

        let tied = [
            at("login.windows.net", "a c", Duration::hours(1)),
            at("login.windows.net", "a b", Duration::hours(1)),
        ];
        let logs = captured_logs(|| {
            find_access_token(&tied, &user_query(&envs, &scopes), now()).unwrap();
        });
        assert!(logs.contains("WARN"), "{logs}");

        let ranked = [
            at("login.windows.net", "a b c", Duration::hours(1)),
            at("login.windows.net", "a b", Duration::hours(1)),
        ];
        let logs = captured_logs(|| {
            find_access_token(&ranked, &user_query(&envs, &scopes), now()).unwrap();
        });
        assert!(!logs.contains("WARN"), "{logs}");
        assert!(logs.contains("Multiple access tokens"), "{logs}");
    }

    #[test]
    fn test_expiry_buffer() {
        let envs = aliases();
        let scopes = ScopeSet::parse("a");

        let expired = [at("login.windows.net", "a", Duration::zero())];
        assert!(find_access_token(&expired, &user_query(&envs, &scopes), now()).is_none());

        let soon = [at("login.windows.net", "a", Duration::minutes(4))];
        assert!(find_access_token(&soon, &user_query(&envs, &scopes), now()).is_none());

        let fresh = [at("login.windows.net", "a", Duration::hours(1))];
        assert!(find_access_token(&fresh, &user_query(&envs, &scopes), now()).is_some());
    }

    #[test]
    fn test_extended_lifetime() {
        let envs = aliases();
        let scopes = ScopeSet::parse("a");
        let tokens = [at("login.windows.net", "a", Duration::minutes(1))];

        let mut query = user_query(&envs, &scopes);
        assert!(find_access_token(&tokens, &query, now()).is_none());

        query.extended_lifetime_enabled = true;
        let hit = find_access_token(&tokens, &query, now()).unwrap();
        assert!(hit.is_extended_lifetime);
    }

    #[test]
    fn test_subject_filters() {
        let envs = aliases();
        let scopes = ScopeSet::parse("a");
        let user = at("login.windows.net", "a", Duration::hours(1));
        let mut app = at("login.windows.net", "a", Duration::hours(1));
        app.home_account_id = None;
        let mut obo = at("login.windows.net", "a", Duration::hours(1));
        obo.user_assertion_hash = Some("hash-1".into());
        let tokens = [user.clone(), app.clone(), obo.clone()];

        let mut query = user_query(&envs, &scopes);
        assert_eq!(find_access_token(&tokens, &query, now()).unwrap().entity, user);

        query.subject = Subject::App;
        assert_eq!(find_access_token(&tokens, &query, now()).unwrap().entity, app);

        query.subject = Subject::OnBehalfOf { assertion_hash: "hash-1" };
        assert_eq!(find_access_token(&tokens, &query, now()).unwrap().entity, obo);

        query.subject = Subject::OnBehalfOf { assertion_hash: "hash-2" };
        assert!(find_access_token(&tokens, &query, now()).is_none());

        query.subject = Subject::User { home_account_id: "someone.else" };
        assert!(find_access_token(&tokens, &query, now()).is_none());
    }

    #[test]
    fn test_realm_and_environment_filters() {
        let envs = aliases();
        let scopes = ScopeSet::parse("a");
        let tokens = [at("login.windows.net", "a", Duration::hours(1))];

        let mut query = user_query(&envs, &scopes);
        query.realm = Some("other-tenant");
        assert!(find_access_token(&tokens, &query, now()).is_none());
        query.realm = None;
        assert!(find_access_token(&tokens, &query, now()).is_some());

        let elsewhere = EnvironmentAliases::identity("login.chinacloudapi.cn");
        let query = user_query(&elsewhere, &scopes);
        assert!(find_access_token(&tokens, &query, now()).is_none());
    }

    #[test]
    fn test_refresh_token_lookup() {
        let envs = aliases();
        let tokens = [
            RefreshTokenEntity::new("uid.utid", "login.microsoftonline.com", "client", "network"),
            RefreshTokenEntity::new("uid.utid", "login.windows.net", "client", "cache"),
            RefreshTokenEntity::new("other.utid", "login.windows.net", "client", "other"),
        ];
        let query = RefreshTokenQuery {
            client_id: "client",
            environments: &envs,
            home_account_id: "UID.UTID",
        };
        assert_eq!(find_refresh_token(&tokens, &query).unwrap().secret, "cache");

        let elsewhere = EnvironmentAliases::identity("login.chinacloudapi.cn");
        let query = RefreshTokenQuery {
            environments: &elsewhere,
            ..query
        };
        assert!(find_refresh_token(&tokens, &query).is_none());
    }
}
