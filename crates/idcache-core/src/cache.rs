//! The token cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{Duration, SubsecRound, Utc};
use idcache_oauth::{Authority, ClientInfo, TokenResponse};
use tracing::{debug, info, warn};

use crate::aliases::{AliasResolver, EnvironmentAliases};
use crate::entity::{
    AccessTokenEntity, Account, AccountEntity, IdTokenEntity, NULL_PREFERRED_USERNAME,
    RefreshTokenEntity, ScopeSet,
};
use crate::hooks::{CacheHooks, CacheSnapshot, Mutation, MutationQueue, NotificationArgs};
use crate::legacy::{self, InMemoryLegacyPersistence, LegacyCache, LegacyCachePersistence};
use crate::matching::{
    self, AccessTokenQuery, CachedAccessToken, RefreshTokenQuery, Subject,
};
use crate::request::TokenRequest;
use crate::store::{CacheContents, CacheStore, InMemoryStore};
use crate::Result;

/// Default window before expiry in which access tokens are treated as expired.
pub const DEFAULT_EXPIRATION_BUFFER_SECS: i64 = 300;

/// Tunables for [`TokenCache`].
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Access tokens expiring within this window are not served.
    pub expiration_buffer: Duration,
    /// Whether user tokens are mirrored into the legacy cache.
    pub mirror_legacy: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            expiration_buffer: Duration::seconds(DEFAULT_EXPIRATION_BUFFER_SECS),
            mirror_legacy: true,
        }
    }
}

impl CacheOptions {
    /// Sets the expiration buffer.
    #[must_use]
    pub const fn with_expiration_buffer(mut self, buffer: Duration) -> Self {
        self.expiration_buffer = buffer;
        self
    }

    /// Enables or disables legacy mirroring.
    #[must_use]
    pub const fn with_mirror_legacy(mut self, mirror: bool) -> Self {
        self.mirror_legacy = mirror;
        self
    }
}

/// Entities written by [`TokenCache::save_token_response`].
#[derive(Debug, Clone, PartialEq)]
pub struct SavedTokens {
    /// The stored access token.
    pub access_token: AccessTokenEntity,
    /// The stored refresh token, if the response carried one.
    pub refresh_token: Option<RefreshTokenEntity>,
    /// The stored id token, if the response carried one.
    pub id_token: Option<IdTokenEntity>,
    /// The account derived from the response, if any.
    pub account: Option<Account>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    BeforeAccess,
    BeforeWrite,
    AfterAccess,
}

impl Phase {
    const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAccess => "before_access",
            Self::BeforeWrite => "before_write",
            Self::AfterAccess => "after_access",
        }
    }
}

/// Token cache: storage, lookup and legacy interop behind one lock.
///
/// The store sits behind a reader-writer lock that is never held across an
/// await, a hook call, or legacy persistence I/O.
pub struct TokenCache {
    store: RwLock<Box<dyn CacheStore>>,
    resolver: Arc<AliasResolver>,
    legacy: Option<Arc<dyn LegacyCachePersistence>>,
    hooks: Vec<Arc<dyn CacheHooks>>,
    options: CacheOptions,
    state_changed: AtomicBool,
}

impl TokenCache {
    /// Creates an in-memory cache with an in-memory legacy cache.
    #[must_use]
    pub fn new(resolver: Arc<AliasResolver>) -> Self {
        Self {
            store: RwLock::new(Box::new(InMemoryStore::new())),
            resolver,
            legacy: Some(Arc::new(InMemoryLegacyPersistence::new())),
            hooks: Vec::new(),
            options: CacheOptions::default(),
            state_changed: AtomicBool::new(false),
        }
    }

    /// Replaces the storage backend.
    #[must_use]
    pub fn with_store(mut self, store: Box<dyn CacheStore>) -> Self {
        self.store = RwLock::new(store);
        self
    }

    /// Replaces the legacy cache persistence.
    #[must_use]
    pub fn with_legacy_persistence(mut self, legacy: Arc<dyn LegacyCachePersistence>) -> Self {
        self.legacy = Some(legacy);
        self
    }

    /// Disables the legacy cache entirely.
    #[must_use]
    pub fn without_legacy_persistence(mut self) -> Self {
        self.legacy = None;
        self
    }

    /// Registers lifecycle hooks. Hooks run in registration order.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn CacheHooks>) -> Self {
        self.hooks.push(hooks);
        self
    }

    /// Sets the options.
    #[must_use]
    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Current options.
    #[must_use]
    pub const fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// The alias resolver.
    #[must_use]
    pub const fn resolver(&self) -> &Arc<AliasResolver> {
        &self.resolver
    }

    /// Returns true if the store changed since the last [`reset_state_changed`](Self::reset_state_changed).
    #[must_use]
    pub fn has_state_changed(&self) -> bool {
        self.state_changed.load(Ordering::SeqCst)
    }

    /// Clears the changed flag.
    pub fn reset_state_changed(&self) {
        self.state_changed.store(false, Ordering::SeqCst);
    }

    /// Finds a usable access token for `request`.
    ///
    /// A miss is `Ok(None)`; the caller should fall back to a refresh token
    /// or a network request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or authority validation fails.
    pub async fn find_access_token(&self, request: &TokenRequest) -> Result<Option<CachedAccessToken>> {
        request.validate()?;
        if request.force_refresh() {
            debug!(client_id = request.client_id(), "Force refresh; skipping access token lookup");
            return Ok(None);
        }
        let Some(subject) = subject_of(request) else {
            debug!(client_id = request.client_id(), "User request without an account; no access token lookup");
            return Ok(None);
        };

        let environments = self
            .resolver
            .resolve(request.authority(), request.validate_authority())
            .await?;

        let args = notification_args(request, false);
        self.notify(Phase::BeforeAccess, &args);

        let candidates = self.read_store().access_tokens();
        let authority = request.authority();
        let query = AccessTokenQuery {
            client_id: request.client_id(),
            environments: &environments,
            scopes: request.scopes(),
            realm: (!authority.is_tenantless()).then(|| authority.tenant()),
            subject,
            expiration_buffer: self.options.expiration_buffer,
            extended_lifetime_enabled: request.extended_lifetime_enabled(),
        };
        let found = matching::find_access_token(&candidates, &query, Utc::now());

        self.notify(Phase::AfterAccess, &args);
        Ok(found)
    }

    /// Finds the refresh token for the request's user.
    ///
    /// Falls back to the legacy cache when the unified store has none.
    /// App-only and on-behalf-of requests never get a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid or authority validation fails.
    pub async fn find_refresh_token(&self, request: &TokenRequest) -> Result<Option<RefreshTokenEntity>> {
        request.validate()?;
        if request.is_client_credential() || request.user_assertion().is_some() {
            return Ok(None);
        }

        let environments = self
            .resolver
            .resolve(request.authority(), request.validate_authority())
            .await?;

        let args = notification_args(request, false);
        self.notify(Phase::BeforeAccess, &args);

        let home_account_id = request.account().and_then(|a| a.home_account_id.as_deref());
        let unified = home_account_id.and_then(|home_account_id| {
            let candidates = self.read_store().refresh_tokens();
            matching::find_refresh_token(
                &candidates,
                &RefreshTokenQuery {
                    client_id: request.client_id(),
                    environments: &environments,
                    home_account_id,
                },
            )
        });
        let found = unified.or_else(|| self.legacy_refresh_token(request, &environments));

        self.notify(Phase::AfterAccess, &args);
        Ok(found)
    }

    /// Stores a token endpoint response.
    ///
    /// Entities are filed under the preferred cache host of the request
    /// authority. User tokens with a refresh token are mirrored into the
    /// legacy cache afterwards; a failure there is logged and does not undo
    /// the unified write.
    ///
    /// # Errors
    ///
    /// Returns an error if the request is invalid, authority validation
    /// fails, or the response carries malformed client info or id token.
    pub async fn save_token_response(
        &self,
        request: &TokenRequest,
        response: &TokenResponse,
    ) -> Result<SavedTokens> {
        request.validate()?;
        let environments = self
            .resolver
            .resolve(request.authority(), request.validate_authority())
            .await?;
        let environment = environments.preferred_cache.clone();
        let client_info = response.decode_client_info()?;
        let claims = response.decode_id_token()?;
        let authority = request.authority();
        let client_id = request.client_id();
        let now = Utc::now().trunc_subsecs(0);

        let home_account_id = if request.is_client_credential() && request.user_assertion().is_none() {
            None
        } else {
            client_info.as_ref().map(ClientInfo::home_account_id)
        };
        let realm = if authority.is_tenantless() {
            claims
                .as_ref()
                .and_then(|c| c.tid.clone())
                .or_else(|| client_info.as_ref().map(|c| c.utid.clone()))
                .unwrap_or_else(|| authority.tenant().to_string())
        } else {
            authority.tenant().to_string()
        };
        let scopes = response
            .scope
            .as_deref()
            .map(ScopeSet::parse)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| request.scopes().clone());

        let mut access_token = AccessTokenEntity::new(
            &environment,
            client_id,
            &realm,
            scopes,
            &response.access_token,
            now,
            response.expires_on(now).trunc_subsecs(0),
            response.extended_expires_on(now).trunc_subsecs(0),
        )
        .with_token_type(&response.token_type);
        if let Some(home) = &home_account_id {
            access_token = access_token.with_home_account_id(home);
        }
        if let Some(assertion) = request.user_assertion() {
            access_token = access_token.with_user_assertion_hash(assertion.hash());
        }

        let id_token = response
            .id_token
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                IdTokenEntity::new(
                    home_account_id.clone().unwrap_or_default(),
                    &environment,
                    client_id,
                    &realm,
                    raw,
                )
            });

        let account = match (&home_account_id, &claims) {
            (Some(home), Some(claims)) => {
                let username = claims
                    .preferred_username
                    .clone()
                    .unwrap_or_else(|| NULL_PREFERRED_USERNAME.to_string());
                let mut entity = AccountEntity::new(home, &environment, &realm, username)
                    .with_authority_type(authority.authority_type());
                entity.local_account_id = claims.object_id().map(str::to_string);
                entity.name.clone_from(&claims.name);
                entity.given_name.clone_from(&claims.given_name);
                entity.family_name.clone_from(&claims.family_name);
                entity.client_info.clone_from(&response.client_info);
                Some(entity)
            }
            _ => None,
        };

        let refresh_token = response
            .refresh_token
            .as_deref()
            .filter(|rt| !rt.is_empty())
            .map(|rt| {
                let entity = RefreshTokenEntity::new(
                    home_account_id.clone().unwrap_or_default(),
                    &environment,
                    client_id,
                    rt,
                );
                match &response.foci {
                    Some(family) => entity.with_family_id(family),
                    None => entity,
                }
            });

        let account_handle = account.as_ref().map(AccountEntity::to_account);
        let args = NotificationArgs {
            client_id: client_id.to_string(),
            account: account_handle.clone().or_else(|| request.account().cloned()),
            has_state_changed: true,
        };
        self.notify(Phase::BeforeAccess, &args);
        self.notify(Phase::BeforeWrite, &args);

        let mut written = CacheContents::new();
        written.insert_access_token(access_token.clone());
        if let Some(entity) = &id_token {
            written.insert_id_token(entity.clone());
        }
        if let Some(entity) = &account {
            written.insert_account(entity.clone());
        }
        if let Some(entity) = &refresh_token {
            written.insert_refresh_token(entity.clone());
        }
        self.write_store().merge(written.clone());
        self.mark_changed();
        info!(
            client_id,
            environment = %environment,
            realm = %realm,
            scopes = %access_token.target,
            has_refresh_token = refresh_token.is_some(),
            "Saved token response"
        );

        if refresh_token.is_some() && request.is_legacy_compatible() {
            self.mirror_to_legacy(&written);
        }

        self.notify(Phase::AfterAccess, &args);

        Ok(SavedTokens {
            access_token,
            refresh_token,
            id_token,
            account: account_handle,
        })
    }

    /// Lists accounts that have a refresh token for `client_id` under
    /// `authority`'s aliases, plus users known only to the legacy cache.
    ///
    /// # Errors
    ///
    /// Returns an error if alias resolution fails.
    pub async fn get_accounts(&self, client_id: &str, authority: &Authority) -> Result<Vec<Account>> {
        let environments = self.resolver.resolve(authority, false).await?;
        let args = NotificationArgs {
            client_id: client_id.to_string(),
            account: None,
            has_state_changed: false,
        };
        self.notify(Phase::BeforeAccess, &args);

        let (refresh_tokens, accounts) = {
            let store = self.read_store();
            (store.refresh_tokens(), store.accounts())
        };

        let mut result: Vec<Account> = Vec::new();
        for rt in refresh_tokens.iter().filter(|rt| {
            rt.client_id.eq_ignore_ascii_case(client_id) && environments.contains(&rt.environment)
        }) {
            let owned = accounts.iter().filter(|a| {
                a.home_account_id.eq_ignore_ascii_case(&rt.home_account_id)
                    && environments.contains(&a.environment)
            });
            for account in owned {
                if !result
                    .iter()
                    .any(|r| r.home_account_id.as_deref() == Some(account.home_account_id.as_str()))
                {
                    result.push(account.to_account());
                }
            }
        }

        self.add_legacy_accounts(&mut result, client_id, &environments);

        self.notify(Phase::AfterAccess, &args);
        Ok(result)
    }

    /// Removes every token and record of `account` for `client_id`,
    /// including its legacy entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the account's environment is not a valid host or
    /// alias resolution fails.
    pub async fn remove_account(&self, client_id: &str, account: &Account) -> Result<()> {
        let authority = Authority::new(format!("https://{}/common/", account.environment))?;
        let environments = self.resolver.resolve(&authority, false).await?;

        let args = NotificationArgs {
            client_id: client_id.to_string(),
            account: Some(account.clone()),
            has_state_changed: true,
        };
        self.notify(Phase::BeforeAccess, &args);
        self.notify(Phase::BeforeWrite, &args);

        let removed = account
            .home_account_id
            .as_deref()
            .map_or(0, |home| self.remove_entities(client_id, home, &environments));
        if removed > 0 {
            self.mark_changed();
        }

        if let Some(persistence) = &self.legacy {
            let result = persistence.load_cache().and_then(|mut cache| {
                let dropped = legacy::remove_user(
                    &mut cache,
                    Some(account.username.as_str()),
                    &environments,
                    account.home_account_id.as_deref(),
                );
                if dropped > 0 {
                    persistence.write_cache(&cache)?;
                }
                Ok(dropped)
            });
            match result {
                Ok(dropped) => debug!(dropped, "Removed legacy entries for account"),
                Err(e) => warn!(error = %e, "Failed to remove account from legacy cache"),
            }
        }

        info!(client_id, removed, "Removed account");
        self.notify(Phase::AfterAccess, &args);
        Ok(())
    }

    /// Empties the cache and the legacy cache.
    pub fn clear(&self) {
        let args = NotificationArgs {
            client_id: String::new(),
            account: None,
            has_state_changed: true,
        };
        self.notify(Phase::BeforeAccess, &args);
        self.notify(Phase::BeforeWrite, &args);

        self.write_store().clear();
        self.mark_changed();
        if let Some(persistence) = &self.legacy {
            if let Err(e) = persistence.write_cache(&LegacyCache::new()) {
                warn!(error = %e, "Failed to clear legacy cache");
            }
        }
        info!("Cleared token cache");

        self.notify(Phase::AfterAccess, &args);
    }

    /// Encodes the store as a unified JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity fails to serialize.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.read_store().serialize()
    }

    /// Merges a unified JSON document into the store.
    ///
    /// Empty input is a no-op and leaves the changed flag alone.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CacheDeserializationFailed`] if the document is
    /// malformed; the store is left unchanged.
    pub fn deserialize(&self, bytes: &[u8]) -> Result<()> {
        if self.write_store().deserialize(bytes)? {
            self.mark_changed();
        }
        Ok(())
    }

    /// Snapshot of the store.
    #[must_use]
    pub fn contents(&self) -> CacheContents {
        self.read_store().contents()
    }

    /// Current legacy cache contents; empty when legacy interop is disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy document cannot be read.
    pub fn legacy_entries(&self) -> Result<LegacyCache> {
        self.legacy
            .as_ref()
            .map_or_else(|| Ok(LegacyCache::new()), |p| p.load_cache())
    }

    /// Imports users from the legacy cache as refresh tokens and accounts.
    /// Returns how many entities were written.
    ///
    /// # Errors
    ///
    /// Returns an error if the legacy document cannot be read or is malformed.
    pub fn import_legacy(&self) -> Result<usize> {
        let Some(persistence) = &self.legacy else {
            return Ok(0);
        };
        let contents = legacy::from_legacy_entries(&persistence.load_cache()?);
        let imported = contents.len();
        if self.write_store().merge(contents) {
            self.mark_changed();
        }
        info!(imported, "Imported legacy cache entries");
        Ok(imported)
    }

    fn read_store(&self) -> RwLockReadGuard<'_, Box<dyn CacheStore>> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, Box<dyn CacheStore>> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn mark_changed(&self) {
        self.state_changed.store(true, Ordering::SeqCst);
    }

    /// Runs every hook for `phase`, applying each hook's queued mutations
    /// before the next hook sees a snapshot.
    fn notify(&self, phase: Phase, args: &NotificationArgs) {
        for hook in &self.hooks {
            let snapshot = CacheSnapshot::new(self.read_store().contents());
            let mut queue = MutationQueue::new();
            let result = match phase {
                Phase::BeforeAccess => hook.before_access(args, &snapshot, &mut queue),
                Phase::BeforeWrite => hook.before_write(args, &snapshot, &mut queue),
                Phase::AfterAccess => hook.after_access(args, &snapshot, &mut queue),
            };
            if let Err(e) = result {
                warn!(phase = phase.as_str(), error = %e, "Cache hook failed");
            }
            self.apply(queue);
        }
    }

    fn apply(&self, queue: MutationQueue) {
        let mutations = queue.into_inner();
        if mutations.is_empty() {
            return;
        }

        let mut changed = false;
        {
            let mut store = self.write_store();
            for mutation in mutations {
                match mutation {
                    // Loading persisted state is not a change of state.
                    Mutation::Deserialize(bytes) => {
                        if let Err(e) = store.deserialize(&bytes) {
                            warn!(error = %e, "Ignoring unreadable persisted cache");
                        }
                    }
                    Mutation::Clear => {
                        store.clear();
                        changed = true;
                    }
                    Mutation::SaveAccessToken(entity) => {
                        store.save_access_token(entity);
                        changed = true;
                    }
                    Mutation::SaveRefreshToken(entity) => {
                        store.save_refresh_token(entity);
                        changed = true;
                    }
                    Mutation::SaveIdToken(entity) => {
                        store.save_id_token(entity);
                        changed = true;
                    }
                    Mutation::SaveAccount(entity) => {
                        store.save_account(entity);
                        changed = true;
                    }
                    Mutation::RemoveAccessToken(key) => changed |= store.remove_access_token(&key),
                    Mutation::RemoveRefreshToken(key) => changed |= store.remove_refresh_token(&key),
                    Mutation::RemoveIdToken(key) => changed |= store.remove_id_token(&key),
                    Mutation::RemoveAccount(key) => changed |= store.remove_account(&key),
                }
            }
        }
        if changed {
            self.mark_changed();
        }
    }

    fn remove_entities(&self, client_id: &str, home_account_id: &str, environments: &EnvironmentAliases) -> usize {
        let owned = |home: &str, env: &str| {
            home.eq_ignore_ascii_case(home_account_id) && environments.contains(env)
        };

        let mut store = self.write_store();
        let mut removed = 0;
        for rt in store.refresh_tokens() {
            if rt.client_id.eq_ignore_ascii_case(client_id) && owned(&rt.home_account_id, &rt.environment) {
                removed += usize::from(store.remove_refresh_token(&rt.key()));
            }
        }
        for at in store.access_tokens() {
            let home = at.home_account_id.as_deref().unwrap_or_default();
            if at.client_id.eq_ignore_ascii_case(client_id) && owned(home, &at.environment) {
                removed += usize::from(store.remove_access_token(&at.key()));
            }
        }
        for id in store.id_tokens() {
            if id.client_id.eq_ignore_ascii_case(client_id) && owned(&id.home_account_id, &id.environment) {
                removed += usize::from(store.remove_id_token(&id.key()));
            }
        }
        for account in store.accounts() {
            if owned(&account.home_account_id, &account.environment) {
                removed += usize::from(store.remove_account(&account.key()));
            }
        }
        removed
    }

    fn mirror_to_legacy(&self, written: &CacheContents) {
        if !self.options.mirror_legacy {
            return;
        }
        let Some(persistence) = &self.legacy else {
            return;
        };
        let entries = legacy::to_legacy_entries(written);
        if entries.is_empty() {
            return;
        }
        let count = entries.len();
        let result = persistence.load_cache().and_then(|mut cache| {
            legacy::write_refresh_tokens(&mut cache, entries);
            persistence.write_cache(&cache)
        });
        match result {
            Ok(()) => debug!(entries = count, "Mirrored tokens into legacy cache"),
            Err(e) => warn!(error = %e, "Failed to mirror tokens into legacy cache"),
        }
    }

    fn legacy_refresh_token(
        &self,
        request: &TokenRequest,
        environments: &EnvironmentAliases,
    ) -> Option<RefreshTokenEntity> {
        if !request.is_legacy_compatible() {
            return None;
        }
        let persistence = self.legacy.as_ref()?;
        let cache = match persistence.load_cache() {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Failed to read legacy cache");
                return None;
            }
        };
        let account = request.account();
        let login_hint = request
            .login_hint()
            .or_else(|| account.map(|a| a.username.as_str()));
        legacy::find_refresh_token(
            &cache,
            environments,
            request.client_id(),
            login_hint,
            None,
            account.and_then(|a| a.home_account_id.as_deref()),
        )
    }

    fn add_legacy_accounts(&self, result: &mut Vec<Account>, client_id: &str, environments: &EnvironmentAliases) {
        let Some(persistence) = &self.legacy else {
            return;
        };
        let cache = match persistence.load_cache() {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Failed to read legacy cache");
                return;
            }
        };
        let users = legacy::legacy_users(&cache, environments, client_id);

        for (home_account_id, info) in users.with_client_info {
            if result
                .iter()
                .any(|a| a.home_account_id.as_deref() == Some(home_account_id.as_str()))
            {
                continue;
            }
            result.push(Account {
                home_account_id: Some(home_account_id),
                username: info
                    .displayable_id
                    .unwrap_or_else(|| NULL_PREFERRED_USERNAME.to_string()),
                environment: environments.preferred_cache.clone(),
            });
        }

        for info in users.without_client_info {
            let Some(username) = info.displayable_id.filter(|u| !u.is_empty()) else {
                continue;
            };
            if result.iter().any(|a| a.username.eq_ignore_ascii_case(&username)) {
                continue;
            }
            result.push(Account {
                home_account_id: None,
                username,
                environment: environments.preferred_cache.clone(),
            });
        }
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("resolver", &self.resolver)
            .field("has_legacy", &self.legacy.is_some())
            .field("hooks", &self.hooks.len())
            .field("options", &self.options)
            .field("state_changed", &self.has_state_changed())
            .finish_non_exhaustive()
    }
}

fn subject_of(request: &TokenRequest) -> Option<Subject<'_>> {
    if let Some(assertion) = request.user_assertion() {
        return Some(Subject::OnBehalfOf {
            assertion_hash: assertion.hash(),
        });
    }
    if request.is_client_credential() {
        return Some(Subject::App);
    }
    request
        .account()
        .and_then(|a| a.home_account_id.as_deref())
        .map(|home_account_id| Subject::User { home_account_id })
}

fn notification_args(request: &TokenRequest, has_state_changed: bool) -> NotificationArgs {
    NotificationArgs {
        client_id: request.client_id().to_string(),
        account: request.account().cloned(),
        has_state_changed,
    }
}
