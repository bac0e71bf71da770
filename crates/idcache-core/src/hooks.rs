//! Cache lifecycle hooks.
//!
//! Hooks run outside the store lock. They see an immutable snapshot and
//! may queue changes; the cache applies the queue after the hook returns,
//! so a hook can never observe or corrupt a half-finished operation.

use crate::Result;
use crate::entity::{Account, AccessTokenEntity, AccountEntity, IdTokenEntity, RefreshTokenEntity};
use crate::store::CacheContents;

/// Context passed to every hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationArgs {
    /// Client of the operation.
    pub client_id: String,
    /// Account of the operation, if any.
    pub account: Option<Account>,
    /// True if the operation changed the store.
    pub has_state_changed: bool,
}

/// Immutable view of the store taken for a hook.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    contents: CacheContents,
}

impl CacheSnapshot {
    pub(crate) const fn new(contents: CacheContents) -> Self {
        Self { contents }
    }

    /// Entities at the time of the snapshot.
    #[must_use]
    pub const fn contents(&self) -> &CacheContents {
        &self.contents
    }

    /// Encodes the snapshot as a unified JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity fails to serialize.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.contents.to_json()
    }
}

/// A change requested by a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Merge a unified JSON document, as loaded from persistence.
    Deserialize(Vec<u8>),
    /// Remove everything.
    Clear,
    /// Save an access token.
    SaveAccessToken(AccessTokenEntity),
    /// Save a refresh token.
    SaveRefreshToken(RefreshTokenEntity),
    /// Save an id token.
    SaveIdToken(IdTokenEntity),
    /// Save an account.
    SaveAccount(AccountEntity),
    /// Remove an access token by key.
    RemoveAccessToken(String),
    /// Remove a refresh token by key.
    RemoveRefreshToken(String),
    /// Remove an id token by key.
    RemoveIdToken(String),
    /// Remove an account by key.
    RemoveAccount(String),
}

/// Changes queued by a hook, applied in order once it returns.
#[derive(Debug, Default)]
pub struct MutationQueue {
    pending: Vec<Mutation>,
}

impl MutationQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a change.
    pub fn push(&mut self, mutation: Mutation) {
        self.pending.push(mutation);
    }

    /// Queues a merge of a persisted document.
    pub fn deserialize(&mut self, bytes: Vec<u8>) {
        self.push(Mutation::Deserialize(bytes));
    }

    /// Number of queued changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn into_inner(self) -> Vec<Mutation> {
        self.pending
    }
}

/// Callbacks around cache access, typically used for persistence.
///
/// All methods default to doing nothing. Errors are logged by the cache and
/// do not fail the operation.
pub trait CacheHooks: Send + Sync {
    /// Called before the cache is read or written.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the cache logs and continues.
    fn before_access(
        &self,
        _args: &NotificationArgs,
        _snapshot: &CacheSnapshot,
        _mutations: &mut MutationQueue,
    ) -> Result<()> {
        Ok(())
    }

    /// Called before the cache is written, after `before_access`.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the cache logs and continues.
    fn before_write(
        &self,
        _args: &NotificationArgs,
        _snapshot: &CacheSnapshot,
        _mutations: &mut MutationQueue,
    ) -> Result<()> {
        Ok(())
    }

    /// Called after the cache was read or written.
    ///
    /// # Errors
    ///
    /// Implementations may fail; the cache logs and continues.
    fn after_access(
        &self,
        _args: &NotificationArgs,
        _snapshot: &CacheSnapshot,
        _mutations: &mut MutationQueue,
    ) -> Result<()> {
        Ok(())
    }
}
