//! In-memory store.

use std::collections::BTreeMap;

use super::CacheStore;
use crate::entity::{AccessTokenEntity, AccountEntity, IdTokenEntity, RefreshTokenEntity};

/// Four ordered maps keyed by entity key.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    access_tokens: BTreeMap<String, AccessTokenEntity>,
    refresh_tokens: BTreeMap<String, RefreshTokenEntity>,
    id_tokens: BTreeMap<String, IdTokenEntity>,
    accounts: BTreeMap<String, AccountEntity>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for InMemoryStore {
    fn save_access_token(&mut self, entity: AccessTokenEntity) {
        self.access_tokens.insert(entity.key(), entity);
    }

    fn save_refresh_token(&mut self, entity: RefreshTokenEntity) {
        self.refresh_tokens.insert(entity.key(), entity);
    }

    fn save_id_token(&mut self, entity: IdTokenEntity) {
        self.id_tokens.insert(entity.key(), entity);
    }

    fn save_account(&mut self, entity: AccountEntity) {
        self.accounts.insert(entity.key(), entity);
    }

    fn remove_access_token(&mut self, key: &str) -> bool {
        self.access_tokens.remove(key).is_some()
    }

    fn remove_refresh_token(&mut self, key: &str) -> bool {
        self.refresh_tokens.remove(key).is_some()
    }

    fn remove_id_token(&mut self, key: &str) -> bool {
        self.id_tokens.remove(key).is_some()
    }

    fn remove_account(&mut self, key: &str) -> bool {
        self.accounts.remove(key).is_some()
    }

    fn access_tokens(&self) -> Vec<AccessTokenEntity> {
        self.access_tokens.values().cloned().collect()
    }

    fn refresh_tokens(&self) -> Vec<RefreshTokenEntity> {
        self.refresh_tokens.values().cloned().collect()
    }

    fn id_tokens(&self) -> Vec<IdTokenEntity> {
        self.id_tokens.values().cloned().collect()
    }

    fn accounts(&self) -> Vec<AccountEntity> {
        self.accounts.values().cloned().collect()
    }

    fn clear(&mut self) {
        self.access_tokens.clear();
        self.refresh_tokens.clear();
        self.id_tokens.clear();
        self.accounts.clear();
    }
}
