//! Cache storage backends.
//!
//! The matching engine only sees entity snapshots, so any backend that can
//! hold the four entity maps can sit behind [`CacheStore`].

mod contents;
mod memory;

pub use contents::CacheContents;
pub use memory::InMemoryStore;

use crate::Result;
use crate::entity::{AccessTokenEntity, AccountEntity, IdTokenEntity, RefreshTokenEntity};

/// Keyed storage for the four entity kinds.
///
/// Saves replace by key. Snapshot accessors return owned copies, so callers
/// iterate without holding any borrow of the store.
pub trait CacheStore: Send + Sync {
    /// Inserts or replaces an access token.
    fn save_access_token(&mut self, entity: AccessTokenEntity);
    /// Inserts or replaces a refresh token.
    fn save_refresh_token(&mut self, entity: RefreshTokenEntity);
    /// Inserts or replaces an id token.
    fn save_id_token(&mut self, entity: IdTokenEntity);
    /// Inserts or replaces an account.
    fn save_account(&mut self, entity: AccountEntity);

    /// Removes an access token by key. Returns true if it existed.
    fn remove_access_token(&mut self, key: &str) -> bool;
    /// Removes a refresh token by key. Returns true if it existed.
    fn remove_refresh_token(&mut self, key: &str) -> bool;
    /// Removes an id token by key. Returns true if it existed.
    fn remove_id_token(&mut self, key: &str) -> bool;
    /// Removes an account by key. Returns true if it existed.
    fn remove_account(&mut self, key: &str) -> bool;

    /// Snapshot of all access tokens.
    fn access_tokens(&self) -> Vec<AccessTokenEntity>;
    /// Snapshot of all refresh tokens.
    fn refresh_tokens(&self) -> Vec<RefreshTokenEntity>;
    /// Snapshot of all id tokens.
    fn id_tokens(&self) -> Vec<IdTokenEntity>;
    /// Snapshot of all accounts.
    fn accounts(&self) -> Vec<AccountEntity>;

    /// Empties all four maps.
    fn clear(&mut self);

    /// Snapshot of everything, keyed.
    fn contents(&self) -> CacheContents {
        let mut contents = CacheContents::new();
        self.access_tokens()
            .into_iter()
            .for_each(|e| contents.insert_access_token(e));
        self.refresh_tokens()
            .into_iter()
            .for_each(|e| contents.insert_refresh_token(e));
        self.id_tokens()
            .into_iter()
            .for_each(|e| contents.insert_id_token(e));
        self.accounts()
            .into_iter()
            .for_each(|e| contents.insert_account(e));
        contents
    }

    /// Saves every entity of `contents`; incoming entries win on collision.
    ///
    /// Returns true if anything was written.
    fn merge(&mut self, contents: CacheContents) -> bool {
        let changed = !contents.is_empty();
        contents
            .access_tokens
            .into_values()
            .for_each(|e| self.save_access_token(e));
        contents
            .refresh_tokens
            .into_values()
            .for_each(|e| self.save_refresh_token(e));
        contents
            .id_tokens
            .into_values()
            .for_each(|e| self.save_id_token(e));
        contents
            .accounts
            .into_values()
            .for_each(|e| self.save_account(e));
        changed
    }

    /// Encodes the store as a unified JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity fails to serialize.
    fn serialize(&self) -> Result<Vec<u8>> {
        self.contents().to_json()
    }

    /// Merges a unified JSON document into the store.
    ///
    /// The document is parsed completely before anything is written, so a
    /// corrupt blob leaves the store untouched. Returns true if anything was
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CacheDeserializationFailed`] if the document is malformed.
    fn deserialize(&mut self, bytes: &[u8]) -> Result<bool> {
        Ok(CacheContents::from_json(bytes)?.is_some_and(|contents| self.merge(contents)))
    }
}
