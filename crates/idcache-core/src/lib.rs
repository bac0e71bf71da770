//! # idcache-core
//!
//! Token cache for `OAuth2`/OpenID Connect public and confidential clients.
//!
//! This crate provides:
//! - Cache entities (access, refresh and id tokens, accounts) and their keys
//! - Pluggable storage behind [`CacheStore`], with the unified JSON format
//! - Access and refresh token selection with expiry buffer and extended lifetime
//! - Authority alias resolution through instance discovery
//! - Interop with the legacy flat cache used by older clients
//! - Lifecycle hooks and file/OS-keyring persistence
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use idcache_core::{AliasResolver, Authority, ScopeSet, TokenCache, TokenRequest};
//!
//! let cache = TokenCache::new(Arc::new(AliasResolver::offline()));
//! let request = TokenRequest::new(
//!     "client-id",
//!     Authority::new("https://login.microsoftonline.com/contoso.onmicrosoft.com")?,
//!     ScopeSet::parse("user.read"),
//! )
//! .client_credential();
//!
//! if let Some(token) = cache.find_access_token(&request).await? {
//!     println!("cached: {}", token.entity.key());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod aliases;
pub mod cache;
pub mod entity;
mod error;
pub mod hooks;
pub mod legacy;
pub mod matching;
pub mod persistence;
pub mod request;
pub mod store;

pub use aliases::{AliasResolver, EnvironmentAliases};
pub use cache::{CacheOptions, SavedTokens, TokenCache};
pub use entity::{
    AccessTokenEntity, Account, AccountEntity, CredentialType, IdTokenEntity,
    NULL_PREFERRED_USERNAME, RefreshTokenEntity, ScopeSet,
};
pub use error::{Error, Result};
pub use hooks::{CacheHooks, CacheSnapshot, Mutation, MutationQueue, NotificationArgs};
pub use legacy::{InMemoryLegacyPersistence, LegacyCache, LegacyCachePersistence};
pub use matching::CachedAccessToken;
pub use persistence::{FileCachePersistence, FileLegacyPersistence, KeyringCachePersistence};
pub use request::TokenRequest;
pub use store::{CacheContents, CacheStore, InMemoryStore};

pub use idcache_oauth::{Authority, AuthorityType, ClientInfo, IdToken, TokenResponse, UserAssertion};
