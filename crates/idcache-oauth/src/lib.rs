//! # idcache-oauth
//!
//! `OAuth2`/OpenID Connect value types consumed by the idcache token cache.
//!
//! ## Features
//!
//! - **Authorities**: parsing and classification (Azure AD, AD FS, B2C)
//! - **Token responses**: the token endpoint payload and absolute expiry helpers
//! - **Identity decoding**: `client_info` and unverified `id_token` claims
//! - **On-behalf-of**: user assertions and their cache hash
//! - **Instance discovery**: alias metadata for cloud hosts, over HTTP
//!
//! ## Quick Start
//!
//! ```ignore
//! use idcache_oauth::{Authority, HttpInstanceDiscovery, InstanceDiscovery, TokenResponse};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let authority = Authority::new("https://login.microsoftonline.com/contoso.onmicrosoft.com")?;
//!
//!     // Which hosts share a cache with this one?
//!     let discovery = HttpInstanceDiscovery::new()?;
//!     let metadata = discovery.discover(&authority).await?;
//!     if let Some(entry) = metadata.entry_for(authority.host()) {
//!         println!("cache under {}", entry.preferred_cache);
//!     }
//!
//!     // Decode what the token endpoint returned
//!     let response: TokenResponse = serde_json::from_str(r#"{"access_token":"..."}"#)?;
//!     if let Some(info) = response.decode_client_info()? {
//!         println!("home account {}", info.home_account_id());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod authority;
pub mod discovery;
mod error;
pub mod token;

pub use authority::{Authority, AuthorityType};
pub use discovery::{
    DiscoveryConfig, HttpInstanceDiscovery, InstanceDiscovery, InstanceDiscoveryMetadataEntry,
    InstanceDiscoveryResponse,
};
pub use error::{Error, Result};
pub use token::{ClientInfo, ErrorResponse, IdToken, TokenResponse, UserAssertion};
