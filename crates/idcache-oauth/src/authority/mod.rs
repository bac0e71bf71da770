//! Authority URLs and their classification.

use std::fmt;

use crate::error::{Error, Result};
use url::Url;

/// Tenants that do not identify a single directory.
const NON_SPECIFIC_TENANTS: [&str; 3] = ["common", "organizations", "consumers"];

/// Path segment that marks a B2C policy authority.
const B2C_PREFIX: &str = "tfp";

/// Path segment that marks an AD FS authority.
const ADFS_PREFIX: &str = "adfs";

/// Kind of identity provider behind an authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthorityType {
    /// Azure AD (v1 or v2 endpoint).
    #[default]
    Aad,
    /// Active Directory Federation Services.
    Adfs,
    /// Azure AD B2C policy authority.
    B2C,
}

impl AuthorityType {
    /// Returns the value written to the `authority_type` field of account entries.
    #[must_use]
    pub const fn as_cache_str(self) -> &'static str {
        match self {
            Self::Aad => "MSSTS",
            Self::Adfs => "ADFS",
            Self::B2C => "B2C",
        }
    }

    /// Parses an `authority_type` field value. Unknown values map to `Aad`.
    #[must_use]
    pub fn from_cache_str(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ADFS") {
            Self::Adfs
        } else if value.eq_ignore_ascii_case("B2C") {
            Self::B2C
        } else {
            Self::Aad
        }
    }
}

/// A parsed authority such as `https://login.microsoftonline.com/contoso.onmicrosoft.com/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    /// Lower-cased host name.
    host: String,
    /// Non-empty path segments.
    segments: Vec<String>,
    /// Authority classification.
    authority_type: AuthorityType,
}

impl Authority {
    /// Parses an authority URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, is not `https`, or has no tenant segment.
    pub fn new(authority: impl AsRef<str>) -> Result<Self> {
        let url = Url::parse(authority.as_ref())?;

        if url.scheme() != "https" {
            return Err(Error::InvalidAuthority(format!(
                "authority must use https: {}",
                authority.as_ref()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidAuthority("authority has no host".into()))?
            .to_ascii_lowercase();

        let segments: Vec<String> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();

        let first = segments
            .first()
            .ok_or_else(|| Error::InvalidAuthority("authority has no tenant".into()))?;

        let authority_type = if first.eq_ignore_ascii_case(B2C_PREFIX) {
            if segments.len() < 3 {
                return Err(Error::InvalidAuthority(
                    "B2C authority must be https://<host>/tfp/<tenant>/<policy>/".into(),
                ));
            }
            AuthorityType::B2C
        } else if first.eq_ignore_ascii_case(ADFS_PREFIX) {
            AuthorityType::Adfs
        } else {
            AuthorityType::Aad
        };

        Ok(Self {
            host,
            segments,
            authority_type,
        })
    }

    /// Lower-cased host of the authority.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Authority classification.
    #[must_use]
    pub const fn authority_type(&self) -> AuthorityType {
        self.authority_type
    }

    /// Tenant (realm) named by the authority.
    ///
    /// For B2C authorities this is the segment after `tfp`; AD FS authorities
    /// report `adfs`.
    #[must_use]
    pub fn tenant(&self) -> &str {
        let index = usize::from(self.authority_type == AuthorityType::B2C);
        self.segments.get(index).map_or("", String::as_str)
    }

    /// Returns true for `common`, `organizations` and `consumers`.
    #[must_use]
    pub fn is_tenantless(&self) -> bool {
        let tenant = self.tenant();
        NON_SPECIFIC_TENANTS
            .iter()
            .any(|t| t.eq_ignore_ascii_case(tenant))
    }

    /// Canonical form: `https://<host>/<segments>/`.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("https://{}/{}/", self.host, self.segments.join("/"))
    }

    /// Returns a copy of this authority on a different host.
    #[must_use]
    pub fn with_host(&self, host: impl AsRef<str>) -> Self {
        Self {
            host: host.as_ref().to_ascii_lowercase(),
            segments: self.segments.clone(),
            authority_type: self.authority_type,
        }
    }

    /// Returns a copy of this authority with the tenant replaced.
    ///
    /// B2C and AD FS authorities are returned unchanged.
    #[must_use]
    pub fn with_tenant(&self, tenant: impl Into<String>) -> Self {
        let mut updated = self.clone();
        if self.authority_type == AuthorityType::Aad {
            if let Some(first) = updated.segments.first_mut() {
                *first = tenant.into();
            }
        }
        updated
    }

    /// Authorization endpoint used as the discovery probe for this authority.
    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        format!(
            "https://{}/{}/oauth2/v2.0/authorize",
            self.host,
            self.tenant()
        )
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// Extracts the host of an authority-like URL without full validation.
///
/// Used for legacy cache keys, which store the authority verbatim.
#[must_use]
pub fn host_of(authority: &str) -> Option<String> {
    Url::parse(authority)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_aad_authority() {
        let authority = Authority::new("https://Login.MicrosoftOnline.com/contoso.onmicrosoft.com").unwrap();
        assert_eq!(authority.host(), "login.microsoftonline.com");
        assert_eq!(authority.tenant(), "contoso.onmicrosoft.com");
        assert_eq!(authority.authority_type(), AuthorityType::Aad);
        assert_eq!(
            authority.canonical(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/"
        );
        assert!(!authority.is_tenantless());
    }

    #[test]
    fn test_common_authority_is_tenantless() {
        let authority = Authority::new("https://login.microsoftonline.com/common/").unwrap();
        assert!(authority.is_tenantless());
        let organizations = Authority::new("https://login.microsoftonline.com/Organizations").unwrap();
        assert!(organizations.is_tenantless());
    }

    #[test]
    fn test_b2c_authority() {
        let authority =
            Authority::new("https://login.microsoftonline.com/tfp/tenant/b2c_1_susi/").unwrap();
        assert_eq!(authority.authority_type(), AuthorityType::B2C);
        assert_eq!(authority.tenant(), "tenant");
        assert!(Authority::new("https://login.microsoftonline.com/tfp/tenant/").is_err());
    }

    #[test]
    fn test_adfs_authority() {
        let authority = Authority::new("https://fs.contoso.com/adfs/").unwrap();
        assert_eq!(authority.authority_type(), AuthorityType::Adfs);
        assert_eq!(authority.tenant(), "adfs");
    }

    #[test]
    fn test_rejects_http_and_missing_tenant() {
        assert!(Authority::new("http://login.microsoftonline.com/common").is_err());
        assert!(Authority::new("https://login.microsoftonline.com/").is_err());
        assert!(Authority::new("not a url").is_err());
    }

    #[test]
    fn test_with_host_and_tenant() {
        let authority = Authority::new("https://login.microsoftonline.com/common").unwrap();
        let moved = authority.with_host("Login.Windows.Net").with_tenant("tenant-id");
        assert_eq!(moved.canonical(), "https://login.windows.net/tenant-id/");
        assert_eq!(
            moved.authorize_endpoint(),
            "https://login.windows.net/tenant-id/oauth2/v2.0/authorize"
        );
    }

    #[test]
    fn test_authority_type_cache_str() {
        for kind in [AuthorityType::Aad, AuthorityType::Adfs, AuthorityType::B2C] {
            assert_eq!(AuthorityType::from_cache_str(kind.as_cache_str()), kind);
        }
        assert_eq!(AuthorityType::from_cache_str("unknown"), AuthorityType::Aad);
    }

    #[test]
    fn test_host_of() {
        assert_eq!(
            host_of("https://Login.Windows.Net/tenant/").as_deref(),
            Some("login.windows.net")
        );
        assert!(host_of("garbage").is_none());
    }
}
