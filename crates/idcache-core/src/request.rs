//! Token request descriptor.

use idcache_oauth::{Authority, AuthorityType, UserAssertion};

use crate::entity::{Account, ScopeSet};
use crate::{Error, Result};

/// Everything the cache needs to know about a token request.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    client_id: String,
    authority: Authority,
    scopes: ScopeSet,
    account: Option<Account>,
    user_assertion: Option<UserAssertion>,
    is_client_credential: bool,
    force_refresh: bool,
    login_hint: Option<String>,
    extended_lifetime_enabled: bool,
    validate_authority: bool,
}

impl TokenRequest {
    /// Creates a request for `scopes` from `client_id` at `authority`.
    #[must_use]
    pub fn new(client_id: impl Into<String>, authority: Authority, scopes: ScopeSet) -> Self {
        Self {
            client_id: client_id.into(),
            authority,
            scopes,
            account: None,
            user_assertion: None,
            is_client_credential: false,
            force_refresh: false,
            login_hint: None,
            extended_lifetime_enabled: false,
            validate_authority: true,
        }
    }

    /// Sets the signed-in account the token is for.
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    /// Marks this as an on-behalf-of request for `assertion`.
    #[must_use]
    pub fn with_user_assertion(mut self, assertion: UserAssertion) -> Self {
        self.user_assertion = Some(assertion);
        self
    }

    /// Marks this as an app-only (client credential) request.
    #[must_use]
    pub const fn client_credential(mut self) -> Self {
        self.is_client_credential = true;
        self
    }

    /// Skips cached access tokens.
    #[must_use]
    pub const fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// Sets the login hint (displayable id) used to narrow legacy lookups.
    #[must_use]
    pub fn with_login_hint(mut self, login_hint: impl Into<String>) -> Self {
        self.login_hint = Some(login_hint.into());
        self
    }

    /// Allows serving tokens inside their extended lifetime window.
    #[must_use]
    pub const fn with_extended_lifetime(mut self, enabled: bool) -> Self {
        self.extended_lifetime_enabled = enabled;
        self
    }

    /// Whether a failed instance discovery should fail the request.
    #[must_use]
    pub const fn with_validate_authority(mut self, validate: bool) -> Self {
        self.validate_authority = validate;
        self
    }

    /// Client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Authority.
    #[must_use]
    pub const fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Requested scopes.
    #[must_use]
    pub const fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Account, if any.
    #[must_use]
    pub const fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// User assertion, if any.
    #[must_use]
    pub const fn user_assertion(&self) -> Option<&UserAssertion> {
        self.user_assertion.as_ref()
    }

    /// Whether this is an app-only request.
    #[must_use]
    pub const fn is_client_credential(&self) -> bool {
        self.is_client_credential
    }

    /// Whether cached access tokens are skipped.
    #[must_use]
    pub const fn force_refresh(&self) -> bool {
        self.force_refresh
    }

    /// Login hint, if any.
    #[must_use]
    pub fn login_hint(&self) -> Option<&str> {
        self.login_hint.as_deref()
    }

    /// Whether extended lifetime tokens may be served.
    #[must_use]
    pub const fn extended_lifetime_enabled(&self) -> bool {
        self.extended_lifetime_enabled
    }

    /// Whether instance discovery failures are fatal.
    #[must_use]
    pub const fn validate_authority(&self) -> bool {
        self.validate_authority
    }

    /// Returns true if the request's tokens belong in the legacy cache:
    /// a user token that is neither app-only, on-behalf-of, nor B2C.
    #[must_use]
    pub fn is_legacy_compatible(&self) -> bool {
        !self.is_client_credential
            && self.user_assertion.is_none()
            && self.authority.authority_type() != AuthorityType::B2C
    }

    /// Checks that the request is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the client id is empty.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::InvalidRequest("client_id is required".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(authority: &str) -> TokenRequest {
        TokenRequest::new(
            "client",
            Authority::new(authority).unwrap(),
            ScopeSet::parse("r1/scope1"),
        )
    }

    #[test]
    fn test_legacy_compatibility() {
        assert!(request("https://login.microsoftonline.com/tenant").is_legacy_compatible());
        assert!(!request("https://login.microsoftonline.com/tenant")
            .client_credential()
            .is_legacy_compatible());
        assert!(!request("https://login.microsoftonline.com/tenant")
            .with_user_assertion(UserAssertion::new("jwt"))
            .is_legacy_compatible());
        assert!(!request("https://login.microsoftonline.com/tfp/tenant/b2c_1_signin")
            .is_legacy_compatible());
    }

    #[test]
    fn test_validate_requires_client_id() {
        let req = TokenRequest::new(
            " ",
            Authority::new("https://login.microsoftonline.com/tenant").unwrap(),
            ScopeSet::new(),
        );
        assert!(matches!(req.validate(), Err(Error::InvalidRequest(_))));
        assert!(request("https://login.microsoftonline.com/tenant").validate().is_ok());
    }
}
