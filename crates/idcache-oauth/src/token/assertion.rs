//! User assertions for the on-behalf-of flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use sha2::{Digest, Sha256};

/// Default assertion type for on-behalf-of requests.
pub const JWT_BEARER_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Incoming user token exchanged by a middle-tier service.
#[derive(Clone, PartialEq, Eq)]
pub struct UserAssertion {
    assertion: String,
    assertion_type: String,
    hash: String,
}

impl UserAssertion {
    /// Creates a JWT bearer assertion.
    #[must_use]
    pub fn new(assertion: impl Into<String>) -> Self {
        Self::with_type(assertion, JWT_BEARER_ASSERTION_TYPE)
    }

    /// Creates an assertion of a specific type.
    #[must_use]
    pub fn with_type(assertion: impl Into<String>, assertion_type: impl Into<String>) -> Self {
        let assertion = assertion.into();
        let hash = hash_assertion(&assertion);
        Self {
            assertion,
            assertion_type: assertion_type.into(),
            hash,
        }
    }

    /// The raw assertion.
    #[must_use]
    pub fn assertion(&self) -> &str {
        &self.assertion
    }

    /// Assertion type URN.
    #[must_use]
    pub fn assertion_type(&self) -> &str {
        &self.assertion_type
    }

    /// `base64url(sha256(assertion))`, the value stored as `user_assertion_hash`.
    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Debug for UserAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAssertion")
            .field("assertion_type", &self.assertion_type)
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

fn hash_assertion(assertion: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(assertion.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        let a = UserAssertion::new("token");
        let b = UserAssertion::new("token");
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), UserAssertion::new("other").hash());
        // sha256 digest is 32 bytes -> 43 base64url chars without padding
        assert_eq!(a.hash().len(), 43);
        assert_eq!(a.assertion_type(), JWT_BEARER_ASSERTION_TYPE);
    }

    #[test]
    fn test_debug_hides_assertion() {
        let a = UserAssertion::new("super-secret");
        assert!(!format!("{a:?}").contains("super-secret"));
    }
}
