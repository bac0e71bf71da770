//! `client_info` decoding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity of the user within their home tenant, as returned in `client_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Object id of the user in the home tenant.
    pub uid: String,
    /// Home tenant id.
    pub utid: String,
}

impl ClientInfo {
    /// Creates client info from its parts.
    #[must_use]
    pub fn new(uid: impl Into<String>, utid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            utid: utid.into(),
        }
    }

    /// Decodes the base64url JSON payload sent by the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not base64url JSON with `uid` and `utid`.
    pub fn decode(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidClientInfo("client info is empty".into()));
        }
        let bytes = decode_base64url(raw)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::InvalidClientInfo(format!("failed to parse client info: {e}")))
    }

    /// Encodes back into the wire representation.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing two strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Home account identifier: `<uid>.<utid>`.
    #[must_use]
    pub fn home_account_id(&self) -> String {
        format!("{}.{}", self.uid, self.utid)
    }
}

/// Decodes base64url, tolerating trailing padding.
pub(crate) fn decode_base64url(raw: &str) -> Result<Vec<u8>> {
    Ok(URL_SAFE_NO_PAD.decode(raw.trim_end_matches('='))?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let info = ClientInfo::new("uid-1", "utid-1");
        let decoded = ClientInfo::decode(&info.encode()).unwrap();
        assert_eq!(decoded, info);
        assert_eq!(decoded.home_account_id(), "uid-1.utid-1");
    }

    #[test]
    fn test_padded_input() {
        // {"uid":"a","utid":"b"} with standard padding appended
        let raw = format!("{}==", ClientInfo::new("a", "b").encode());
        assert_eq!(ClientInfo::decode(&raw).unwrap().home_account_id(), "a.b");
    }

    #[test]
    fn test_invalid_input() {
        assert!(ClientInfo::decode("").is_err());
        assert!(ClientInfo::decode("!!!").is_err());
        let not_json = URL_SAFE_NO_PAD.encode(b"plain");
        assert!(matches!(
            ClientInfo::decode(&not_json),
            Err(Error::InvalidClientInfo(_))
        ));
    }
}
