use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a connected session requires a non-empty address")]
    EmptyAddress,
    #[error("a disconnected session must not carry an address")]
    DanglingAddress,
}

/// The client's record of wallet connection status and active account.
///
/// `address` is non-empty if and only if the session is connected. The only
/// way to build one is through [`WalletSession::disconnected`] and
/// [`WalletSession::connected`], and deserialisation re-checks the invariant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "PersistedSession", into = "PersistedSession")]
pub struct WalletSession {
    address: Option<String>,
}

impl WalletSession {
    pub fn disconnected() -> Self {
        Self { address: None }
    }

    /// Build a connected session; the address is trimmed and lowercased
    pub fn connected(address: impl AsRef<str>) -> Result<Self, SessionError> {
        let address = address.as_ref().trim().to_lowercase();
        if address.is_empty() {
            return Err(SessionError::EmptyAddress);
        }
        Ok(Self {
            address: Some(address),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// Active account, empty when disconnected
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or("")
    }

    /// Handle usable to sign transactions, present only while connected
    pub fn signer(&self) -> Option<Signer> {
        self.address.as_ref().map(|address| Signer {
            address: address.clone(),
        })
    }

    /// Case-insensitive ownership check against a stored owner field
    pub fn owns(&self, owner: &str) -> bool {
        match &self.address {
            Some(address) => address.eq_ignore_ascii_case(owner.trim()),
            None => false,
        }
    }
}

/// Signing capability handed to the ledger for mutating calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signer {
    address: String,
}

impl Signer {
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// On-disk shape of a session, kept compatible with the browser storage layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedSession {
    is_connected: bool,
    #[serde(default)]
    address: String,
}

impl TryFrom<PersistedSession> for WalletSession {
    type Error = SessionError;

    fn try_from(value: PersistedSession) -> Result<Self, Self::Error> {
        match (value.is_connected, value.address.trim().is_empty()) {
            (true, false) => WalletSession::connected(&value.address),
            (false, true) => Ok(WalletSession::disconnected()),
            (true, true) => Err(SessionError::EmptyAddress),
            (false, false) => Err(SessionError::DanglingAddress),
        }
    }
}

impl From<WalletSession> for PersistedSession {
    fn from(value: WalletSession) -> Self {
        Self {
            is_connected: value.is_connected(),
            address: value.address.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_normalizes_address() {
        let session = WalletSession::connected("  0xABCdef0000000000000000000000000000000001 ").unwrap();
        assert!(session.is_connected());
        assert_eq!(session.address(), "0xabcdef0000000000000000000000000000000001");
    }

    #[test]
    fn test_empty_address_cannot_connect() {
        assert_eq!(
            WalletSession::connected("   ").unwrap_err(),
            SessionError::EmptyAddress
        );
    }

    #[test]
    fn test_disconnected_has_no_address_or_signer() {
        let session = WalletSession::disconnected();
        assert!(!session.is_connected());
        assert_eq!(session.address(), "");
        assert!(session.signer().is_none());
    }

    #[test]
    fn test_persisted_shape() {
        let session = WalletSession::connected("0xabc1").unwrap();
        let json = serde_json::to_string(&session).unwrap();
        assert_eq!(json, r#"{"isConnected":true,"address":"0xabc1"}"#);

        let json = serde_json::to_string(&WalletSession::disconnected()).unwrap();
        assert_eq!(json, r#"{"isConnected":false,"address":""}"#);
    }

    #[test]
    fn test_deserialize_rejects_broken_invariant() {
        assert!(serde_json::from_str::<WalletSession>(r#"{"isConnected":true,"address":""}"#).is_err());
        assert!(
            serde_json::from_str::<WalletSession>(r#"{"isConnected":false,"address":"0xabc"}"#)
                .is_err()
        );
        let restored: WalletSession =
            serde_json::from_str(r#"{"isConnected":true,"address":"0xABC"}"#).unwrap();
        assert_eq!(restored.address(), "0xabc");
    }

    #[test]
    fn test_owns_is_case_insensitive() {
        let session = WalletSession::connected("0xAbC").unwrap();
        assert!(session.owns("0xABC"));
        assert!(!session.owns("0xabd"));
        assert!(!WalletSession::disconnected().owns(""));
    }
}
