//! Error classification shared by every adapter.
//!
//! Adapters attach an [`ErrorKind`] to their errors at the boundary so that
//! callers branch on the kind rather than on message text.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No wallet provider is available (not configured or unreachable)
    ProviderUnavailable,
    /// The user explicitly refused a signature or account prompt
    UserRejected,
    /// A ledger call was attempted without a connected, signer-capable session
    ProviderNotConnected,
    /// Transport or auth failure talking to the content store or gateway
    StoreUnavailable,
    /// Anything else
    Unknown,
}

impl ErrorKind {
    /// Text shown to the user when no more specific message is available
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::ProviderUnavailable => "Please install MetaMask or another Web3 wallet!",
            ErrorKind::UserRejected => "Transaction cancelled",
            ErrorKind::ProviderNotConnected => "Provider not connected",
            ErrorKind::StoreUnavailable => "Content store unavailable",
            ErrorKind::Unknown => "Unknown error",
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ErrorKind::UserRejected)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ProviderUnavailable => "provider unavailable",
            ErrorKind::UserRejected => "user rejected",
            ErrorKind::ProviderNotConnected => "provider not connected",
            ErrorKind::StoreUnavailable => "store unavailable",
            ErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Implemented by every adapter error so the orchestrator can classify it
pub trait Classify {
    fn kind(&self) -> ErrorKind;
}
