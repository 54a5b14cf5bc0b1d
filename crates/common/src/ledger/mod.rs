//! On-chain file registry: records uploads and downloads as transactions.
//!
//! Mutating calls return a [`PendingTx`]. Submission and confirmation are
//! distinct: a caller must pass the handle to [`Ledger::confirm`] before it
//! treats the action as durable.

pub mod abi;
mod evm;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use abi::AbiError;
pub use evm::{EvmLedger, EvmLedgerConfig, DEFAULT_CHAIN_ID, DEFAULT_CONTRACT_ADDRESS};

use crate::error::{Classify, ErrorKind};
use crate::rpc::RpcError;
use crate::wallet::Signer;

/// JSON-RPC code nodes use for a reverted `eth_call`
pub const EXECUTION_REVERTED_CODE: i64 = 3;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("provider not connected")]
    NotConnected,
    #[error("transaction cancelled by user")]
    UserRejected,
    #[error("ledger provider unreachable: {0}")]
    Unreachable(RpcError),
    #[error("wrong chain: expected {expected}, provider is on {actual}")]
    WrongChain { expected: u64, actual: u64 },
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("transaction {hash} not confirmed within {timeout:?}")]
    ConfirmationTimeout { hash: String, timeout: Duration },
    #[error("file not registered on the ledger: {0}")]
    NotFound(String),
    #[error("ABI error: {0}")]
    Abi(#[from] AbiError),
    #[error("ledger rpc error: {0}")]
    Rpc(RpcError),
}

impl From<RpcError> for LedgerError {
    fn from(err: RpcError) -> Self {
        match err {
            e if e.is_user_rejection() => LedgerError::UserRejected,
            e if e.is_transport() => LedgerError::Unreachable(e),
            RpcError::Rpc { code, message } if code == EXECUTION_REVERTED_CODE => {
                LedgerError::Reverted(message)
            }
            e => LedgerError::Rpc(e),
        }
    }
}

impl Classify for LedgerError {
    fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotConnected => ErrorKind::ProviderNotConnected,
            LedgerError::UserRejected => ErrorKind::UserRejected,
            LedgerError::Unreachable(_) => ErrorKind::ProviderUnavailable,
            _ => ErrorKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerAction {
    RegisterUpload { cid: String },
    RegisterDownload { cid: String },
}

/// A submitted, not yet confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTx {
    pub hash: String,
    pub action: LedgerAction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// A file entry as stored by the registry contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub cid: String,
    pub name: String,
    pub file_type: String,
    pub size: u64,
    pub uploader: String,
    /// unix seconds
    pub timestamp: u64,
    pub download_count: u64,
}

#[async_trait]
pub trait Ledger: Send + Sync + std::fmt::Debug {
    async fn register_upload(
        &self,
        signer: Option<&Signer>,
        cid: &str,
        name: &str,
        file_type: &str,
        size: u64,
    ) -> Result<PendingTx, LedgerError>;

    async fn register_download(
        &self,
        signer: Option<&Signer>,
        cid: &str,
    ) -> Result<PendingTx, LedgerError>;

    /// Wait until the transaction is final
    async fn confirm(&self, tx: &PendingTx) -> Result<Receipt, LedgerError>;

    async fn get_file_by_cid(&self, cid: &str) -> Result<FileRecord, LedgerError>;

    async fn get_files_batch(&self, offset: u64, limit: u64)
        -> Result<Vec<FileRecord>, LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_rpc_errors_map_to_ledger_kinds() {
        let rejected: LedgerError = RpcError::Rpc {
            code: crate::rpc::USER_REJECTED_CODE,
            message: "MetaMask Tx Signature: User denied transaction signature.".into(),
        }
        .into();
        assert_eq!(rejected.kind(), ErrorKind::UserRejected);

        let reverted: LedgerError = RpcError::Rpc {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted: File not found".into(),
        }
        .into();
        assert!(matches!(reverted, LedgerError::Reverted(_)));
        assert_eq!(reverted.kind(), ErrorKind::Unknown);

        let down: LedgerError =
            RpcError::HttpStatus(StatusCode::BAD_GATEWAY, "upstream".into()).into();
        assert_eq!(down.kind(), ErrorKind::ProviderUnavailable);

        assert_eq!(
            LedgerError::NotConnected.kind(),
            ErrorKind::ProviderNotConnected
        );
    }
}
