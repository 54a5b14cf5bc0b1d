use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::abi::{self, Token};
use super::{FileRecord, Ledger, LedgerAction, LedgerError, PendingTx, Receipt};
use crate::rpc::{parse_quantity, RpcClient};
use crate::wallet::Signer;

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x55191Fa9c937E97759F1cef854F331F84040406e";
/// Arbitrum Sepolia
pub const DEFAULT_CHAIN_ID: u64 = 421614;

#[derive(Debug, Clone)]
pub struct EvmLedgerConfig {
    pub rpc_url: Url,
    pub contract_address: String,
    pub chain_id: u64,
    pub confirmation_timeout: Duration,
    pub receipt_poll: Duration,
}

/// The registry contract, driven through the wallet's JSON-RPC endpoint.
///
/// Transactions go out with `eth_sendTransaction` so the wallet does the
/// signing; confirmation polls for the receipt.
#[derive(Debug)]
pub struct EvmLedger {
    rpc: RpcClient,
    contract: String,
    chain_id: u64,
    confirmation_timeout: Duration,
    receipt_poll: Duration,
    chain_verified: AtomicBool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl EvmLedger {
    pub fn new(config: EvmLedgerConfig) -> Result<Self, LedgerError> {
        let contract = abi::parse_address(&config.contract_address)?;
        Ok(Self {
            rpc: RpcClient::new(&config.rpc_url)?,
            contract: format!("0x{}", hex::encode(contract)),
            chain_id: config.chain_id,
            confirmation_timeout: config.confirmation_timeout,
            receipt_poll: config.receipt_poll,
            chain_verified: AtomicBool::new(false),
        })
    }

    async fn ensure_chain(&self) -> Result<(), LedgerError> {
        if self.chain_verified.load(Ordering::Acquire) {
            return Ok(());
        }
        let raw: String = self.rpc.call("eth_chainId", json!([])).await?;
        let actual = parse_quantity(&raw)? as u64;
        if actual != self.chain_id {
            return Err(LedgerError::WrongChain {
                expected: self.chain_id,
                actual,
            });
        }
        self.chain_verified.store(true, Ordering::Release);
        Ok(())
    }

    async fn send(&self, signer: &Signer, data: Vec<u8>) -> Result<String, LedgerError> {
        self.ensure_chain().await?;
        let tx = json!({
            "from": signer.address(),
            "to": self.contract,
            "data": format!("0x{}", hex::encode(data)),
        });
        let hash: String = self.rpc.call("eth_sendTransaction", json!([tx])).await?;
        tracing::info!(tx_hash = %hash, from = signer.address(), "ledger transaction submitted");
        Ok(hash)
    }

    async fn call(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let request = json!({
            "to": self.contract,
            "data": format!("0x{}", hex::encode(data)),
        });
        let raw: String = self.rpc.call("eth_call", json!([request, "latest"])).await?;
        Ok(abi::decode_hex(&raw)?)
    }
}

#[async_trait]
impl Ledger for EvmLedger {
    async fn register_upload(
        &self,
        signer: Option<&Signer>,
        cid: &str,
        name: &str,
        file_type: &str,
        size: u64,
    ) -> Result<PendingTx, LedgerError> {
        let signer = signer.ok_or(LedgerError::NotConnected)?;
        let data = abi::encode_call(
            abi::REGISTER_UPLOAD,
            &[
                Token::String(cid.to_string()),
                Token::String(name.to_string()),
                Token::String(file_type.to_string()),
                Token::Uint(size as u128),
            ],
        );
        let hash = self.send(signer, data).await?;
        Ok(PendingTx {
            hash,
            action: LedgerAction::RegisterUpload {
                cid: cid.to_string(),
            },
        })
    }

    async fn register_download(
        &self,
        signer: Option<&Signer>,
        cid: &str,
    ) -> Result<PendingTx, LedgerError> {
        let signer = signer.ok_or(LedgerError::NotConnected)?;
        let data = abi::encode_call(abi::REGISTER_DOWNLOAD, &[Token::String(cid.to_string())]);
        let hash = self.send(signer, data).await?;
        Ok(PendingTx {
            hash,
            action: LedgerAction::RegisterDownload {
                cid: cid.to_string(),
            },
        })
    }

    async fn confirm(&self, tx: &PendingTx) -> Result<Receipt, LedgerError> {
        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;

        loop {
            let polled: Result<Option<RawReceipt>, LedgerError> = self
                .rpc
                .call("eth_getTransactionReceipt", json!([tx.hash]))
                .await
                .map_err(LedgerError::from);
            let receipt = match polled {
                Ok(receipt) => receipt,
                // the transaction is already submitted; keep polling through outages
                Err(LedgerError::Unreachable(e)) => {
                    tracing::warn!(tx_hash = %tx.hash, "receipt poll failed, retrying: {}", e);
                    None
                }
                Err(e) => return Err(e),
            };

            if let Some(receipt) = receipt {
                let status = receipt.status.as_deref().map(parse_quantity).transpose()?;
                if status == Some(0) {
                    return Err(LedgerError::Reverted(format!(
                        "transaction {} reverted",
                        receipt.transaction_hash
                    )));
                }
                let block_number = receipt
                    .block_number
                    .as_deref()
                    .map(parse_quantity)
                    .transpose()?
                    .map(|n| n as u64);
                tracing::info!(tx_hash = %receipt.transaction_hash, ?block_number, "ledger transaction confirmed");
                return Ok(Receipt {
                    tx_hash: receipt.transaction_hash,
                    block_number,
                });
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    hash: tx.hash.clone(),
                    timeout: self.confirmation_timeout,
                });
            }
            tokio::time::sleep(self.receipt_poll).await;
        }
    }

    async fn get_file_by_cid(&self, cid: &str) -> Result<FileRecord, LedgerError> {
        let data = abi::encode_call(abi::GET_FILE_BY_CID, &[Token::String(cid.to_string())]);
        let record = abi::decode_record(&self.call(data).await?)?;
        // unknown keys come back as a zeroed struct
        if record.cid.is_empty() {
            return Err(LedgerError::NotFound(cid.to_string()));
        }
        Ok(record)
    }

    async fn get_files_batch(
        &self,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<FileRecord>, LedgerError> {
        let data = abi::encode_call(
            abi::GET_FILES_BATCH,
            &[Token::Uint(offset as u128), Token::Uint(limit as u128)],
        );
        Ok(abi::decode_records(&self.call(data).await?)?)
    }
}
