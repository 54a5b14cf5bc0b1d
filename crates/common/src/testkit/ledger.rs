use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::events::{Event, EventLog};
use crate::ledger::{FileRecord, Ledger, LedgerAction, LedgerError, PendingTx, Receipt};
use crate::wallet::Signer;

#[derive(Debug, Default)]
struct MemoryLedgerInner {
    /// registry in insertion order
    records: Vec<FileRecord>,
    pending: HashMap<String, PendingEntry>,
    nonce: u64,
    block: u64,
    reject: bool,
    revert: bool,
    confirm_delay: Option<Duration>,
}

#[derive(Debug, Clone)]
enum PendingEntry {
    Upload(FileRecord),
    Download(String),
}

/// Registry contract kept in memory. Transactions take effect on `confirm`.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<Mutex<MemoryLedgerInner>>,
    events: EventLog,
}

impl MemoryLedger {
    pub fn new(events: EventLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryLedgerInner::default())),
            events,
        }
    }

    /// Reject the next submissions as if the user declined to sign
    pub fn set_reject(&self, reject: bool) {
        self.inner.lock().reject = reject;
    }

    /// Mined but reverted
    pub fn set_revert(&self, revert: bool) {
        self.inner.lock().revert = revert;
    }

    /// Simulated time to finality
    pub fn set_confirm_delay(&self, delay: Duration) {
        self.inner.lock().confirm_delay = Some(delay);
    }

    pub fn records(&self) -> Vec<FileRecord> {
        self.inner.lock().records.clone()
    }

    fn submit(&self, signer: Option<&Signer>, entry: PendingEntry) -> Result<PendingTx, LedgerError> {
        if signer.is_none() {
            return Err(LedgerError::NotConnected);
        }
        let mut inner = self.inner.lock();
        if inner.reject {
            return Err(LedgerError::UserRejected);
        }
        inner.nonce += 1;
        let hash = format!("0x{:064x}", inner.nonce);
        let action = match &entry {
            PendingEntry::Upload(record) => LedgerAction::RegisterUpload {
                cid: record.cid.clone(),
            },
            PendingEntry::Download(cid) => LedgerAction::RegisterDownload { cid: cid.clone() },
        };
        inner.pending.insert(hash.clone(), entry);
        drop(inner);

        self.events.push(Event::LedgerSubmitted { hash: hash.clone() });
        Ok(PendingTx { hash, action })
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn register_upload(
        &self,
        signer: Option<&Signer>,
        cid: &str,
        name: &str,
        file_type: &str,
        size: u64,
    ) -> Result<PendingTx, LedgerError> {
        let record = FileRecord {
            cid: cid.to_string(),
            name: name.to_string(),
            file_type: file_type.to_string(),
            size,
            uploader: signer.map(|s| s.address().to_string()).unwrap_or_default(),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
            download_count: 0,
        };
        self.submit(signer, PendingEntry::Upload(record))
    }

    async fn register_download(
        &self,
        signer: Option<&Signer>,
        cid: &str,
    ) -> Result<PendingTx, LedgerError> {
        if signer.is_some() && !self.inner.lock().records.iter().any(|r| r.cid == cid) {
            return Err(LedgerError::Reverted("File not found".to_string()));
        }
        self.submit(signer, PendingEntry::Download(cid.to_string()))
    }

    async fn confirm(&self, tx: &PendingTx) -> Result<Receipt, LedgerError> {
        let delay = self.inner.lock().confirm_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock();
        let entry = inner
            .pending
            .remove(&tx.hash)
            .ok_or_else(|| LedgerError::NotFound(tx.hash.clone()))?;
        if inner.revert {
            return Err(LedgerError::Reverted(format!("transaction {} reverted", tx.hash)));
        }
        match entry {
            PendingEntry::Upload(record) => {
                inner.records.retain(|r| r.cid != record.cid);
                inner.records.push(record);
            }
            PendingEntry::Download(cid) => {
                if let Some(record) = inner.records.iter_mut().find(|r| r.cid == cid) {
                    record.download_count += 1;
                }
            }
        }
        inner.block += 1;
        let block_number = Some(inner.block);
        drop(inner);

        self.events.push(Event::LedgerConfirmed {
            hash: tx.hash.clone(),
        });
        Ok(Receipt {
            tx_hash: tx.hash.clone(),
            block_number,
        })
    }

    async fn get_file_by_cid(&self, cid: &str) -> Result<FileRecord, LedgerError> {
        self.inner
            .lock()
            .records
            .iter()
            .find(|r| r.cid == cid)
            .cloned()
            .ok_or_else(|| LedgerError::NotFound(cid.to_string()))
    }

    async fn get_files_batch(&self, offset: u64, limit: u64) -> Result<Vec<FileRecord>, LedgerError> {
        let inner = self.inner.lock();
        Ok(inner
            .records
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
