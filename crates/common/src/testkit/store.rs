use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;

use super::events::{Event, EventLog};
use crate::store::{iso_now, ContentStore, FileMetadata, LocalFile, StoreError};

#[derive(Debug, Default)]
struct MemoryStoreInner {
    files: Vec<(FileMetadata, Bytes)>,
    unavailable: bool,
}

/// Pinning service kept in memory; cids are computed from content
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    events: EventLog,
}

impl MemoryStore {
    pub fn new(events: EventLog) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStoreInner::default())),
            events,
        }
    }

    /// Make every call fail as if the service were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unavailable = unavailable;
    }

    /// Number of stored items, regardless of availability
    pub fn len(&self) -> usize {
        self.inner.lock().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().files.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.inner.lock().unavailable {
            return Err(StoreError::HttpStatus(
                StatusCode::SERVICE_UNAVAILABLE,
                "service unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn store(&self, file: &LocalFile, owner: &str) -> Result<FileMetadata, StoreError> {
        self.check_available()?;
        let cid = self.content_id(file)?;
        let metadata = FileMetadata {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size(),
            upload_date: iso_now(),
            owner: owner.to_string(),
            cid: cid.clone(),
        };

        {
            let mut inner = self.inner.lock();
            // pinning the same content again replaces the pin
            inner.files.retain(|(m, _)| m.cid != cid);
            inner.files.push((metadata.clone(), file.bytes.clone()));
        }
        self.events.push(Event::Stored { cid });
        Ok(metadata)
    }

    async fn try_list(&self) -> Result<Vec<FileMetadata>, StoreError> {
        self.check_available()?;
        Ok(self
            .inner
            .lock()
            .files
            .iter()
            .map(|(m, _)| m.clone())
            .collect())
    }

    async fn verify(&self, cid: &str) -> bool {
        if self.check_available().is_err() {
            return false;
        }
        self.inner.lock().files.iter().any(|(m, _)| m.cid == cid)
    }

    async fn download(&self, cid: &str) -> Result<Bytes, StoreError> {
        self.check_available()?;
        let bytes = self
            .inner
            .lock()
            .files
            .iter()
            .find(|(m, _)| m.cid == cid)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| StoreError::HttpStatus(StatusCode::NOT_FOUND, format!("{} not found", cid)))?;
        self.events.push(Event::Fetched {
            cid: cid.to_string(),
        });
        Ok(bytes)
    }
}
