//! Content-addressed storage behind a pinning service.

mod gateway;
mod pinata;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use cid::multihash::Multihash;
use cid::Cid;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use gateway::{Gateway, GatewayError, DWEB_LINK};
pub use pinata::{PinataConfig, PinataStore, DEFAULT_PINATA_API_URL};

use crate::error::{Classify, ErrorKind};

/// multicodec `raw`
const RAW_CODEC: u64 = 0x55;
/// multihash `sha2-256`
const SHA2_256_CODE: u64 = 0x12;

/// CIDv1 (raw codec, sha2-256) of a single block of content.
///
/// This is the identifier the pinning service assigns to content that fits
/// in one block when asked for CIDv1 with raw leaves; larger content gets a
/// chunked DAG root instead.
pub fn content_id(bytes: &[u8]) -> Result<Cid, StoreError> {
    let digest = Sha256::digest(bytes);
    let hash = Multihash::<64>::wrap(SHA2_256_CODE, &digest)
        .map_err(|e| StoreError::InvalidCid(e.to_string()))?;
    Ok(Cid::new_v1(RAW_CODEC, hash))
}

/// Current time as ISO-8601 with millisecond precision
pub(crate) fn iso_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Metadata of one stored file. The store is the source of truth; the client
/// never edits a record, it only re-fetches the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    /// ISO-8601
    pub upload_date: String,
    pub owner: String,
    pub cid: String,
}

/// A local file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Build from raw bytes, guessing the mime type from the file name
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .to_string();
        Self::new(name, mime_type, bytes)
    }

    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("missing pinning service token")]
    MissingToken,
    #[error("HTTP request failed: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Backend message kept verbatim for diagnostics
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("invalid content identifier: {0}")]
    InvalidCid(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Classify for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::MissingToken | StoreError::Reqwest(_) | StoreError::HttpStatus(..) => {
                ErrorKind::StoreUnavailable
            }
            _ => ErrorKind::Unknown,
        }
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    /// Identifier for `file` computed before upload, used to register the
    ///  content on the ledger ahead of storing it
    fn content_id(&self, file: &LocalFile) -> Result<String, StoreError> {
        Ok(content_id(&file.bytes)?.to_string())
    }

    /// Upload content plus its metadata envelope; returns the assigned cid
    async fn store(&self, file: &LocalFile, owner: &str) -> Result<FileMetadata, StoreError>;

    async fn try_list(&self) -> Result<Vec<FileMetadata>, StoreError>;

    /// Every stored item; an unreachable or misbehaving store yields an empty list
    async fn list(&self) -> Vec<FileMetadata> {
        match self.try_list().await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("error listing files: {}", e);
                Vec::new()
            }
        }
    }

    /// Existence check; `false` on any failure
    async fn verify(&self, cid: &str) -> bool;

    /// Fetch content through the public gateway
    async fn download(&self, cid: &str) -> Result<Bytes, StoreError>;
}
