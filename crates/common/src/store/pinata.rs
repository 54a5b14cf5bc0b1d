use async_trait::async_trait;
use bytes::Bytes;
use cid::Cid;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use super::gateway::{Gateway, GatewayError};
use super::{iso_now, ContentStore, FileMetadata, LocalFile, StoreError};

pub const DEFAULT_PINATA_API_URL: &str = "https://api.pinata.cloud";

/// Largest page the pin list endpoint serves
const PIN_LIST_PAGE_LIMIT: &str = "1000";

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct PinataConfig {
    pub api_url: Url,
    /// Bearer token; without it uploads fail and listing comes back empty
    pub jwt: Option<String>,
    pub gateway: Gateway,
}

/// Pinata-compatible pinning API client
#[derive(Debug, Clone)]
pub struct PinataStore {
    client: Client,
    api_url: Url,
    jwt: Option<String>,
    gateway: Gateway,
}

#[derive(Serialize)]
struct PinataMetadata<'a> {
    name: &'a str,
    keyvalues: KeyValues<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyValues<'a> {
    #[serde(rename = "type")]
    mime_type: &'a str,
    size: u64,
    upload_date: &'a str,
    owner: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinataOptions {
    cid_version: u8,
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

#[derive(Deserialize)]
struct PinListResponse {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    rows: Vec<PinRow>,
}

#[derive(Deserialize)]
struct PinRow {
    #[serde(default)]
    ipfs_pin_hash: Option<String>,
    #[serde(default)]
    metadata: Option<PinRowMetadata>,
}

#[derive(Deserialize, Default)]
struct PinRowMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    keyvalues: Option<Map<String, Value>>,
}

impl From<GatewayError> for StoreError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidCid(cid, reason) => {
                StoreError::InvalidCid(format!("{}: {}", cid, reason))
            }
            GatewayError::UrlParse(e) => StoreError::UrlParse(e),
        }
    }
}

impl PinataStore {
    pub fn new(config: PinataConfig) -> Result<Self, StoreError> {
        let mut api_url = config.api_url;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            client: Client::builder().build()?,
            api_url,
            jwt: config.jwt.filter(|t| !t.trim().is_empty()),
            gateway: config.gateway,
        })
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let jwt = self.jwt.as_deref().ok_or(StoreError::MissingToken)?;
        Ok(request.bearer_auth(jwt))
    }

    async fn pin_list(&self, query: &[(&str, &str)]) -> Result<PinListResponse, StoreError> {
        let url = self.api_url.join("data/pinList")?;
        let request = self.authorized(self.client.get(url).query(query))?;
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(StoreError::HttpStatus(
            response.status(),
            response.text().await?,
        ))
    }
}

/// Sizes arrive as numbers or numeric strings depending on who wrote them
fn parse_size(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        _ => 0,
    }
}

fn string_field(keyvalues: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    keyvalues
        .and_then(|kv| kv.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn map_row(row: PinRow, now: &str) -> Option<FileMetadata> {
    let cid = row.ipfs_pin_hash.filter(|h| !h.is_empty())?;
    let metadata = row.metadata.unwrap_or_default();
    let keyvalues = metadata.keyvalues.as_ref();

    Some(FileMetadata {
        name: metadata
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        mime_type: string_field(keyvalues, "type").unwrap_or_else(|| UNKNOWN.to_string()),
        size: parse_size(keyvalues.and_then(|kv| kv.get("size"))),
        upload_date: string_field(keyvalues, "uploadDate").unwrap_or_else(|| now.to_string()),
        owner: string_field(keyvalues, "owner").unwrap_or_else(|| UNKNOWN.to_string()),
        cid,
    })
}

#[async_trait]
impl ContentStore for PinataStore {
    async fn store(&self, file: &LocalFile, owner: &str) -> Result<FileMetadata, StoreError> {
        tracing::info!(name = %file.name, size = file.size(), "uploading file to pinning service");

        let upload_date = iso_now();
        let metadata = PinataMetadata {
            name: &file.name,
            keyvalues: KeyValues {
                mime_type: &file.mime_type,
                size: file.size(),
                upload_date: &upload_date,
                owner,
            },
        };

        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", serde_json::to_string(&metadata)?)
            .text(
                "pinataOptions",
                serde_json::to_string(&PinataOptions { cid_version: 1 })?,
            );

        let url = self.api_url.join("pinning/pinFileToIPFS")?;
        let request = self.authorized(self.client.post(url).multipart(form))?;
        let response = ensure_success(request.send().await?).await?;
        let pinned: PinResponse = response.json().await?;

        Cid::try_from(pinned.ipfs_hash.as_str())
            .map_err(|e| StoreError::InvalidCid(format!("{}: {}", pinned.ipfs_hash, e)))?;
        tracing::info!(cid = %pinned.ipfs_hash, "file pinned");

        Ok(FileMetadata {
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size: file.size(),
            upload_date,
            owner: owner.to_string(),
            cid: pinned.ipfs_hash,
        })
    }

    async fn try_list(&self) -> Result<Vec<FileMetadata>, StoreError> {
        let response = self
            .pin_list(&[("status", "pinned"), ("pageLimit", PIN_LIST_PAGE_LIMIT)])
            .await?;
        let now = iso_now();
        let files: Vec<FileMetadata> = response
            .rows
            .into_iter()
            .filter_map(|row| map_row(row, &now))
            .collect();
        tracing::debug!(count = files.len(), "listed pinned files");
        Ok(files)
    }

    async fn verify(&self, cid: &str) -> bool {
        match self.pin_list(&[("hashContains", cid)]).await {
            Ok(response) => response.count > 0,
            Err(e) => {
                tracing::warn!(cid, "error verifying upload: {}", e);
                false
            }
        }
    }

    async fn download(&self, cid: &str) -> Result<Bytes, StoreError> {
        let url = self.gateway.url_for(cid)?;
        tracing::info!(%url, "fetching content from gateway");
        let response = ensure_success(self.client.get(url).send().await?).await?;
        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> PinRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_map_row_full() {
        let meta = map_row(
            row(json!({
                "ipfs_pin_hash": "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
                "metadata": {
                    "name": "demo.txt",
                    "keyvalues": {
                        "type": "text/plain",
                        "size": 2048,
                        "uploadDate": "2024-05-01T10:00:00.000Z",
                        "owner": "0xAbC"
                    }
                }
            })),
            "now",
        )
        .unwrap();

        assert_eq!(meta.name, "demo.txt");
        assert_eq!(meta.mime_type, "text/plain");
        assert_eq!(meta.size, 2048);
        assert_eq!(meta.upload_date, "2024-05-01T10:00:00.000Z");
        assert_eq!(meta.owner, "0xAbC");
    }

    #[test]
    fn test_map_row_defaults() {
        let meta = map_row(
            row(json!({
                "ipfs_pin_hash": "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG",
                "metadata": { "name": null, "keyvalues": null }
            })),
            "2024-01-01T00:00:00.000Z",
        )
        .unwrap();

        assert_eq!(meta.name, "Unknown");
        assert_eq!(meta.mime_type, "Unknown");
        assert_eq!(meta.size, 0);
        assert_eq!(meta.upload_date, "2024-01-01T00:00:00.000Z");
        assert_eq!(meta.owner, "Unknown");
    }

    #[test]
    fn test_map_row_without_hash_is_skipped() {
        assert!(map_row(row(json!({ "metadata": { "name": "x" } })), "now").is_none());
    }

    #[test]
    fn test_parse_size_variants() {
        assert_eq!(parse_size(Some(&json!(2048))), 2048);
        assert_eq!(parse_size(Some(&json!("2048"))), 2048);
        assert_eq!(parse_size(Some(&json!("12.7"))), 12);
        assert_eq!(parse_size(Some(&json!("big"))), 0);
        assert_eq!(parse_size(Some(&json!(-5))), 0);
        assert_eq!(parse_size(None), 0);
    }

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let store = PinataStore::new(PinataConfig {
            api_url: Url::parse("http://localhost:9999/pinata").unwrap(),
            jwt: Some("  ".into()),
            gateway: Gateway::default(),
        })
        .unwrap();
        assert_eq!(store.api_url.as_str(), "http://localhost:9999/pinata/");
        // blank tokens count as missing
        assert!(store.jwt.is_none());
    }
}
