use std::path::PathBuf;

use clap::Args;
use common::catalog::{find_by_cid, format_size};
use common::orchestrator::{DownloadOutcome, Failure};

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct Download {
    #[arg(long)]
    pub cid: String,

    /// Output path (default: the stored file name in the current directory)
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Services(#[from] ServicesError),
    #[error("failed to write {0}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("{0}")]
    Rejected(&'static str),
    #[error("Transaction cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(Failure),
}

#[async_trait::async_trait]
impl crate::op::Op for Download {
    type Error = DownloadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let orchestrator = &services.orchestrator;

        let bytes = match orchestrator.download(&self.cid).await {
            DownloadOutcome::Fetched { bytes, .. } => bytes,
            DownloadOutcome::Rejected(message) => return Err(DownloadError::Rejected(message)),
            DownloadOutcome::Cancelled => return Err(DownloadError::Cancelled),
            DownloadOutcome::Failed(failure) => return Err(DownloadError::Failed(failure)),
        };

        let out = match &self.out {
            Some(path) => path.clone(),
            None => {
                let files = orchestrator.refresh().await;
                let name = find_by_cid(&files, &self.cid)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| self.cid.clone());
                PathBuf::from(sanitize_file_name(&name))
            }
        };

        tokio::fs::write(&out, &bytes)
            .await
            .map_err(|e| DownloadError::Write(out.clone(), e))?;

        Ok(format!(
            "Downloaded {} to {} ({})",
            self.cid,
            out.display(),
            format_size(bytes.len() as u64)
        ))
    }
}

/// Stored names come from other users; keep only the last path component
fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => "download".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("demo.txt"), "demo.txt");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("dir\\file.bin"), "file.bin");
        assert_eq!(sanitize_file_name(".."), "download");
        assert_eq!(sanitize_file_name("a/"), "download");
    }
}
