use std::path::PathBuf;

use clap::Args;
use common::catalog::format_size;
use common::orchestrator::{Failure, UploadOutcome};
use common::store::LocalFile;

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// File to register and pin
    #[arg(long)]
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Services(#[from] ServicesError),
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("{0}")]
    Rejected(&'static str),
    #[error("Transaction cancelled")]
    Cancelled,
    #[error("{0}")]
    Failed(Failure),
}

#[async_trait::async_trait]
impl crate::op::Op for Upload {
    type Error = UploadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let file = LocalFile::read(&self.path)
            .await
            .map_err(|e| UploadError::Read(self.path.clone(), e))?;

        let services = ctx.services().await?;
        let orchestrator = &services.orchestrator;
        orchestrator.select_file(file);

        match orchestrator.upload().await {
            UploadOutcome::Stored(metadata) => {
                let url = services
                    .store
                    .gateway()
                    .url_for(&metadata.cid)
                    .map(|u| u.to_string())
                    .unwrap_or_default();
                Ok(format!(
                    "Uploaded {} ({})\n- CID: {}\n- URL: {}",
                    metadata.name,
                    format_size(metadata.size),
                    metadata.cid,
                    url
                ))
            }
            UploadOutcome::Rejected(message) => Err(UploadError::Rejected(message)),
            UploadOutcome::Cancelled => Err(UploadError::Cancelled),
            UploadOutcome::Failed(failure) => Err(UploadError::Failed(failure)),
        }
    }
}
