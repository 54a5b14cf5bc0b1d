use clap::Args;
use common::catalog::{format_size, owned_by, search, short_address};
use common::store::FileMetadata;

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct List {
    /// Case-insensitive substring of the file name
    #[arg(long, default_value = "")]
    pub search: String,

    /// Only files uploaded by the connected wallet
    #[arg(long)]
    pub mine: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error(transparent)]
    Services(#[from] ServicesError),
    #[error("Please connect your wallet first!")]
    NotConnected,
}

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = ListError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let files = services.orchestrator.refresh().await;

        let scoped: Vec<FileMetadata> = if self.mine {
            let session = services.wallet().session();
            if !session.is_connected() {
                return Err(ListError::NotConnected);
            }
            owned_by(&files, session.address()).into_iter().cloned().collect()
        } else {
            files
        };
        let matches = search(&scoped, &self.search);

        if matches.is_empty() {
            return Ok("No files found".to_string());
        }

        let output = matches
            .iter()
            .map(|f| {
                format!(
                    "{} | {} | {} | {} | {} | {}",
                    f.name,
                    f.mime_type,
                    format_size(f.size),
                    short_address(&f.owner),
                    f.upload_date,
                    f.cid
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        Ok(output)
    }
}
