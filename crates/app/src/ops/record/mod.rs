use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Args, Subcommand};
use common::ledger::{EvmLedger, FileRecord, LedgerError};

pub mod list;
pub mod show;

use crate::op::Op;
use crate::services::{Services, ServicesError};

crate::command_enum! {
    (Show, show::Show),
    (List, list::List),
}

// Rename the generated Command to RecordCommand for clarity
pub type RecordCommand = Command;

/// Read file records from the on-chain registry
#[derive(Args, Debug, Clone)]
pub struct Record {
    #[command(subcommand)]
    pub command: RecordCommand,
}

#[async_trait::async_trait]
impl Op for Record {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Services(#[from] ServicesError),
    #[error("the ledger is disabled in config.toml")]
    LedgerDisabled,
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

fn ledger(services: &Services) -> Result<Arc<EvmLedger>, RecordError> {
    services.ledger.clone().ok_or(RecordError::LedgerDisabled)
}

fn format_record(record: &FileRecord) -> String {
    let registered = DateTime::<Utc>::from_timestamp(record.timestamp as i64, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| record.timestamp.to_string());
    format!(
        "{} | {} | {} | {} bytes | uploader {} | registered {} | {} downloads",
        record.cid,
        record.name,
        record.file_type,
        record.size,
        record.uploader,
        registered,
        record.download_count
    )
}

