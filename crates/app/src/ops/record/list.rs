use clap::Args;
use common::ledger::Ledger;

use super::{format_record, ledger, RecordError};

#[derive(Args, Debug, Clone)]
pub struct List {
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    #[arg(long, default_value_t = 20)]
    pub limit: u64,
}

#[async_trait::async_trait]
impl crate::op::Op for List {
    type Error = RecordError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let records = ledger(&services)?
            .get_files_batch(self.offset, self.limit)
            .await?;

        if records.is_empty() {
            return Ok("No records found".to_string());
        }
        Ok(records
            .iter()
            .map(format_record)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
