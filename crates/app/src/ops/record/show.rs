use clap::Args;
use common::ledger::Ledger;

use super::{format_record, ledger, RecordError};

#[derive(Args, Debug, Clone)]
pub struct Show {
    #[arg(long)]
    pub cid: String,
}

#[async_trait::async_trait]
impl crate::op::Op for Show {
    type Error = RecordError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let record = ledger(&services)?.get_file_by_cid(&self.cid).await?;
        Ok(format_record(&record))
    }
}
