use clap::Args;

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct Verify {
    #[arg(long)]
    pub cid: String,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    Services(#[from] ServicesError),
}

#[async_trait::async_trait]
impl crate::op::Op for Verify {
    type Error = VerifyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let store = services.orchestrator.store();
        if store.verify(&self.cid).await {
            Ok(format!("{}: pinned", self.cid))
        } else {
            Ok(format!("{}: not found", self.cid))
        }
    }
}
