use clap::Args;

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct Disconnect;

#[derive(Debug, thiserror::Error)]
pub enum DisconnectError {
    #[error(transparent)]
    Services(#[from] ServicesError),
}

#[async_trait::async_trait]
impl crate::op::Op for Disconnect {
    type Error = DisconnectError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        services.wallet().disconnect();
        Ok("Disconnected".to_string())
    }
}
