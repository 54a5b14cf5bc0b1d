use clap::Args;
use common::error::Classify;
use common::wallet::WalletError;

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct Connect;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Services(#[from] ServicesError),
    #[error("{}: {}", .0.kind().default_message(), .0)]
    Wallet(#[from] WalletError),
}

#[async_trait::async_trait]
impl crate::op::Op for Connect {
    type Error = ConnectError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let session = services.wallet().connect().await?;
        Ok(format!("Connected: {}", session.address()))
    }
}
