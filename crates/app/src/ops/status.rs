use clap::Args;
use common::catalog::short_address;
use common::wallet::format_ether;

use crate::services::ServicesError;

#[derive(Args, Debug, Clone)]
pub struct Status;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error(transparent)]
    Services(#[from] ServicesError),
}

#[async_trait::async_trait]
impl crate::op::Op for Status {
    type Error = StatusError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let services = ctx.services().await?;
        let config = &services.state.config;
        let session = services.wallet().session();

        let wallet = if session.is_connected() {
            let balance = match services.wallet().refresh_balance().await {
                Some(wei) => format_ether(wei),
                None => "unknown".to_string(),
            };
            format!("connected as {} ({})", short_address(session.address()), balance)
        } else {
            "not connected".to_string()
        };

        let ledger = if config.ledger.enabled {
            format!(
                "{} on chain {}",
                short_address(&config.ledger.contract_address),
                config.ledger.chain_id
            )
        } else {
            "disabled".to_string()
        };

        let token = if services.state.pinata_jwt().is_some() {
            "token set"
        } else {
            "no token"
        };

        Ok(format!(
            "Wallet: {}\nLedger: {}\nStore: {} ({})\nGateway: {}",
            wallet, ledger, config.store.api_url, token, config.store.gateway
        ))
    }
}
