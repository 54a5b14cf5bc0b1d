use clap::Args;
use url::Url;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Wallet JSON-RPC endpoint (default: http://localhost:8545)
    #[arg(long)]
    pub rpc_url: Option<Url>,

    /// Pinning service token; can also be set through TIMEVAULT_PINATA_JWT
    #[arg(long)]
    pub jwt: Option<String>,

    /// Skip on-chain registration and pin files directly
    #[arg(long)]
    pub no_ledger: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig::default();
        if let Some(rpc_url) = &self.rpc_url {
            config.wallet.rpc_url = rpc_url.clone();
        }
        config.store.jwt = self.jwt.clone();
        config.ledger.enabled = !self.no_ledger;

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let ledger = if state.config.ledger.enabled {
            format!(
                "{} (chain {})",
                state.config.ledger.contract_address, state.config.ledger.chain_id
            )
        } else {
            "disabled".to_string()
        };

        let output = format!(
            "Initialized timevault directory at: {}\n\
             - Config: {}\n\
             - Session storage: {}\n\
             - Wallet RPC: {}\n\
             - Ledger: {}\n\
             - Pinning API: {}",
            state.timevault_dir.display(),
            state.config_path.display(),
            state.storage_path.display(),
            state.config.wallet.rpc_url,
            ledger,
            state.config.store.api_url,
        );

        Ok(output)
    }
}
