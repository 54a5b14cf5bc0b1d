use std::sync::Arc;
use std::time::Duration;

use common::ledger::{EvmLedger, EvmLedgerConfig, Ledger, LedgerError};
use common::orchestrator::Orchestrator;
use common::store::{ContentStore, PinataConfig, PinataStore, StoreError};
use common::wallet::{
    FileSessionStore, RpcWalletProvider, WalletError, WalletProvider, WalletSessionAdapter,
};

use crate::state::{AppState, StateError};

/// Everything a command needs, wired from the loaded state
#[derive(Debug)]
pub struct Services {
    pub state: AppState,
    pub orchestrator: Arc<Orchestrator>,
    pub ledger: Option<Arc<EvmLedger>>,
    pub store: Arc<PinataStore>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServicesError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("wallet setup failed: {0}")]
    Wallet(#[from] WalletError),
    #[error("ledger setup failed: {0}")]
    Ledger(#[from] LedgerError),
    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),
}

impl Services {
    pub async fn build(state: AppState) -> Result<Self, ServicesError> {
        let config = &state.config;

        let provider = RpcWalletProvider::new(&config.wallet.rpc_url)?
            .with_poll_interval(Duration::from_secs(config.wallet.accounts_poll_secs.max(1)));
        let provider: Arc<dyn WalletProvider> = Arc::new(provider);
        let storage = Arc::new(FileSessionStore::new(&state.storage_path));
        let wallet = WalletSessionAdapter::init(Some(provider), storage).await;

        let ledger = if config.ledger.enabled {
            Some(Arc::new(EvmLedger::new(EvmLedgerConfig {
                rpc_url: config.wallet.rpc_url.clone(),
                contract_address: config.ledger.contract_address.clone(),
                chain_id: config.ledger.chain_id,
                confirmation_timeout: Duration::from_secs(config.ledger.confirmation_timeout_secs),
                receipt_poll: Duration::from_millis(config.ledger.receipt_poll_millis),
            })?))
        } else {
            None
        };

        let store = Arc::new(PinataStore::new(PinataConfig {
            api_url: config.store.api_url.clone(),
            jwt: state.pinata_jwt(),
            gateway: config.store.gateway.clone(),
        })?);

        let orchestrator = Orchestrator::new(
            Arc::new(wallet),
            ledger.clone().map(|l| l as Arc<dyn Ledger>),
            store.clone() as Arc<dyn ContentStore>,
        );

        Ok(Self {
            state,
            orchestrator: Arc::new(orchestrator),
            ledger,
            store,
        })
    }

    pub fn wallet(&self) -> &Arc<WalletSessionAdapter> {
        self.orchestrator.wallet()
    }
}
