use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use super::session::SessionError;
use super::storage::StorageError;
use crate::error::{Classify, ErrorKind};
use crate::rpc::{parse_quantity, RpcClient, RpcError};

pub const DEFAULT_ACCOUNTS_POLL: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("no wallet provider available; install MetaMask or another Web3 wallet")]
    Unavailable,
    #[error("wallet provider unreachable: {0}")]
    Unreachable(RpcError),
    #[error("user rejected the request")]
    UserRejected,
    #[error("account or method not authorized by the wallet")]
    Unauthorized,
    #[error("wallet returned no accounts")]
    NoAccounts,
    #[error("wallet rpc error: {0}")]
    Rpc(RpcError),
    #[error("invalid session: {0}")]
    Session(#[from] SessionError),
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<RpcError> for WalletError {
    fn from(err: RpcError) -> Self {
        if err.is_user_rejection() {
            WalletError::UserRejected
        } else if err.is_unauthorized() {
            WalletError::Unauthorized
        } else if err.is_transport() {
            WalletError::Unreachable(err)
        } else {
            WalletError::Rpc(err)
        }
    }
}

impl Classify for WalletError {
    fn kind(&self) -> ErrorKind {
        match self {
            WalletError::Unavailable | WalletError::Unreachable(_) => {
                ErrorKind::ProviderUnavailable
            }
            WalletError::UserRejected => ErrorKind::UserRejected,
            WalletError::Unauthorized => ErrorKind::ProviderNotConnected,
            _ => ErrorKind::Unknown,
        }
    }
}

/// Account-change notifications from a provider.
///
/// Delivery is latest-value-wins: if several changes land before the
/// subscriber looks, only the most recent account list is observed. Dropping
/// the subscription unsubscribes.
#[derive(Debug)]
pub struct AccountsSubscription {
    rx: watch::Receiver<Vec<String>>,
    poller: Option<JoinHandle<()>>,
}

impl AccountsSubscription {
    pub fn new(rx: watch::Receiver<Vec<String>>) -> Self {
        Self { rx, poller: None }
    }

    /// Attach a background task that feeds this subscription; it is aborted
    ///  when the subscription is dropped
    pub fn with_poller(rx: watch::Receiver<Vec<String>>, poller: JoinHandle<()>) -> Self {
        Self {
            rx,
            poller: Some(poller),
        }
    }

    /// Wait for the next change; `None` once the provider side has gone away
    pub async fn changed(&mut self) -> Option<Vec<String>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

impl Drop for AccountsSubscription {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// The injected wallet: account access, balance and account-change events
#[async_trait]
pub trait WalletProvider: Send + Sync + std::fmt::Debug {
    /// Ask the user for account access (`eth_requestAccounts`)
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Accounts already approved for this client, without prompting
    async fn accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Balance in wei
    async fn balance(&self, address: &str) -> Result<u128, WalletError>;

    /// Watch for account changes. `known` is the account list the caller
    ///  already acts on; anything different is reported, including the
    ///  first observation.
    fn subscribe(&self, known: Vec<String>) -> AccountsSubscription;
}

/// Wallet reached over EIP-1193 style JSON-RPC
#[derive(Debug, Clone)]
pub struct RpcWalletProvider {
    rpc: RpcClient,
    poll_interval: Duration,
}

impl RpcWalletProvider {
    pub fn new(remote: &Url) -> Result<Self, WalletError> {
        Ok(Self {
            rpc: RpcClient::new(remote)?,
            poll_interval: DEFAULT_ACCOUNTS_POLL,
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.rpc.call("eth_requestAccounts", json!([])).await?)
    }

    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        Ok(self.rpc.call("eth_accounts", json!([])).await?)
    }

    async fn balance(&self, address: &str) -> Result<u128, WalletError> {
        let raw: String = self
            .rpc
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        Ok(parse_quantity(&raw)?)
    }

    fn subscribe(&self, known: Vec<String>) -> AccountsSubscription {
        let (tx, rx) = watch::channel(Vec::new());
        let rpc = self.rpc.clone();
        let period = self.poll_interval;

        let poller = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut last: Vec<String> = known.iter().map(|a| a.to_lowercase()).collect();
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                let accounts: Vec<String> = match rpc.call("eth_accounts", json!([])).await {
                    Ok(accounts) => accounts,
                    Err(e) => {
                        tracing::debug!("accounts poll failed: {}", e);
                        continue;
                    }
                };
                let accounts: Vec<String> = accounts.iter().map(|a| a.to_lowercase()).collect();
                if accounts != last {
                    tracing::info!(count = accounts.len(), "wallet accounts changed");
                    last = accounts.clone();
                    if tx.send(accounts).is_err() {
                        break;
                    }
                }
            }
        });

        AccountsSubscription::with_poller(rx, poller)
    }
}
