use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::wallet::{AccountsSubscription, WalletError, WalletProvider};

#[derive(Debug, Default)]
struct MockWalletInner {
    accounts: Vec<String>,
    /// accounts are only reported without prompting once approved
    approved: bool,
    reject: bool,
    unreachable: bool,
    /// `eth_accounts` answers 4100, as after the user revoked access
    revoked: bool,
    balance: u128,
    requests: usize,
}

/// Scriptable wallet provider
#[derive(Debug, Clone)]
pub struct MockWallet {
    inner: Arc<Mutex<MockWalletInner>>,
    notify: Arc<watch::Sender<Vec<String>>>,
}

impl MockWallet {
    /// A wallet holding `accounts` that has not approved this client yet
    pub fn new<I, S>(accounts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = MockWalletInner {
            accounts: accounts.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            notify: Arc::new(watch::Sender::new(Vec::new())),
        }
    }

    /// Mark the accounts as already approved, as after an earlier connect
    pub fn approved(self) -> Self {
        self.inner.lock().approved = true;
        self
    }

    pub fn set_accounts<I, S>(&self, accounts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.lock().accounts = accounts.into_iter().map(Into::into).collect();
    }

    pub fn set_reject(&self, reject: bool) {
        self.inner.lock().reject = reject;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unreachable = unreachable;
    }

    pub fn set_revoked(&self, revoked: bool) {
        self.inner.lock().revoked = revoked;
    }

    pub fn set_balance(&self, wei: u128) {
        self.inner.lock().balance = wei;
    }

    /// Number of `request_accounts` prompts shown so far
    pub fn requests(&self) -> usize {
        self.inner.lock().requests
    }

    /// Switch accounts and notify subscribers, like a user changing
    ///  account in the wallet UI
    pub fn emit_accounts<I, S>(&self, accounts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accounts: Vec<String> = accounts.into_iter().map(Into::into).collect();
        self.inner.lock().accounts = accounts.clone();
        self.notify.send_replace(accounts);
    }

    fn check_reachable(&self) -> Result<(), WalletError> {
        if self.inner.lock().unreachable {
            return Err(WalletError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.check_reachable()?;
        let mut inner = self.inner.lock();
        inner.requests += 1;
        if inner.reject {
            return Err(WalletError::UserRejected);
        }
        inner.approved = true;
        Ok(inner.accounts.clone())
    }

    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        self.check_reachable()?;
        let inner = self.inner.lock();
        if inner.revoked {
            return Err(WalletError::Unauthorized);
        }
        if !inner.approved {
            return Ok(Vec::new());
        }
        Ok(inner.accounts.clone())
    }

    async fn balance(&self, _address: &str) -> Result<u128, WalletError> {
        self.check_reachable()?;
        Ok(self.inner.lock().balance)
    }

    fn subscribe(&self, _known: Vec<String>) -> AccountsSubscription {
        AccountsSubscription::new(self.notify.subscribe())
    }
}
