use std::sync::Arc;

use tokio::sync::watch;

use super::provider::{AccountsSubscription, WalletError, WalletProvider};
use super::session::{Signer, WalletSession};
use super::storage::SessionStore;

/// What an account-change notification did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    Unchanged,
    /// The wallet switched to a different account; still connected
    Switched { from: String, to: String },
    /// The wallet reported no accounts; the session was reset
    Reset,
}

/// Owns the wallet session and keeps it in step with the provider.
///
/// The session lives in a watch channel so views can observe it; every
/// update replaces the whole value.
#[derive(Debug)]
pub struct WalletSessionAdapter {
    provider: Option<Arc<dyn WalletProvider>>,
    storage: Arc<dyn SessionStore>,
    session: watch::Sender<WalletSession>,
    balance: watch::Sender<Option<u128>>,
}

impl WalletSessionAdapter {
    /// Restore the session from storage, but only if the provider still
    ///  reports approved accounts. Never fails: any problem is logged and
    ///  leaves the session disconnected.
    pub async fn init(
        provider: Option<Arc<dyn WalletProvider>>,
        storage: Arc<dyn SessionStore>,
    ) -> Self {
        let adapter = Self {
            provider,
            storage,
            session: watch::Sender::new(WalletSession::disconnected()),
            balance: watch::Sender::new(None),
        };

        let restored = adapter.restore().await;
        match restored {
            Ok(Some(session)) => {
                tracing::info!(address = session.address(), "restored wallet session");
                adapter.session.send_replace(session);
            }
            Ok(None) => {
                tracing::debug!("no wallet session to restore");
            }
            Err(e) => {
                tracing::warn!("failed to restore wallet session, starting disconnected: {}", e);
            }
        }

        adapter
    }

    async fn restore(&self) -> Result<Option<WalletSession>, WalletError> {
        let Some(persisted) = self.storage.load()? else {
            return Ok(None);
        };
        if !persisted.is_connected() {
            return Ok(None);
        }
        let provider = self.provider.as_ref().ok_or(WalletError::Unavailable)?;

        let approved = match provider.accounts().await {
            // the wallet revoked access for this client
            Err(WalletError::Unauthorized) => Vec::new(),
            other => other?,
        };
        let Some(first) = approved.first() else {
            tracing::info!("wallet no longer reports approved accounts");
            self.storage.clear()?;
            return Ok(None);
        };

        let session = if approved
            .iter()
            .any(|a| a.eq_ignore_ascii_case(persisted.address()))
        {
            persisted
        } else {
            let session = WalletSession::connected(first)?;
            self.storage.save(&session)?;
            session
        };
        Ok(Some(session))
    }

    pub fn session(&self) -> WalletSession {
        self.session.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<WalletSession> {
        self.session.subscribe()
    }

    pub fn signer(&self) -> Option<Signer> {
        self.session.borrow().signer()
    }

    /// Request account access from the wallet and persist the approved session
    pub async fn connect(&self) -> Result<WalletSession, WalletError> {
        let provider = self.provider.as_ref().ok_or(WalletError::Unavailable)?;

        let accounts = match provider.request_accounts().await {
            Ok(accounts) => accounts,
            Err(WalletError::UserRejected) => {
                tracing::info!("wallet connection request rejected by user");
                return Err(WalletError::UserRejected);
            }
            Err(e) => {
                tracing::error!("error connecting wallet: {}", e);
                return Err(e);
            }
        };
        let first = accounts.first().ok_or(WalletError::NoAccounts)?;
        let session = WalletSession::connected(first)?;

        if let Err(e) = self.storage.save(&session) {
            tracing::warn!("failed to persist wallet session: {}", e);
        }
        tracing::info!(address = session.address(), "wallet connected");
        self.session.send_replace(session.clone());
        Ok(session)
    }

    /// Forget the session locally and in storage; always succeeds
    pub fn disconnect(&self) {
        self.session.send_replace(WalletSession::disconnected());
        self.balance.send_replace(None);
        if let Err(e) = self.storage.clear() {
            tracing::warn!("failed to clear persisted session: {}", e);
        }
        tracing::info!("wallet disconnected");
    }

    /// Apply an account list reported by the provider
    pub fn handle_accounts_changed(&self, accounts: &[String]) -> SessionChange {
        let current = self.session();

        let Some(first) = accounts.first() else {
            if current.is_connected() {
                self.disconnect();
                return SessionChange::Reset;
            }
            return SessionChange::Unchanged;
        };

        // a disconnected session only becomes connected through `connect`
        if !current.is_connected() || current.owns(first) {
            return SessionChange::Unchanged;
        }

        match WalletSession::connected(first) {
            Ok(next) => {
                if let Err(e) = self.storage.save(&next) {
                    tracing::warn!("failed to persist wallet session: {}", e);
                }
                let change = SessionChange::Switched {
                    from: current.address().to_string(),
                    to: next.address().to_string(),
                };
                tracing::info!(from = current.address(), to = next.address(), "wallet account switched");
                self.session.send_replace(next);
                self.balance.send_replace(None);
                change
            }
            Err(e) => {
                tracing::warn!("ignoring account change: {}", e);
                SessionChange::Unchanged
            }
        }
    }

    /// Account-change notifications, relative to the current session
    pub fn subscribe_accounts(&self) -> Option<AccountsSubscription> {
        let session = self.session();
        let known = if session.is_connected() {
            vec![session.address().to_string()]
        } else {
            Vec::new()
        };
        self.provider.as_ref().map(|p| p.subscribe(known))
    }

    /// Last balance read, in wei
    pub fn balance(&self) -> Option<u128> {
        *self.balance.borrow()
    }

    pub fn watch_balance(&self) -> watch::Receiver<Option<u128>> {
        self.balance.subscribe()
    }

    /// Re-read the balance of the connected account; failures keep the
    ///  previous value
    pub async fn refresh_balance(&self) -> Option<u128> {
        let session = self.session();
        let provider = self.provider.as_ref()?;
        if !session.is_connected() {
            return None;
        }

        match provider.balance(session.address()).await {
            Ok(wei) => {
                // the account may have changed while the request was in flight
                if self.session.borrow().address() == session.address() {
                    self.balance.send_replace(Some(wei));
                }
                Some(wei)
            }
            Err(e) => {
                tracing::warn!("failed to read wallet balance: {}", e);
                self.balance()
            }
        }
    }
}

/// Format a wei amount as ether with four decimals
pub fn format_ether(wei: u128) -> String {
    const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;
    let whole = wei / WEI_PER_ETHER;
    let fraction = (wei % WEI_PER_ETHER) / 100_000_000_000_000;
    format!("{}.{:04} ETH", whole, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ether() {
        assert_eq!(format_ether(0), "0.0000 ETH");
        assert_eq!(format_ether(1_500_000_000_000_000_000), "1.5000 ETH");
        assert_eq!(format_ether(123_456_789_000_000), "0.0001 ETH");
    }
}
