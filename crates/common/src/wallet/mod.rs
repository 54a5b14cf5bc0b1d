mod adapter;
mod provider;
mod session;
mod storage;

pub use adapter::{format_ether, SessionChange, WalletSessionAdapter};
pub use provider::{
    AccountsSubscription, RpcWalletProvider, WalletError, WalletProvider, DEFAULT_ACCOUNTS_POLL,
};
pub use session::{SessionError, Signer, WalletSession};
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore, StorageError, SESSION_KEY};
